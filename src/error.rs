//! Error types for Yuletide.
//!
//! Field construction, GPU initialization and the windowed app each have
//! their own error enum so callers can tell a bad configuration apart from a
//! missing graphics adapter.

use thiserror::Error;

/// Errors raised when building a particle field.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    /// A field was requested with zero particles.
    #[error("{field} field requires at least one particle")]
    EmptyField {
        /// Name of the field that rejected the count.
        field: &'static str,
    },
    /// A geometric parameter was non-finite or non-positive.
    #[error("invalid {field} parameter `{param}`: {value}")]
    InvalidParameter {
        field: &'static str,
        param: &'static str,
        value: f32,
    },
}

/// Errors that can occur during GPU initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The surface reports no formats usable with this adapter.
    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,
}

/// Errors that end the windowed application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Field(#[from] FieldError),
}
