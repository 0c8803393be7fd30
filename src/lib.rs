//! # Yuletide
//!
//! A holiday night scene built from GPU particle fields: falling snow, a
//! spinning tree with a glowing topper, a ring of twinkling fireflies, a
//! star dome and fireworks that burst wherever you click.
//!
//! The crate splits into a CPU side that owns all simulation state and a
//! thin GPU side that draws it:
//!
//! - [`SceneComposer`] holds the [`Settings`] record and every field. Feed
//!   it [`SceneEvent`]s and call [`SceneComposer::frame`] once per frame.
//! - Each field implements [`ParticleField`] and exposes its per-particle
//!   columns as versioned [`Attribute`]s, so the renderer only uploads what
//!   changed.
//! - [`QualityController`] trades particle budgets for frame rate when the
//!   [`PerformanceMonitor`] reports a sustained slowdown.
//!
//! ## Quick Start
//!
//! ```ignore
//! use yuletide::prelude::*;
//!
//! let mut scene = SceneComposer::new(Vec2::new(1280.0, 720.0))?;
//! scene.push_event(SceneEvent::Settings(SettingsAction::ToggleBloom));
//! scene.push_event(SceneEvent::PointerDown { position: Vec2::new(640.0, 400.0) });
//! scene.frame(1.0 / 60.0)?;
//! assert!(scene.fireworks().active_count() > 0);
//! ```
//!
//! The `yuletide` binary opens a window and runs the scene with
//! [`app::App`].
//!
//! ## Feature Overview
//!
//! | Field | Type | Motion |
//! |-------|------|--------|
//! | Snow | [`SnowField`] | falls, drifts and wraps inside a box |
//! | Tree | [`TreeField`] | static cone, spun as a whole |
//! | Ring | [`RingField`] | orbiting, bobbing fireflies |
//! | Stars | [`StarField`] | static shell, shader twinkle |
//! | Fireworks | [`BurstController`] | ballistic sparks in a fixed pool |

pub mod app;
pub mod buffer;
pub mod camera;
pub mod error;
pub mod events;
pub mod field;
pub mod fireworks;
pub mod gpu;
pub mod input;
pub mod quality;
pub mod ring;
pub mod scene;
pub mod settings;
pub mod shader;
pub mod snow;
pub mod stars;
pub mod textures;
pub mod time;
pub mod tree;
pub mod visuals;

pub use buffer::Attribute;
pub use camera::{OrbitCamera, Ray};
pub use error::{AppError, FieldError, GpuError};
pub use events::{EventQueue, SceneEvent};
pub use field::{ParticleField, PointColumns};
pub use fireworks::{BurstController, FireworkConfig};
pub use glam::{Vec2, Vec3, Vec4};
pub use quality::{PerformanceMonitor, PerformanceSignal, QualityController};
pub use ring::{RingConfig, RingField};
pub use scene::{FieldConfigs, RenderProfile, SceneComposer};
pub use settings::{Settings, SettingsAction, Track};
pub use snow::{SnowConfig, SnowField, SnowRenderMode};
pub use stars::{StarConfig, StarField};
pub use textures::{FilterMode, TextureCache, TextureConfig};
pub use tree::{TreeConfig, TreeField};
pub use visuals::BlendMode;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use yuletide::prelude::*;
/// ```
pub mod prelude {
    pub use crate::events::SceneEvent;
    pub use crate::field::ParticleField;
    pub use crate::fireworks::{BurstController, FireworkConfig};
    pub use crate::quality::{PerformanceMonitor, PerformanceSignal, QualityController};
    pub use crate::ring::{RingConfig, RingField};
    pub use crate::scene::SceneComposer;
    pub use crate::settings::{Settings, SettingsAction};
    pub use crate::snow::{SnowConfig, SnowField, SnowRenderMode};
    pub use crate::stars::{StarConfig, StarField};
    pub use crate::textures::TextureCache;
    pub use crate::time::Time;
    pub use crate::tree::{TreeConfig, TreeField};
    pub use crate::{Vec2, Vec3, Vec4};
}
