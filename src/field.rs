//! The contract shared by every particle system in the scene.
//!
//! A field owns its attribute columns, its random source and its clock.
//! The composer calls [`ParticleField::update`] once per frame and the
//! renderer pulls [`PointColumns`] to upload whatever changed.
//!
//! ```ignore
//! let mut snow = SnowField::new(SnowConfig::default(), &mut cache)?;
//! snow.update(1.0 / 60.0);
//! assert!(snow.positions().is_dirty());
//! ```

use glam::Vec3;
use rand::Rng;
use std::f32::consts::TAU;

use crate::buffer::Attribute;
use crate::error::FieldError;

/// A fixed-size population of particles with its own per-frame update.
pub trait ParticleField {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Number of particles. Constant for the lifetime of the field.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance the field by `dt` seconds.
    ///
    /// Implementations mutate positions in place, visit each particle once
    /// and mark the position column dirty when anything moved.
    fn update(&mut self, dt: f32);

    fn positions(&self) -> &Attribute<Vec3>;

    /// Shader clock in seconds.
    fn time(&self) -> f32 {
        0.0
    }

    /// Columns the renderer uploads.
    fn columns_mut(&mut self) -> PointColumns<'_>;
}

/// Mutable view over the columns a point layer draws from.
///
/// Missing columns are bound as a constant default on the GPU side.
pub struct PointColumns<'a> {
    pub positions: &'a mut Attribute<Vec3>,
    pub sizes: Option<&'a mut Attribute<f32>>,
    pub phases: Option<&'a mut Attribute<f32>>,
    pub colors: Option<&'a mut Attribute<Vec3>>,
}

/// Reject empty populations.
pub fn ensure_count(field: &'static str, count: usize) -> Result<usize, FieldError> {
    if count == 0 {
        return Err(FieldError::EmptyField { field });
    }
    Ok(count)
}

/// Reject non-finite or non-positive geometric parameters.
pub fn ensure_positive(
    field: &'static str,
    param: &'static str,
    value: f32,
) -> Result<f32, FieldError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(FieldError::InvalidParameter {
            field,
            param,
            value,
        });
    }
    Ok(value)
}

/// Uniform phase in `[0, 2π)`.
pub fn random_phase<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen_range(0.0..TAU)
}

/// Uniformly distributed unit vector.
pub fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let theta = random_phase(rng);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}
