//! Fireflies circling the base of the tree.
//!
//! Every firefly keeps the orbit radius it was born with and only advances
//! its angle, half of them clockwise. The vertical bob is three waves per
//! revolution offset by a personal phase.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::buffer::Attribute;
use crate::error::FieldError;
use crate::field::{ensure_count, ensure_positive, random_phase, ParticleField, PointColumns};
use crate::visuals::hex;

/// Screen-size scale: `size * 210 / depth`.
pub const POINT_SCALE: f32 = 210.0;

/// Ring parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RingConfig {
    pub count: usize,
    pub radius: f32,
    /// Width of the band of orbit radii.
    pub thickness: f32,
    pub y_offset: f32,
    pub color_a: Vec3,
    pub color_b: Vec3,
    pub alpha: f32,
    /// Mean angular speed in rad/s.
    pub speed: f32,
    pub soft: f32,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            count: 1200,
            radius: 19.0,
            thickness: 3.2,
            y_offset: -6.8,
            color_a: hex(0x6fc5ff),
            color_b: hex(0xe9f6ff),
            alpha: 0.38,
            speed: 0.28,
            soft: 0.45,
        }
    }
}

impl RingConfig {
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn with_y_offset(mut self, y_offset: f32) -> Self {
        self.y_offset = y_offset;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}

/// Orbiting firefly ring.
#[derive(Debug)]
pub struct RingField {
    config: RingConfig,
    angles: Vec<f32>,
    radii: Vec<f32>,
    speeds: Vec<f32>,
    bob_phases: Vec<f32>,
    positions: Attribute<Vec3>,
    sizes: Attribute<f32>,
    twinkle: Attribute<f32>,
    time: f32,
}

impl RingField {
    pub fn new(config: RingConfig) -> Result<Self, FieldError> {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    pub fn with_rng(config: RingConfig, mut rng: SmallRng) -> Result<Self, FieldError> {
        let count = ensure_count("ring", config.count)?;
        ensure_positive("ring", "radius", config.radius)?;

        let mut angles = Vec::with_capacity(count);
        let mut radii = Vec::with_capacity(count);
        let mut speeds = Vec::with_capacity(count);
        let mut bob_phases = Vec::with_capacity(count);
        let mut sizes = Vec::with_capacity(count);
        let mut twinkle = Vec::with_capacity(count);

        for _ in 0..count {
            angles.push(random_phase(&mut rng));
            radii.push(config.radius + (rng.gen::<f32>() - 0.5) * config.thickness);
            bob_phases.push(random_phase(&mut rng));
            let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            speeds.push(config.speed * (0.6 + rng.gen::<f32>() * 0.8) * direction);
            sizes.push(0.6 + rng.gen::<f32>() * 1.4);
            twinkle.push(random_phase(&mut rng));
        }

        let mut field = Self {
            positions: Attribute::filled(count, Vec3::ZERO),
            config,
            angles,
            radii,
            speeds,
            bob_phases,
            sizes: Attribute::from_vec(sizes),
            twinkle: Attribute::from_vec(twinkle),
            time: 0.0,
        };
        field.place();
        Ok(field)
    }

    fn place(&mut self) {
        let y_offset = self.config.y_offset;
        let iter = self
            .positions
            .values_mut()
            .iter_mut()
            .zip(&self.angles)
            .zip(&self.radii)
            .zip(&self.bob_phases);
        for (((p, &a), &r), &phase) in iter {
            *p = Vec3::new(
                a.cos() * r,
                y_offset + (a * 3.0 + phase).sin() * 0.6,
                a.sin() * r,
            );
        }
        self.positions.mark_dirty();
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    pub fn angles(&self) -> &[f32] {
        &self.angles
    }

    pub fn radii(&self) -> &[f32] {
        &self.radii
    }

    pub fn speeds(&self) -> &[f32] {
        &self.speeds
    }

    pub fn sizes(&self) -> &Attribute<f32> {
        &self.sizes
    }
}

impl ParticleField for RingField {
    fn name(&self) -> &'static str {
        "ring"
    }

    fn len(&self) -> usize {
        self.positions.len()
    }

    fn update(&mut self, dt: f32) {
        for (a, &s) in self.angles.iter_mut().zip(&self.speeds) {
            *a += s * dt;
        }
        self.place();
        self.time += dt;
    }

    fn positions(&self) -> &Attribute<Vec3> {
        &self.positions
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn columns_mut(&mut self) -> PointColumns<'_> {
        PointColumns {
            positions: &mut self.positions,
            sizes: Some(&mut self.sizes),
            phases: Some(&mut self.twinkle),
            colors: None,
        }
    }
}

/// Twinkle level in `[0, 1]` for a firefly with `phase` at `time`.
pub fn twinkle(time: f32, phase: f32) -> f32 {
    0.5 + 0.5 * (time * 2.0 + phase).sin()
}

/// Color and opacity of a firefly fragment with disc coverage `disc`, or
/// `None` where the fragment is discarded.
pub fn firefly_shade(config: &RingConfig, disc: f32, tw: f32) -> Option<(Vec3, f32)> {
    let color = config.color_a.lerp(config.color_b, 0.35 + 0.25 * tw);
    let a = disc * config.alpha * (0.8 + 0.2 * tw);
    (a >= crate::snow::ALPHA_CUTOFF).then_some((color, a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(count: usize) -> RingField {
        RingField::with_rng(RingConfig::default().with_count(count), SmallRng::seed_from_u64(5))
            .unwrap()
    }

    #[test]
    fn test_rejects_zero_count() {
        assert!(RingField::new(RingConfig::default().with_count(0)).is_err());
    }

    #[test]
    fn test_radius_band_and_speed_band() {
        let r = ring(2000);
        for (&rad, &s) in r.radii().iter().zip(r.speeds()) {
            assert!((17.4..=20.6).contains(&rad), "radius {rad}");
            let mag = s.abs();
            assert!(mag >= 0.28 * 0.6 - 1e-6 && mag <= 0.28 * 1.4 + 1e-6);
        }
        let ccw = r.speeds().iter().filter(|s| **s > 0.0).count();
        assert!(ccw > 800 && ccw < 1200);
    }

    #[test]
    fn test_sizes_in_range() {
        for &s in ring(500).sizes().values() {
            assert!((0.6..2.0).contains(&s));
        }
    }

    #[test]
    fn test_horizontal_radius_is_invariant() {
        let mut r = ring(200);
        let radii = r.radii().to_vec();
        for _ in 0..50 {
            r.update(0.1);
        }
        for (p, rad) in r.positions().values().iter().zip(&radii) {
            let horizontal = (p.x * p.x + p.z * p.z).sqrt();
            assert!((horizontal - rad.abs()).abs() < 1e-3);
        }
    }

    #[test]
    fn test_angles_move_monotonically() {
        let mut r = ring(200);
        let start = r.angles().to_vec();
        let mut prev = start.clone();
        for _ in 0..20 {
            r.update(0.05);
            for ((a, p), s) in r.angles().iter().zip(&prev).zip(r.speeds()) {
                if *s > 0.0 {
                    assert!(a > p);
                } else {
                    assert!(a < p);
                }
            }
            prev = r.angles().to_vec();
        }
    }

    #[test]
    fn test_bob_stays_near_offset() {
        let mut r = ring(300);
        r.update(0.3);
        for p in r.positions().values() {
            assert!((p.y + 6.8).abs() <= 0.6 + 1e-5);
        }
        assert!(r.positions().is_dirty());
    }

    #[test]
    fn test_firefly_shade() {
        let config = RingConfig::default();
        let (color, a) = firefly_shade(&config, 1.0, 1.0).unwrap();
        assert!((a - 0.38).abs() < 1e-6);
        assert!((color - config.color_a.lerp(config.color_b, 0.6)).length() < 1e-6);
        assert!(firefly_shade(&config, 0.04, 0.0).is_none());
    }

    #[test]
    fn test_twinkle_bounds() {
        for i in 0..100 {
            let t = twinkle(i as f32 * 0.37, 1.3);
            assert!((0.0..=1.0).contains(&t));
        }
    }
}
