//! Background starfield.
//!
//! Stars sit in a spherical shell between `radius` and `radius + depth`
//! and never move on the CPU; twinkle and fade happen in the shader, driven
//! by the field clock.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::buffer::Attribute;
use crate::error::FieldError;
use crate::field::{ensure_count, ensure_positive, random_direction, ParticleField, PointColumns};

/// Screen-size scale of star points.
pub const POINT_SCALE: f32 = 30.0;

#[derive(Debug, Clone, PartialEq)]
pub struct StarConfig {
    pub count: usize,
    /// Inner radius of the shell.
    pub radius: f32,
    /// Shell thickness.
    pub depth: f32,
    /// Size multiplier.
    pub factor: f32,
    /// 0 gives white stars.
    pub saturation: f32,
    /// Fade stars towards the rim of their point sprite.
    pub fade: bool,
    /// Clock rate of the twinkle.
    pub speed: f32,
}

impl Default for StarConfig {
    fn default() -> Self {
        Self {
            count: 2000,
            radius: 120.0,
            depth: 40.0,
            factor: 3.0,
            saturation: 0.0,
            fade: true,
            speed: 0.5,
        }
    }
}

impl StarConfig {
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

#[derive(Debug)]
pub struct StarField {
    config: StarConfig,
    positions: Attribute<Vec3>,
    sizes: Attribute<f32>,
    colors: Attribute<Vec3>,
    time: f32,
}

impl StarField {
    pub fn new(config: StarConfig) -> Result<Self, FieldError> {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    pub fn with_rng(config: StarConfig, mut rng: SmallRng) -> Result<Self, FieldError> {
        let count = ensure_count("stars", config.count)?;
        ensure_positive("stars", "radius", config.radius)?;

        let mut positions = Vec::with_capacity(count);
        let mut sizes = Vec::with_capacity(count);
        let mut colors = Vec::with_capacity(count);
        for _ in 0..count {
            let r = config.radius + config.depth - config.depth * rng.gen::<f32>();
            positions.push(random_direction(&mut rng) * r);
            sizes.push((0.5 + 0.5 * rng.gen::<f32>()) * config.factor);
            colors.push(star_color(rng.gen::<f32>(), config.saturation));
        }

        Ok(Self {
            config,
            positions: Attribute::from_vec(positions),
            sizes: Attribute::from_vec(sizes),
            colors: Attribute::from_vec(colors),
            time: 0.0,
        })
    }

    pub fn config(&self) -> &StarConfig {
        &self.config
    }

    pub fn sizes(&self) -> &Attribute<f32> {
        &self.sizes
    }
}

/// Color at lightness 0.9 and random hue, desaturated by `saturation`.
fn star_color(hue: f32, saturation: f32) -> Vec3 {
    let l = 0.9;
    let s = saturation.clamp(0.0, 1.0);
    let c = (1.0 - (2.0 * l - 1.0f32).abs()) * s;
    let h = hue.fract() * 6.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let rgb = match h as u32 {
        0 => Vec3::new(c, x, 0.0),
        1 => Vec3::new(x, c, 0.0),
        2 => Vec3::new(0.0, c, x),
        3 => Vec3::new(0.0, x, c),
        4 => Vec3::new(x, 0.0, c),
        _ => Vec3::new(c, 0.0, x),
    };
    rgb + Vec3::splat(l - c * 0.5)
}

impl ParticleField for StarField {
    fn name(&self) -> &'static str {
        "stars"
    }

    fn len(&self) -> usize {
        self.positions.len()
    }

    /// Only the twinkle clock moves.
    fn update(&mut self, dt: f32) {
        self.time += dt * self.config.speed;
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
            phases: None,
            colors: Some(&mut self.colors),
        }
    }
}

/// Rim fade of a star sprite at distance `d` from its center (0.5 = edge).
pub fn star_fade(d: f32) -> f32 {
    1.0 / (1.0 + (16.0 * (d - 0.25)).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stars_in_shell() {
        let stars =
            StarField::with_rng(StarConfig::default().with_count(1000), SmallRng::seed_from_u64(1))
                .unwrap();
        for p in stars.positions().values() {
            let r = p.length();
            assert!((120.0 - 1e-2..=160.0 + 1e-2).contains(&r), "r = {r}");
        }
        for &s in stars.sizes().values() {
            assert!((1.5..=3.0).contains(&s));
        }
    }

    #[test]
    fn test_zero_saturation_is_grey() {
        let c = star_color(0.37, 0.0);
        assert!((c - Vec3::splat(0.9)).length() < 1e-6);
    }

    #[test]
    fn test_only_clock_moves() {
        let mut stars =
            StarField::with_rng(StarConfig::default().with_count(10), SmallRng::seed_from_u64(2))
                .unwrap();
        let version = stars.positions().version();
        stars.update(2.0);
        assert_eq!(stars.positions().version(), version);
        assert!((stars.time() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fade_falls_off() {
        assert!(star_fade(0.0) > 0.95);
        assert!(star_fade(0.5) < 0.02);
    }
}
