//! Falling snow.
//!
//! Flakes live in a box `area` wide, start somewhere in the top 90 % of it
//! and fall a fixed step plus a random jitter every frame, wrapping back to
//! the top once they drop below `-area / 2`. A slow sideways drift depends
//! only on height and index, so each flake weaves its own path.
//!
//! Two render strategies exist:
//!
//! - [`SnowRenderMode::Shader`] draws an analytic hexagonal flake per point
//!   with additive blending. [`snowflake_alpha`] mirrors the fragment stage.
//! - [`SnowRenderMode::Sprite`] maps a cached snowflake texture on plain
//!   billboards with alpha blending. Cheaper and steadier on small GPUs.

use glam::{Mat2, Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::buffer::Attribute;
use crate::error::FieldError;
use crate::field::{ensure_count, ensure_positive, random_phase, ParticleField, PointColumns};
use crate::textures::{TextureCache, TextureConfig};
use crate::visuals::smoothstep;

/// Fragments fainter than this are discarded outright.
pub const ALPHA_CUTOFF: f32 = 0.02;

/// Screen-size scale of shader-mode points: `size * 240 / depth`.
pub const POINT_SCALE: f32 = 240.0;

/// Resolution of the sprite texture.
pub const SPRITE_TEXTURE_SIZE: u32 = 128;

/// Opacity of sprite-mode flakes.
pub const SPRITE_OPACITY: f32 = 0.9;

/// How snow is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnowRenderMode {
    /// Analytic flake in the fragment shader.
    #[default]
    Shader,
    /// Cached texture on billboards.
    Sprite,
}

/// Snow parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SnowConfig {
    pub count: usize,
    /// Edge length of the spawn box.
    pub area: f32,
    /// Fixed fall per frame.
    pub speed: f32,
    /// Upper bound of the random extra fall per frame.
    pub jitter: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub alpha: f32,
    /// Width of the soft rim of the disc term.
    pub soft: f32,
    pub render_mode: SnowRenderMode,
    /// World size of sprite billboards.
    pub sprite_size: f32,
}

impl Default for SnowConfig {
    fn default() -> Self {
        Self {
            count: 2000,
            area: 120.0,
            speed: 0.2,
            jitter: 0.3,
            min_size: 2.0,
            max_size: 4.0,
            alpha: 0.95,
            soft: 0.25,
            render_mode: SnowRenderMode::Shader,
            sprite_size: 8.0,
        }
    }
}

impl SnowConfig {
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_area(mut self, area: f32) -> Self {
        self.area = area;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Set the random extra fall. Zero makes the fall exactly `speed`.
    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_sizes(mut self, min_size: f32, max_size: f32) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_soft(mut self, soft: f32) -> Self {
        self.soft = soft;
        self
    }

    pub fn with_render_mode(mut self, mode: SnowRenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    pub fn with_sprite_size(mut self, size: f32) -> Self {
        self.sprite_size = size;
        self
    }

    /// Width of the size distribution, never below 0.1.
    pub fn size_range(&self) -> f32 {
        (self.max_size - self.min_size).max(0.1)
    }
}

/// A box of falling snowflakes.
#[derive(Debug)]
pub struct SnowField {
    config: SnowConfig,
    positions: Attribute<Vec3>,
    sizes: Attribute<f32>,
    twirls: Attribute<f32>,
    time: f32,
    sprite: Option<Arc<TextureConfig>>,
    rng: SmallRng,
}

impl SnowField {
    /// Scatter `config.count` flakes. Sprite mode pulls its texture from
    /// `cache`.
    pub fn new(config: SnowConfig, cache: &mut TextureCache) -> Result<Self, FieldError> {
        Self::with_rng(config, cache, SmallRng::from_entropy())
    }

    /// Like [`new`](Self::new) with a caller-supplied random source.
    pub fn with_rng(
        config: SnowConfig,
        cache: &mut TextureCache,
        mut rng: SmallRng,
    ) -> Result<Self, FieldError> {
        let count = ensure_count("snow", config.count)?;
        let area = ensure_positive("snow", "area", config.area)?;

        let positions = (0..count)
            .map(|_| {
                Vec3::new(
                    (rng.gen::<f32>() - 0.5) * area,
                    rng.gen::<f32>() * area * 0.9,
                    (rng.gen::<f32>() - 0.5) * area,
                )
            })
            .collect();

        let range = config.size_range();
        let sizes = (0..count)
            .map(|_| config.min_size + rng.gen::<f32>() * range)
            .collect();

        let twirls = (0..count).map(|_| random_phase(&mut rng)).collect();

        let sprite = match config.render_mode {
            SnowRenderMode::Sprite => Some(cache.snowflake(SPRITE_TEXTURE_SIZE)),
            SnowRenderMode::Shader => None,
        };

        Ok(Self {
            config,
            positions: Attribute::from_vec(positions),
            sizes: Attribute::from_vec(sizes),
            twirls: Attribute::from_vec(twirls),
            time: 0.0,
            sprite,
            rng,
        })
    }

    pub fn config(&self) -> &SnowConfig {
        &self.config
    }

    pub fn render_mode(&self) -> SnowRenderMode {
        self.config.render_mode
    }

    /// Sprite texture, present only in sprite mode.
    pub fn sprite(&self) -> Option<&Arc<TextureConfig>> {
        self.sprite.as_ref()
    }

    pub fn sizes(&self) -> &Attribute<f32> {
        &self.sizes
    }

    pub fn twirls(&self) -> &Attribute<f32> {
        &self.twirls
    }
}

impl ParticleField for SnowField {
    fn name(&self) -> &'static str {
        "snow"
    }

    fn len(&self) -> usize {
        self.positions.len()
    }

    fn update(&mut self, dt: f32) {
        let floor = -self.config.area * 0.5;
        let top = self.config.area * 0.45;
        let speed = self.config.speed;
        let jitter = self.config.jitter;

        for (i, p) in self.positions.values_mut().iter_mut().enumerate() {
            let extra = if jitter > 0.0 {
                self.rng.gen::<f32>() * jitter
            } else {
                0.0
            };
            p.y -= speed + extra;
            if p.y < floor {
                p.y = top;
            }
            let fi = i as f32;
            p.x += ((p.y + fi) * 0.02).sin() * 0.01;
            p.z += ((p.y + fi) * 0.018).cos() * 0.008;
        }
        self.positions.mark_dirty();
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
            phases: Some(&mut self.twirls),
            colors: None,
        }
    }
}

/// Vertex-stage flutter added on top of the simulated position.
pub fn flutter_offset(position: Vec3, twirl: f32, time: f32) -> Vec3 {
    Vec3::new(
        (time * 0.3 + position.y * 0.11 + twirl).sin() * 0.05,
        0.0,
        (time * 0.25 + position.y * 0.09 + twirl).cos() * 0.05,
    )
}

/// On-screen point size in pixels for a flake `depth` units in front of
/// the camera.
pub fn point_screen_size(size: f32, depth: f32) -> f32 {
    size * POINT_SCALE / depth
}

/// Signed distance to a hexagon of inradius `r`.
fn hex_distance(p: Vec2, r: f32) -> f32 {
    let p = p.abs();
    (p.x * 0.866_025 + p.y * 0.5).max(p.y) - r
}

/// Coverage of the analytic flake at point coordinate `uv` (`[0,1]²`),
/// rotated by `spin` radians, before opacity is applied.
pub fn snowflake_coverage(uv: Vec2, spin: f32, soft: f32) -> f32 {
    let p = Mat2::from_angle(spin) * (uv * 2.0 - Vec2::ONE);
    let r = p.length();

    let disc = smoothstep(0.0, soft.max(1e-4), 1.0 - r);
    let hex = 1.0 - smoothstep(0.0, 0.12, hex_distance(p, 0.65));

    let line = [0.0, PI / 3.0, 2.0 * PI / 3.0]
        .iter()
        .map(|&a| (Mat2::from_angle(a) * p).y.abs())
        .fold(f32::INFINITY, f32::min);
    let spokes = (1.0 - smoothstep(0.0, 0.04, line)) * (1.0 - smoothstep(0.2, 0.95, r));

    ((hex * 0.8).max(spokes * 0.9) + disc * 0.4).clamp(0.0, 1.0)
}

/// Final fragment alpha of a shader-mode flake, or `None` where the
/// fragment is discarded.
///
/// `twirl` is the per-flake phase; the flake spins with time.
pub fn snowflake_alpha(uv: Vec2, twirl: f32, time: f32, alpha: f32, soft: f32) -> Option<f32> {
    let spin = (twirl + time * 0.3) * 0.35;
    let a = snowflake_coverage(uv, spin, soft) * alpha;
    (a >= ALPHA_CUTOFF).then_some(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(config: SnowConfig) -> SnowField {
        let mut cache = TextureCache::new();
        SnowField::with_rng(config, &mut cache, SmallRng::seed_from_u64(3)).unwrap()
    }

    #[test]
    fn test_rejects_zero_count() {
        let mut cache = TextureCache::new();
        let err = SnowField::new(SnowConfig::default().with_count(0), &mut cache).unwrap_err();
        assert_eq!(err, FieldError::EmptyField { field: "snow" });
    }

    #[test]
    fn test_initial_placement_within_box() {
        let snow = field(SnowConfig::default().with_count(500).with_area(10.0));
        for p in snow.positions().values() {
            assert!(p.x >= -5.0 && p.x <= 5.0);
            assert!(p.z >= -5.0 && p.z <= 5.0);
            assert!(p.y >= 0.0 && p.y < 9.0);
        }
    }

    #[test]
    fn test_sizes_respect_minimum_range() {
        let snow = field(SnowConfig::default().with_count(300).with_sizes(2.0, 2.0));
        for &s in snow.sizes().values() {
            assert!((2.0..2.1).contains(&s), "size {s}");
        }
    }

    #[test]
    fn test_fall_is_per_frame_not_per_second() {
        let mut snow = field(SnowConfig::default().with_count(10).with_jitter(0.0));
        let before: Vec<f32> = snow.positions().values().iter().map(|p| p.y).collect();
        snow.update(10.0);
        for (b, p) in before.iter().zip(snow.positions().values()) {
            assert!((b - p.y - 0.2).abs() < 1e-4);
        }
        assert_eq!(snow.time(), 10.0);
    }

    #[test]
    fn test_wraps_to_top() {
        let mut snow = field(
            SnowConfig::default()
                .with_count(1)
                .with_area(10.0)
                .with_speed(0.5)
                .with_jitter(0.0),
        );
        snow.positions.values_mut()[0].y = -4.8;
        snow.update(0.016);
        assert!((snow.positions()[0].y - 4.5).abs() < 1e-5);
    }

    #[test]
    fn test_update_marks_dirty() {
        let mut snow = field(SnowConfig::default().with_count(4));
        assert!(snow.positions.take_dirty());
        snow.update(0.016);
        assert!(snow.positions().is_dirty());
        assert_eq!(snow.len(), 4);
    }

    #[test]
    fn test_sprite_mode_uses_cache() {
        let mut cache = TextureCache::new();
        let config = SnowConfig::default()
            .with_count(3)
            .with_render_mode(SnowRenderMode::Sprite);
        let a = SnowField::new(config.clone(), &mut cache).unwrap();
        let b = SnowField::new(config, &mut cache).unwrap();
        assert_eq!(cache.created(), 1);
        assert!(Arc::ptr_eq(a.sprite().unwrap(), b.sprite().unwrap()));

        let shader = SnowField::new(SnowConfig::default().with_count(3), &mut cache).unwrap();
        assert!(shader.sprite().is_none());
    }

    #[test]
    fn test_point_size_shrinks_with_depth() {
        assert_eq!(point_screen_size(2.0, 10.0), 48.0);
        assert!(point_screen_size(2.0, 40.0) < point_screen_size(2.0, 20.0));
    }

    #[test]
    fn test_flake_center_visible_corner_discarded() {
        let center = snowflake_alpha(Vec2::splat(0.5), 0.0, 0.0, 0.95, 0.25);
        assert!(center.unwrap() > 0.5);

        let corner = snowflake_alpha(Vec2::ZERO, 0.0, 0.0, 0.95, 0.25);
        assert!(corner.is_none());
    }

    #[test]
    fn test_low_alpha_is_discarded_not_faded() {
        assert!(snowflake_alpha(Vec2::splat(0.5), 0.0, 0.0, 0.01, 0.25).is_none());
    }

    #[test]
    fn test_spoke_outshines_gap_outside_hex() {
        // Radius 0.8 lies outside the hexagon; only spokes and disc remain.
        let on = snowflake_coverage(Vec2::new(0.5 + 0.4, 0.5), 0.0, 0.25);
        let a = PI / 6.0;
        let off = snowflake_coverage(
            Vec2::new(0.5 + 0.4 * a.cos(), 0.5 + 0.4 * a.sin()),
            0.0,
            0.25,
        );
        assert!(on > off, "on = {on}, off = {off}");
    }

    #[test]
    fn test_flutter_is_small() {
        let o = flutter_offset(Vec3::new(1.0, 2.0, 3.0), 0.7, 12.0);
        assert!(o.x.abs() <= 0.05 && o.z.abs() <= 0.05);
        assert_eq!(o.y, 0.0);
    }
}
