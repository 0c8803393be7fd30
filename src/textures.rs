//! Procedural textures and the sprite cache.
//!
//! Textures are generated on the CPU as RGBA8 pixels and uploaded by the
//! renderer. The snowflake sprite is the only image the scene needs; it is
//! drawn once per resolution and shared through a [`TextureCache`] that the
//! composer hands to whichever field asks for it.
//!
//! ```ignore
//! let mut cache = TextureCache::new();
//! let a = cache.snowflake(128);
//! let b = cache.snowflake(128);
//! assert!(Arc::ptr_eq(&a, &b));
//! ```

use glam::Vec2;
use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::Arc;

/// Filter mode for texture sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Smooth linear filtering (default).
    #[default]
    Linear,
    /// Sharp nearest-neighbor filtering.
    Nearest,
}

impl FilterMode {
    pub fn to_wgpu(self) -> wgpu::FilterMode {
        match self {
            FilterMode::Linear => wgpu::FilterMode::Linear,
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
        }
    }
}

/// Configuration for a single texture.
#[derive(Debug, Clone)]
pub struct TextureConfig {
    /// Raw RGBA pixel data (width * height * 4 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub filter: FilterMode,
}

impl TextureConfig {
    /// Create a solid color texture (1x1 pixel).
    ///
    /// Layers without a sprite bind a white pixel so one shader layout fits
    /// every point layer.
    pub fn solid(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            data: vec![r, g, b, a],
            width: 1,
            height: 1,
            filter: FilterMode::Nearest,
        }
    }

    /// Soft six-armed snowflake on a transparent background.
    ///
    /// A white radial gradient (opaque center, transparent rim) with six
    /// round-capped spokes at 60° steps drawn over it at 0.9 opacity.
    /// Spokes run from just behind the center (`0.05 * size`) out to
    /// `0.38 * size`; stroke width is `max(1, 0.03 * size)` pixels.
    pub fn snowflake(size: u32) -> Self {
        let size = size.max(1);
        let s = size as f32;
        let center = Vec2::splat(s * 0.5);
        let half_width = (s * 0.03).max(1.0) * 0.5;

        let spokes: Vec<(Vec2, Vec2)> = (0..6)
            .map(|i| {
                let a = PI / 3.0 * i as f32;
                let dir = Vec2::new(a.cos(), a.sin());
                (center - dir * s * 0.05, center + dir * s * 0.38)
            })
            .collect();

        let mut data = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);

                let r = p.distance(center) / (s * 0.5);
                let glow = (1.0 - r).clamp(0.0, 1.0);

                let d = spokes
                    .iter()
                    .map(|&(a, b)| segment_distance(p, a, b))
                    .fold(f32::INFINITY, f32::min);
                let stroke = (half_width + 0.5 - d).clamp(0.0, 1.0) * 0.9;

                // Source-over composite of the stroke on the gradient.
                let alpha = stroke + glow * (1.0 - stroke);
                data.extend_from_slice(&[255, 255, 255, to_u8(alpha)]);
            }
        }

        Self {
            data,
            width: size,
            height: size,
            filter: FilterMode::Linear,
        }
    }

    /// Alpha of the pixel at `(x, y)`.
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.data[((y * self.width + x) * 4 + 3) as usize]
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let t = ((p - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Generated textures keyed by resolution.
///
/// Lookups for a size that was already generated return the same shared
/// texture; nothing is ever evicted.
#[derive(Debug, Default)]
pub struct TextureCache {
    snowflakes: HashMap<u32, Arc<TextureConfig>>,
    created: usize,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snowflake sprite at `size` pixels, generated on first use.
    pub fn snowflake(&mut self, size: u32) -> Arc<TextureConfig> {
        if let Some(tex) = self.snowflakes.get(&size) {
            return Arc::clone(tex);
        }
        log::debug!("generating {size}px snowflake sprite");
        let tex = Arc::new(TextureConfig::snowflake(size));
        self.snowflakes.insert(size, Arc::clone(&tex));
        self.created += 1;
        tex
    }

    /// Number of textures generated so far.
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn len(&self) -> usize {
        self.snowflakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snowflakes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid() {
        let tex = TextureConfig::solid(255, 255, 255, 255);
        assert_eq!(tex.data, vec![255, 255, 255, 255]);
        assert_eq!(tex.filter, FilterMode::Nearest);
    }

    #[test]
    fn test_snowflake_dimensions() {
        let tex = TextureConfig::snowflake(64);
        assert_eq!(tex.width, 64);
        assert_eq!(tex.height, 64);
        assert_eq!(tex.data.len(), 64 * 64 * 4);
    }

    #[test]
    fn test_snowflake_opaque_center_clear_corners() {
        let tex = TextureConfig::snowflake(128);
        assert!(tex.alpha_at(64, 64) > 200);
        assert_eq!(tex.alpha_at(0, 0), 0);
        assert_eq!(tex.alpha_at(127, 127), 0);
    }

    #[test]
    fn test_snowflake_spokes_brighter_than_gaps() {
        let tex = TextureConfig::snowflake(128);
        // Along the 0° spoke vs. the 30° gap at the same radius.
        let r = 40.0f32;
        let on = tex.alpha_at(64 + r as u32, 64);
        let gap_x = 64.0 + r * (PI / 6.0).cos();
        let gap_y = 64.0 + r * (PI / 6.0).sin();
        let off = tex.alpha_at(gap_x as u32, gap_y as u32);
        assert!(on > off + 50, "on = {on}, off = {off}");
    }

    #[test]
    fn test_cache_creates_once_per_size() {
        let mut cache = TextureCache::new();
        let a = cache.snowflake(32);
        let b = cache.snowflake(32);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.created(), 1);

        let c = cache.snowflake(16);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.created(), 2);
        assert_eq!(cache.len(), 2);
    }
}
