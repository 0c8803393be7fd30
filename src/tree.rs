//! The particle tree and its glowing topper.
//!
//! Particles are scattered once into a cone that narrows towards the top,
//! with a wavy branch offset and a little jitter. Nothing moves per
//! particle afterwards; the whole cloud spins about the Y axis through its
//! model matrix. The topper sits above the apex and does not spin.

use glam::{Mat4, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use crate::buffer::Attribute;
use crate::error::FieldError;
use crate::field::{ensure_count, ensure_positive, ParticleField, PointColumns};
use crate::visuals::hex;

/// Spin rate of the particle cloud in rad/s.
pub const SPIN_RATE: f32 = 0.4;

/// Share of particles that become ornaments.
pub const ORNAMENT_RATIO: f64 = 0.05;

/// Circumradius of the topper icosahedron.
pub const TOPPER_RADIUS: f32 = 1.2;

pub const NEEDLE_COLOR: u32 = 0x35ff9b;
pub const ORNAMENT_RED: u32 = 0xff3d65;
pub const ORNAMENT_GOLD: u32 = 0xffd27d;

/// Tree parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeConfig {
    pub height: f32,
    pub radius: f32,
    /// Number of particles.
    pub density: usize,
    /// World size of each point.
    pub point_size: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            height: 22.0,
            radius: 9.0,
            density: 38_000,
            point_size: 0.15,
        }
    }
}

impl TreeConfig {
    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_density(mut self, density: usize) -> Self {
        self.density = density;
        self
    }

    pub fn with_point_size(mut self, size: f32) -> Self {
        self.point_size = size;
        self
    }
}

/// Spinning cone of colored points.
#[derive(Debug)]
pub struct TreeField {
    config: TreeConfig,
    positions: Attribute<Vec3>,
    colors: Attribute<Vec3>,
    ornaments: usize,
    rotation: f32,
    time: f32,
}

impl TreeField {
    pub fn new(config: TreeConfig) -> Result<Self, FieldError> {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    pub fn with_rng(config: TreeConfig, mut rng: SmallRng) -> Result<Self, FieldError> {
        let count = ensure_count("tree", config.density)?;
        let h = ensure_positive("tree", "height", config.height)?;
        let radius = ensure_positive("tree", "radius", config.radius)?;

        let green = hex(NEEDLE_COLOR);
        let red = hex(ORNAMENT_RED);
        let gold = hex(ORNAMENT_GOLD);

        let mut positions = Vec::with_capacity(count);
        let mut colors = Vec::with_capacity(count);
        let mut ornaments = 0;

        for _ in 0..count {
            let y = rng.gen::<f32>() * h;
            let t = 1.0 - y / h;
            let r = t.powf(1.1) * radius * (0.6 + rng.gen::<f32>() * 0.6);
            let angle = rng.gen::<f32>() * TAU;
            let wave = (y * 1.4 + angle * 3.0).sin() * 0.6 * t;
            let jitter = (rng.gen::<f32>() - 0.5) * 0.6 * t;
            let bend = (1.0 - t) * 0.15;

            let p = Vec3::new(
                angle.cos() * (r + wave) + jitter,
                y - h * 0.5 + bend,
                angle.sin() * (r + wave) + jitter,
            );

            let color = if rng.gen_bool(ORNAMENT_RATIO) {
                ornaments += 1;
                if rng.gen_bool(0.5) {
                    red
                } else {
                    gold
                }
            } else {
                let mix = (p.y + h * 0.5) / h;
                green * (0.6 + mix * 0.6)
            };

            positions.push(p);
            colors.push(color);
        }

        Ok(Self {
            config,
            positions: Attribute::from_vec(positions),
            colors: Attribute::from_vec(colors),
            ornaments,
            rotation: 0.0,
            time: 0.0,
        })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn colors(&self) -> &Attribute<Vec3> {
        &self.colors
    }

    /// Number of particles colored as ornaments.
    pub fn ornament_count(&self) -> usize {
        self.ornaments
    }

    /// Current spin about Y in radians.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotation)
    }

    /// Where the topper sits.
    pub fn apex(&self) -> Vec3 {
        Vec3::new(0.0, self.config.height * 0.5 + 0.5, 0.0)
    }
}

impl ParticleField for TreeField {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn len(&self) -> usize {
        self.positions.len()
    }

    /// Spins the cloud. Positions are left untouched.
    fn update(&mut self, dt: f32) {
        self.rotation = (self.rotation + dt * SPIN_RATE) % TAU;
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
            sizes: None,
            phases: None,
            colors: Some(&mut self.colors),
        }
    }
}

/// Surface material of the topper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopperMaterial {
    pub color: Vec3,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
    pub metalness: f32,
    pub roughness: f32,
}

impl Default for TopperMaterial {
    fn default() -> Self {
        Self {
            color: hex(0xfffed1),
            emissive: hex(0xfff6a8),
            emissive_intensity: 2.5,
            metalness: 0.1,
            roughness: 0.2,
        }
    }
}

/// Triangle mesh with flat normals, ready for a vertex buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Icosahedron of circumradius `radius` centered at `center`, unrolled to
/// 20 independent triangles so every face gets its own normal.
pub fn icosahedron(radius: f32, center: Vec3) -> Mesh {
    let phi = (1.0 + 5.0f32.sqrt()) * 0.5;
    let corners = [
        Vec3::new(-1.0, phi, 0.0),
        Vec3::new(1.0, phi, 0.0),
        Vec3::new(-1.0, -phi, 0.0),
        Vec3::new(1.0, -phi, 0.0),
        Vec3::new(0.0, -1.0, phi),
        Vec3::new(0.0, 1.0, phi),
        Vec3::new(0.0, -1.0, -phi),
        Vec3::new(0.0, 1.0, -phi),
        Vec3::new(phi, 0.0, -1.0),
        Vec3::new(phi, 0.0, 1.0),
        Vec3::new(-phi, 0.0, -1.0),
        Vec3::new(-phi, 0.0, 1.0),
    ];
    const FACES: [[usize; 3]; 20] = [
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    let mut positions = Vec::with_capacity(60);
    let mut normals = Vec::with_capacity(60);
    for face in FACES {
        let [a, b, c] = face.map(|i| corners[i].normalize() * radius);
        let normal = (b - a).cross(c - a).normalize();
        for v in [a, b, c] {
            positions.push(v + center);
            normals.push(normal);
        }
    }
    Mesh { positions, normals }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(density: usize) -> TreeField {
        TreeField::with_rng(
            TreeConfig::default().with_density(density),
            SmallRng::seed_from_u64(21),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_zero_density() {
        assert!(TreeField::new(TreeConfig::default().with_density(0)).is_err());
    }

    #[test]
    fn test_points_stay_inside_cone_height() {
        let t = tree(5000);
        for p in t.positions().values() {
            assert!(p.y >= -11.0 && p.y <= 11.2, "y = {}", p.y);
        }
    }

    #[test]
    fn test_narrower_near_top() {
        let t = tree(20_000);
        let max_r = |lo: f32, hi: f32| {
            t.positions()
                .values()
                .iter()
                .filter(|p| p.y >= lo && p.y < hi)
                .map(|p| (p.x * p.x + p.z * p.z).sqrt())
                .fold(0.0f32, f32::max)
        };
        assert!(max_r(6.0, 11.5) < max_r(-11.0, -6.0));
    }

    #[test]
    fn test_ornament_ratio() {
        let t = tree(20_000);
        let ratio = t.ornament_count() as f64 / t.len() as f64;
        assert!((0.035..0.065).contains(&ratio), "ratio = {ratio}");
    }

    #[test]
    fn test_top_greens_brighter_than_bottom() {
        let t = tree(20_000);
        let green = hex(NEEDLE_COLOR);
        let mean = |lo: f32, hi: f32| {
            let (sum, n) = t
                .positions()
                .values()
                .iter()
                .zip(t.colors().values())
                .filter(|(p, c)| p.y >= lo && p.y < hi && (c.y / green.y - c.x / green.x.max(1e-6)).abs() < 1e-3)
                .fold((0.0, 0), |(s, n), (_, c)| (s + c.y, n + 1));
            sum / n.max(1) as f32
        };
        assert!(mean(5.0, 11.5) > mean(-11.0, -5.0));
    }

    #[test]
    fn test_update_spins_without_touching_positions() {
        let mut t = tree(100);
        t.positions.take_dirty();
        let before = t.positions().values().to_vec();
        t.update(1.0);
        assert!((t.rotation() - 0.4).abs() < 1e-6);
        assert_eq!(t.positions().values(), &before[..]);
        assert!(!t.positions().is_dirty());
    }

    #[test]
    fn test_apex_above_tree() {
        let t = tree(10);
        assert_eq!(t.apex(), Vec3::new(0.0, 11.5, 0.0));
    }

    #[test]
    fn test_icosahedron_shape() {
        let mesh = icosahedron(1.2, Vec3::ZERO);
        assert_eq!(mesh.vertex_count(), 60);
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            assert!((p.length() - 1.2).abs() < 1e-4);
            // Outward facing.
            assert!(p.dot(*n) > 0.0);
        }
    }
}
