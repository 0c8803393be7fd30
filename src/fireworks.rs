//! Click-triggered firework bursts.
//!
//! A fixed pool of slots is allocated up front. A burst claims free slots
//! (those with no lifetime left), throws them outwards from the clicked
//! ground point and lets gravity pull them back down. Free slots are parked
//! far below the scene so they never show.

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::buffer::Attribute;
use crate::camera::OrbitCamera;
use crate::error::FieldError;
use crate::field::{ensure_count, random_direction, ParticleField, PointColumns};
use crate::visuals::hex;

/// Where free slots wait.
pub const PARKED: Vec3 = Vec3::new(0.0, -9999.0, 0.0);

/// Burst colors, assigned to slots round-robin.
pub const PALETTE: [u32; 4] = [0xff6b6b, 0xffd86b, 0x6bc7ff, 0xb06bff];

/// World radius of a spark at scale 1.
pub const SPARK_RADIUS: f32 = 0.12;

/// Pool and burst parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FireworkConfig {
    pub capacity: usize,
    /// Most slots a single burst may claim.
    pub burst_size: usize,
    /// Downward acceleration.
    pub gravity: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub min_lifetime: f32,
    pub max_lifetime: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Scale multiplier applied every frame.
    pub scale_decay: f32,
}

impl Default for FireworkConfig {
    fn default() -> Self {
        Self {
            capacity: 2000,
            burst_size: 120,
            gravity: 5.0,
            min_speed: 6.0,
            max_speed: 12.0,
            min_lifetime: 1.6,
            max_lifetime: 2.3,
            min_scale: 0.08,
            max_scale: 0.14,
            scale_decay: 0.995,
        }
    }
}

impl FireworkConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_burst_size(mut self, burst_size: usize) -> Self {
        self.burst_size = burst_size;
        self
    }
}

/// Pool of firework sparks plus the pointer-to-burst plumbing.
#[derive(Debug)]
pub struct BurstController {
    config: FireworkConfig,
    positions: Attribute<Vec3>,
    scales: Attribute<f32>,
    colors: Attribute<Vec3>,
    velocities: Vec<Vec3>,
    lifetimes: Vec<f32>,
    /// Euler X and Y rotation.
    rotations: Vec<Vec2>,
    enabled: bool,
    time: f32,
    rng: SmallRng,
}

impl BurstController {
    pub fn new(config: FireworkConfig) -> Result<Self, FieldError> {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    pub fn with_rng(config: FireworkConfig, rng: SmallRng) -> Result<Self, FieldError> {
        let capacity = ensure_count("fireworks", config.capacity)?;
        let palette: Vec<Vec3> = PALETTE.iter().map(|&c| hex(c)).collect();
        let colors = (0..capacity).map(|i| palette[i % palette.len()]).collect();

        Ok(Self {
            config,
            positions: Attribute::filled(capacity, PARKED),
            scales: Attribute::filled(capacity, 0.0),
            colors: Attribute::from_vec(colors),
            velocities: vec![Vec3::ZERO; capacity],
            lifetimes: vec![0.0; capacity],
            rotations: vec![Vec2::ZERO; capacity],
            enabled: true,
            time: 0.0,
            rng,
        })
    }

    pub fn config(&self) -> &FireworkConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn bursts on or off. Disabling frees and parks every slot.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.lifetimes.fill(0.0);
            self.positions.values_mut().fill(PARKED);
            self.positions.mark_dirty();
        }
    }

    pub fn capacity(&self) -> usize {
        self.lifetimes.len()
    }

    /// Slots currently in flight.
    pub fn active_count(&self) -> usize {
        self.lifetimes.iter().filter(|&&l| l > 0.0).count()
    }

    pub fn lifetimes(&self) -> &[f32] {
        &self.lifetimes
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    pub fn scales(&self) -> &Attribute<f32> {
        &self.scales
    }

    pub fn colors(&self) -> &Attribute<Vec3> {
        &self.colors
    }

    /// Launch up to `burst_size` sparks from `origin`, using free slots in
    /// index order. Returns how many were launched.
    pub fn spawn_burst(&mut self, origin: Vec3) -> usize {
        if !self.enabled {
            return 0;
        }
        let c = &self.config;
        let mut spawned = 0;
        for i in 0..self.lifetimes.len() {
            if spawned == c.burst_size {
                break;
            }
            if self.lifetimes[i] > 0.0 {
                continue;
            }
            let speed = self.rng.gen_range(c.min_speed..c.max_speed);
            self.velocities[i] = random_direction(&mut self.rng) * speed;
            self.lifetimes[i] = self.rng.gen_range(c.min_lifetime..c.max_lifetime);
            self.rotations[i] = Vec2::ZERO;
            self.scales.values_mut()[i] = self.rng.gen_range(c.min_scale..c.max_scale);
            self.positions.values_mut()[i] = origin;
            spawned += 1;
        }
        if spawned > 0 {
            self.positions.mark_dirty();
            self.scales.mark_dirty();
            log::debug!("burst at {origin:?}: {spawned} sparks");
        }
        spawned
    }

    /// Cast a pointer press onto the ground plane and burst there.
    ///
    /// Presses that miss the ground are ignored and return `None`.
    pub fn handle_pointer(
        &mut self,
        pixel: Vec2,
        viewport: Vec2,
        camera: &OrbitCamera,
    ) -> Option<usize> {
        if !self.enabled {
            return None;
        }
        let hit = camera
            .ray_from_screen(pixel, viewport)?
            .intersect_horizontal_plane(0.0)?;
        Some(self.spawn_burst(hit))
    }

    /// Full transform of every slot: translation, XYZ Euler rotation and
    /// uniform scale.
    pub fn instance_matrices(&self) -> Vec<Mat4> {
        self.positions
            .values()
            .iter()
            .zip(&self.rotations)
            .zip(self.scales.values())
            .map(|((&p, r), &s)| {
                Mat4::from_scale_rotation_translation(
                    Vec3::splat(s),
                    Quat::from_euler(EulerRot::XYZ, r.x, r.y, 0.0),
                    p,
                )
            })
            .collect()
    }
}

impl ParticleField for BurstController {
    fn name(&self) -> &'static str {
        "fireworks"
    }

    fn len(&self) -> usize {
        self.lifetimes.len()
    }

    fn update(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }
        let gravity = self.config.gravity;
        let decay = self.config.scale_decay;
        let positions = self.positions.values_mut();
        let scales = self.scales.values_mut();

        let mut changed = false;
        for i in 0..self.lifetimes.len() {
            if self.lifetimes[i] > 0.0 {
                self.lifetimes[i] -= dt;
                self.velocities[i].y -= gravity * dt;
                positions[i] += self.velocities[i] * dt;
                self.rotations[i] += Vec2::new(3.0, 2.0) * dt;
                scales[i] *= decay;
                // Expired this frame: never drawn past its last live spot.
                if self.lifetimes[i] <= 0.0 {
                    positions[i] = PARKED;
                }
                changed = true;
            } else if positions[i] != PARKED {
                positions[i] = PARKED;
                changed = true;
            }
        }
        if changed {
            self.positions.mark_dirty();
            self.scales.mark_dirty();
        }
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
            sizes: Some(&mut self.scales),
            phases: None,
            colors: Some(&mut self.colors),
        }
    }
}
