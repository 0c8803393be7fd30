//! Scene composition.
//!
//! [`SceneComposer`] owns the settings record and every field. Once per
//! frame it drains queued events, re-derives each field's parameters from
//! the settings, rebuilds any field whose parameters changed, fires
//! fireworks for queued pointer presses and finally advances every field.
//!
//! ```ignore
//! let mut scene = SceneComposer::new(Vec2::new(1280.0, 720.0))?;
//! scene.push_event(SceneEvent::PointerDown { position: Vec2::new(640.0, 500.0) });
//! scene.frame(1.0 / 60.0)?;
//! ```

use glam::{Vec2, Vec3};

use crate::camera::OrbitCamera;
use crate::error::FieldError;
use crate::events::{EventQueue, SceneEvent};
use crate::field::ParticleField;
use crate::fireworks::{BurstController, FireworkConfig};
use crate::quality::{PerformanceMonitor, QualityController};
use crate::ring::{RingConfig, RingField};
use crate::settings::{Settings, Track};
use crate::snow::{SnowConfig, SnowField, SnowRenderMode};
use crate::stars::{StarConfig, StarField};
use crate::textures::TextureCache;
use crate::tree::{TreeConfig, TreeField};
use crate::visuals::hex;

/// Field parameters derived from one settings snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfigs {
    /// `None` while snow is switched off.
    pub snow: Option<SnowConfig>,
    pub tree: TreeConfig,
    pub ring: RingConfig,
    pub stars: StarConfig,
}

impl FieldConfigs {
    pub fn from_settings(settings: &Settings) -> Self {
        let mobile = settings.is_mobile;
        let pick = |m: f32, d: f32| if mobile { m } else { d };

        let snow = settings.snow.then(|| {
            SnowConfig::default()
                .with_count(settings.snow_count)
                .with_sizes(pick(1.2, 2.0), pick(2.6, 4.0))
                .with_alpha(pick(0.8, 0.95))
                .with_soft(pick(0.35, 0.25))
                .with_render_mode(if mobile {
                    SnowRenderMode::Sprite
                } else {
                    SnowRenderMode::Shader
                })
                .with_sprite_size(pick(3.5, 6.0))
        });

        let ring = RingConfig::default()
            .with_count(settings.ring_count)
            .with_alpha(pick(0.45, 0.6))
            .with_radius(pick(16.0, 18.0))
            .with_thickness(pick(3.0, 4.0))
            .with_y_offset(-6.5);

        Self {
            snow,
            tree: TreeConfig::default().with_density(settings.tree_density),
            ring,
            stars: StarConfig::default().with_count(if mobile { 900 } else { 2000 }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomParams {
    pub intensity: f32,
    /// Luminance where bloom starts.
    pub threshold: f32,
    /// Width of the threshold knee.
    pub smoothing: f32,
    /// Blur radius in `[0, 1]`.
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VignetteParams {
    pub offset: f32,
    pub darkness: f32,
}

/// Lighting, fog and post-processing for the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderProfile {
    pub background: Vec3,
    pub fog_color: Vec3,
    pub fog_near: f32,
    pub fog_far: f32,
    pub ambient_intensity: f32,
    pub light_position: Vec3,
    pub light_intensity: f32,
    pub bloom: Option<BloomParams>,
    /// Film grain opacity.
    pub noise: Option<f32>,
    pub vignette: Option<VignetteParams>,
    /// Tone-mapping exposure.
    pub exposure: f32,
}

impl RenderProfile {
    /// Effects are only composed while bloom is enabled. Mobile clamps the
    /// bloom intensity and skips film grain.
    pub fn from_settings(settings: &Settings) -> Self {
        let mobile = settings.is_mobile;
        let effects = settings.bloom;
        let intensity = if mobile {
            settings.bloom_intensity.min(1.0)
        } else {
            settings.bloom_intensity
        };

        Self {
            background: Vec3::ZERO,
            fog_color: hex(0x000010),
            fog_near: 30.0,
            fog_far: 120.0,
            ambient_intensity: 0.6,
            light_position: Vec3::new(10.0, 12.0, 5.0),
            light_intensity: 1.2,
            bloom: effects.then_some(BloomParams {
                intensity,
                threshold: 0.2,
                smoothing: 0.3,
                radius: 0.6,
            }),
            noise: (effects && !mobile).then_some(0.02),
            vignette: effects.then_some(VignetteParams {
                offset: 0.2,
                darkness: 0.65,
            }),
            exposure: if mobile { 0.95 } else { 1.0 },
        }
    }
}

/// Owner of the settings record, the event queue and every field.
#[derive(Debug)]
pub struct SceneComposer {
    settings: Settings,
    queue: EventQueue,
    quality: QualityController,
    monitor: Option<PerformanceMonitor>,
    camera: OrbitCamera,
    viewport: Vec2,
    cache: TextureCache,
    applied: FieldConfigs,
    snow: Option<SnowField>,
    tree: TreeField,
    ring: RingField,
    stars: StarField,
    fireworks: BurstController,
    profile: RenderProfile,
    time: f32,
}

impl SceneComposer {
    /// Build the scene for a viewport of `viewport` device pixels, with
    /// settings chosen from its width.
    pub fn new(viewport: Vec2) -> Result<Self, FieldError> {
        Self::with_settings(Settings::for_viewport(viewport.x), viewport)
    }

    pub fn with_settings(settings: Settings, viewport: Vec2) -> Result<Self, FieldError> {
        let mut cache = TextureCache::new();
        let applied = FieldConfigs::from_settings(&settings);

        let snow = applied
            .snow
            .clone()
            .map(|c| SnowField::new(c, &mut cache))
            .transpose()?;
        let tree = TreeField::new(applied.tree.clone())?;
        let ring = RingField::new(applied.ring.clone())?;
        let stars = StarField::new(applied.stars.clone())?;
        let mut fireworks = BurstController::new(FireworkConfig::default())?;
        fireworks.set_enabled(settings.fireworks);

        let mut camera = OrbitCamera::default();
        camera.set_viewport(viewport.x, viewport.y);
        camera.auto_rotate = settings.auto_rotate;

        log::info!(
            "scene ready: {} tier, snow {}, tree {}, ring {}",
            if settings.is_mobile { "mobile" } else { "desktop" },
            snow.as_ref().map_or(0, |s| s.len()),
            tree.len(),
            ring.len()
        );

        Ok(Self {
            profile: RenderProfile::from_settings(&settings),
            settings,
            queue: EventQueue::new(),
            quality: QualityController::new(),
            monitor: Some(PerformanceMonitor::default()),
            camera,
            viewport,
            cache,
            applied,
            snow,
            tree,
            ring,
            stars,
            fireworks,
            time: 0.0,
        })
    }

    /// Replace the frame-rate watcher. `None` disables adaptive quality.
    pub fn set_performance_monitor(&mut self, monitor: Option<PerformanceMonitor>) {
        self.monitor = monitor;
    }

    /// Queue an event for the next frame.
    pub fn push_event(&mut self, event: SceneEvent) {
        self.queue.push(event);
    }

    /// Advance the scene by `dt` seconds.
    pub fn frame(&mut self, dt: f32) -> Result<(), FieldError> {
        if let Some(signal) = self.monitor.as_mut().and_then(|m| m.frame(dt)) {
            self.queue.push(SceneEvent::Performance(signal));
        }

        let mut presses = Vec::new();
        for event in self.queue.drain() {
            match event {
                SceneEvent::PointerDown { position } => presses.push(position),
                SceneEvent::Settings(action) => {
                    log::info!("settings: {action:?}");
                    self.settings.apply(action);
                }
                SceneEvent::Performance(signal) => self.quality.apply(signal, &mut self.settings),
                SceneEvent::Resized { width, height } => self.resize(width, height),
            }
        }

        self.compose()?;

        for position in presses {
            if let Some(n) = self
                .fireworks
                .handle_pointer(position, self.viewport, &self.camera)
            {
                log::debug!("pointer at {position:?} launched {n} sparks");
            }
        }

        self.camera.update(dt);
        if let Some(snow) = self.snow.as_mut() {
            snow.update(dt);
        }
        self.tree.update(dt);
        self.ring.update(dt);
        self.stars.update(dt);
        self.fireworks.update(dt);
        self.time += dt;
        Ok(())
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Vec2::new(width, height);
        self.camera.set_viewport(width, height);
        if self.settings.set_viewport_width(width) {
            log::info!(
                "viewport {width}x{height} switched to {} tier",
                if self.settings.is_mobile { "mobile" } else { "desktop" }
            );
        }
    }

    /// Bring the fields in line with the current settings.
    ///
    /// Only fields whose derived parameters changed are rebuilt; a rebuilt
    /// field starts over with fresh random state.
    pub fn compose(&mut self) -> Result<(), FieldError> {
        let next = FieldConfigs::from_settings(&self.settings);

        if next.snow != self.applied.snow {
            self.snow = match &next.snow {
                Some(config) => {
                    log::info!("rebuilding snow: {} flakes", config.count);
                    Some(SnowField::new(config.clone(), &mut self.cache)?)
                }
                None => {
                    log::info!("snow disabled");
                    None
                }
            };
        }
        if next.tree != self.applied.tree {
            log::info!("rebuilding tree: {} particles", next.tree.density);
            self.tree = TreeField::new(next.tree.clone())?;
        }
        if next.ring != self.applied.ring {
            log::info!("rebuilding ring: {} fireflies", next.ring.count);
            self.ring = RingField::new(next.ring.clone())?;
        }
        if next.stars != self.applied.stars {
            self.stars = StarField::new(next.stars.clone())?;
        }
        self.applied = next;

        self.fireworks.set_enabled(self.settings.fireworks);
        self.camera.auto_rotate = self.settings.auto_rotate;
        self.profile = RenderProfile::from_settings(&self.settings);
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Selected track and volume while music is on.
    pub fn music(&self) -> Option<(&'static Track, f32)> {
        self.settings
            .music_enabled
            .then(|| (self.settings.track(), self.settings.volume()))
    }

    pub fn quality(&self) -> &QualityController {
        &self.quality
    }

    pub fn profile(&self) -> &RenderProfile {
        &self.profile
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn texture_cache(&self) -> &TextureCache {
        &self.cache
    }

    pub fn snow(&self) -> Option<&SnowField> {
        self.snow.as_ref()
    }

    pub fn snow_mut(&mut self) -> Option<&mut SnowField> {
        self.snow.as_mut()
    }

    pub fn tree(&self) -> &TreeField {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut TreeField {
        &mut self.tree
    }

    pub fn ring(&self) -> &RingField {
        &self.ring
    }

    pub fn ring_mut(&mut self) -> &mut RingField {
        &mut self.ring
    }

    pub fn stars(&self) -> &StarField {
        &self.stars
    }

    pub fn stars_mut(&mut self) -> &mut StarField {
        &mut self.stars
    }

    pub fn fireworks(&self) -> &BurstController {
        &self.fireworks
    }

    pub fn fireworks_mut(&mut self) -> &mut BurstController {
        &mut self.fireworks
    }

    /// Scene clock in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsAction;

    fn small_settings(is_mobile: bool) -> Settings {
        let mut s = Settings::for_tier(is_mobile);
        s.snow_count = 50;
        s.tree_density = 200;
        s.ring_count = 40;
        s
    }

    #[test]
    fn test_mobile_overrides() {
        let configs = FieldConfigs::from_settings(&Settings::for_tier(true));
        let snow = configs.snow.unwrap();
        assert_eq!(snow.render_mode, SnowRenderMode::Sprite);
        assert_eq!((snow.min_size, snow.max_size), (1.2, 2.6));
        assert_eq!(snow.sprite_size, 3.5);
        assert_eq!(configs.ring.radius, 16.0);
        assert_eq!(configs.ring.alpha, 0.45);
        assert_eq!(configs.ring.y_offset, -6.5);
        assert_eq!(configs.stars.count, 900);
    }

    #[test]
    fn test_desktop_overrides() {
        let configs = FieldConfigs::from_settings(&Settings::for_tier(false));
        let snow = configs.snow.unwrap();
        assert_eq!(snow.render_mode, SnowRenderMode::Shader);
        assert_eq!(snow.alpha, 0.95);
        assert_eq!(configs.ring.thickness, 4.0);
        assert_eq!(configs.stars.count, 2000);
    }

    #[test]
    fn test_profile_effects_follow_bloom() {
        let mut s = Settings::for_tier(false);
        let p = RenderProfile::from_settings(&s);
        assert_eq!(p.bloom.unwrap().intensity, 1.6);
        assert_eq!(p.noise, Some(0.02));
        assert!(p.vignette.is_some());

        s.bloom = false;
        let p = RenderProfile::from_settings(&s);
        assert!(p.bloom.is_none() && p.noise.is_none() && p.vignette.is_none());
    }

    #[test]
    fn test_mobile_profile_clamps_bloom_and_skips_noise() {
        let mut s = Settings::for_tier(true);
        s.bloom = true;
        let p = RenderProfile::from_settings(&s);
        assert_eq!(p.bloom.unwrap().intensity, 1.0);
        assert!(p.noise.is_none());
        assert_eq!(p.exposure, 0.95);
    }

    #[test]
    fn test_toggle_snow_removes_field_same_frame() {
        let mut scene =
            SceneComposer::with_settings(small_settings(false), Vec2::new(1280.0, 720.0)).unwrap();
        assert!(scene.snow().is_some());
        scene.push_event(SceneEvent::Settings(SettingsAction::ToggleSnow));
        scene.frame(0.016).unwrap();
        assert!(scene.snow().is_none());
    }

    #[test]
    fn test_count_change_rebuilds_only_that_field() {
        let mut scene =
            SceneComposer::with_settings(small_settings(false), Vec2::new(1280.0, 720.0)).unwrap();
        scene.frame(0.016).unwrap();
        let tree_rotation = scene.tree().rotation();
        scene.push_event(SceneEvent::Settings(SettingsAction::SetRingCount(64)));
        scene.frame(0.016).unwrap();
        assert_eq!(scene.ring().len(), 64);
        assert_eq!(scene.tree().len(), 200);
        assert!(scene.tree().rotation() > tree_rotation);
    }

    #[test]
    fn test_disabling_fireworks_ignores_pointer() {
        let mut scene =
            SceneComposer::with_settings(small_settings(false), Vec2::new(800.0, 600.0)).unwrap();
        scene.push_event(SceneEvent::Settings(SettingsAction::ToggleFireworks));
        scene.push_event(SceneEvent::PointerDown {
            position: Vec2::new(400.0, 300.0),
        });
        scene.frame(0.016).unwrap();
        assert_eq!(scene.fireworks().active_count(), 0);
    }

    #[test]
    fn test_music_snapshot() {
        let mut scene =
            SceneComposer::with_settings(small_settings(false), Vec2::new(800.0, 600.0)).unwrap();
        assert!(scene.music().is_none());
        scene.push_event(SceneEvent::Settings(SettingsAction::ToggleMusic));
        scene.push_event(SceneEvent::Settings(SettingsAction::NextTrack));
        scene.frame(0.016).unwrap();
        let (track, volume) = scene.music().unwrap();
        assert_eq!(track.title, "A Happy Christmas");
        assert_eq!(volume, 0.5);
    }
}
