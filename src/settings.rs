//! The user-facing settings record and the actions that change it.
//!
//! Settings are created from the viewport width at startup. Narrow
//! viewports count as mobile and start with lighter particle counts and
//! without bloom or fireworks. Nothing here is persisted.

/// Viewports narrower than this are treated as mobile.
pub const MOBILE_BREAKPOINT: f32 = 820.0;

/// Background music selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Track {
    pub title: &'static str,
    pub artist: &'static str,
    pub file: &'static str,
}

/// Tracks the music toggle cycles through.
pub const TRACKS: [Track; 2] = [
    Track {
        title: "Presents On Christmas Morning",
        artist: "Steve Oxen",
        file: "presents_on_christmas_morning.mp3",
    },
    Track {
        title: "A Happy Christmas",
        artist: "David Fesliyan",
        file: "a_happy_christmas.mp3",
    },
];

/// Per-tier defaults for the particle budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierDefaults {
    pub snow_count: usize,
    pub tree_density: usize,
    pub ring_count: usize,
}

impl TierDefaults {
    pub fn for_tier(is_mobile: bool) -> Self {
        if is_mobile {
            Self {
                snow_count: 1000,
                tree_density: 22_000,
                ring_count: 1800,
            }
        } else {
            Self {
                snow_count: 2200,
                tree_density: 36_000,
                ring_count: 3000,
            }
        }
    }
}

/// Everything the composer reads each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub auto_rotate: bool,
    pub bloom: bool,
    pub bloom_intensity: f32,
    pub snow: bool,
    pub snow_count: usize,
    pub tree_density: usize,
    pub ring_count: usize,
    pub fireworks: bool,
    pub is_mobile: bool,
    pub music_enabled: bool,
    pub track_index: usize,
    volume: f32,
}

impl Settings {
    /// Defaults for a viewport `width` pixels wide.
    pub fn for_viewport(width: f32) -> Self {
        Self::for_tier(width < MOBILE_BREAKPOINT)
    }

    pub fn for_tier(is_mobile: bool) -> Self {
        let tier = TierDefaults::for_tier(is_mobile);
        Self {
            auto_rotate: true,
            bloom: !is_mobile,
            bloom_intensity: 1.6,
            snow: true,
            snow_count: tier.snow_count,
            tree_density: tier.tree_density,
            ring_count: tier.ring_count,
            fireworks: !is_mobile,
            is_mobile,
            music_enabled: false,
            track_index: 0,
            volume: 0.5,
        }
    }

    /// React to a viewport resize. Crossing the breakpoint resets the snow
    /// and tree budgets to the new tier's defaults; the ring count and the
    /// effect toggles are left alone. Returns whether the tier changed.
    pub fn set_viewport_width(&mut self, width: f32) -> bool {
        let is_mobile = width < MOBILE_BREAKPOINT;
        if is_mobile == self.is_mobile {
            return false;
        }
        let tier = TierDefaults::for_tier(is_mobile);
        self.is_mobile = is_mobile;
        self.snow_count = tier.snow_count;
        self.tree_density = tier.tree_density;
        true
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the music volume, clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
    }

    pub fn track(&self) -> &'static Track {
        &TRACKS[self.track_index % TRACKS.len()]
    }

    pub fn next_track(&mut self) {
        self.track_index = (self.track_index + 1) % TRACKS.len();
    }

    /// Apply a UI action.
    pub fn apply(&mut self, action: SettingsAction) {
        match action {
            SettingsAction::ToggleAutoRotate => self.auto_rotate = !self.auto_rotate,
            SettingsAction::ToggleBloom => self.bloom = !self.bloom,
            SettingsAction::ToggleSnow => self.snow = !self.snow,
            SettingsAction::ToggleFireworks => self.fireworks = !self.fireworks,
            SettingsAction::ToggleMusic => self.music_enabled = !self.music_enabled,
            SettingsAction::NextTrack => self.next_track(),
            SettingsAction::SetVolume(v) => self.set_volume(v),
            SettingsAction::AdjustVolume(delta) => self.set_volume(self.volume + delta),
            SettingsAction::SetBloomIntensity(v) => self.bloom_intensity = v.max(0.0),
            SettingsAction::SetSnowCount(n) if n > 0 => self.snow_count = n,
            SettingsAction::SetTreeDensity(n) if n > 0 => self.tree_density = n,
            SettingsAction::SetRingCount(n) if n > 0 => self.ring_count = n,
            SettingsAction::SetSnowCount(_)
            | SettingsAction::SetTreeDensity(_)
            | SettingsAction::SetRingCount(_) => {
                log::warn!("ignoring {action:?}: particle counts must be positive");
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::for_tier(false)
    }
}

/// A change requested through the settings surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingsAction {
    ToggleAutoRotate,
    ToggleBloom,
    ToggleSnow,
    ToggleFireworks,
    ToggleMusic,
    NextTrack,
    SetVolume(f32),
    AdjustVolume(f32),
    SetBloomIntensity(f32),
    SetSnowCount(usize),
    SetTreeDensity(usize),
    SetRingCount(usize),
}
