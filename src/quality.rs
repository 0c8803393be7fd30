//! Adaptive quality.
//!
//! [`PerformanceMonitor`] watches frame times and reports sustained slowness
//! or headroom. [`QualityController`] turns those reports into settings
//! changes. The adjustment is a ratchet: declining cuts particle budgets,
//! inclining only restores bloom intensity. Budgets come back only through
//! the user or a tier change.

use crate::settings::Settings;

/// Sustained frame-rate trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceSignal {
    /// Frame rate stayed below the lower bound.
    Decline,
    /// Frame rate stayed above the upper bound.
    Incline,
}

/// Snow budget never drops below this.
pub const MIN_SNOW_COUNT: usize = 500;
/// Tree budget never drops below this.
pub const MIN_TREE_DENSITY: usize = 15_000;

pub const LOW_BLOOM_INTENSITY: f32 = 1.2;
pub const HIGH_BLOOM_INTENSITY: f32 = 1.6;

/// Applies performance signals to the settings record.
#[derive(Debug, Clone, Default)]
pub struct QualityController {
    declines: u32,
    inclines: u32,
}

impl QualityController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, signal: PerformanceSignal, settings: &mut Settings) {
        match signal {
            PerformanceSignal::Decline => {
                self.declines += 1;
                settings.bloom_intensity = LOW_BLOOM_INTENSITY;
                settings.snow_count = reduce(settings.snow_count, 0.6, MIN_SNOW_COUNT);
                settings.tree_density = reduce(settings.tree_density, 0.75, MIN_TREE_DENSITY);
                log::info!(
                    "quality declined: snow {} tree {} bloom {}",
                    settings.snow_count,
                    settings.tree_density,
                    settings.bloom_intensity
                );
            }
            PerformanceSignal::Incline => {
                self.inclines += 1;
                settings.bloom_intensity = HIGH_BLOOM_INTENSITY;
                log::info!("quality inclined: bloom {}", settings.bloom_intensity);
            }
        }
    }

    /// Declines applied so far.
    pub fn declines(&self) -> u32 {
        self.declines
    }

    pub fn inclines(&self) -> u32 {
        self.inclines
    }
}

fn reduce(count: usize, factor: f64, floor: usize) -> usize {
    ((count as f64 * factor).floor() as usize).max(floor)
}

/// Frame-rate watcher.
///
/// Frames are grouped into fixed windows; each window yields one average
/// fps sample. Once enough samples are collected, the monitor reports a
/// decline if most of them fall below `lower`, an incline if most rise
/// above `upper`, and starts over.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    window: f32,
    iterations: usize,
    threshold: f32,
    lower: f32,
    upper: f32,
    elapsed: f32,
    frames: u32,
    samples: Vec<f32>,
}

impl PerformanceMonitor {
    /// Monitor for a display refreshing at `refresh_rate` Hz.
    pub fn new(refresh_rate: Option<f32>) -> Self {
        let upper = match refresh_rate {
            Some(hz) if hz > 90.0 => 90.0,
            _ => 60.0,
        };
        Self {
            window: 0.25,
            iterations: 10,
            threshold: 0.75,
            lower: 50.0,
            upper,
            elapsed: 0.0,
            frames: 0,
            samples: Vec::with_capacity(10),
        }
    }

    /// Override the fps bounds.
    pub fn with_bounds(mut self, lower: f32, upper: f32) -> Self {
        self.lower = lower;
        self.upper = upper;
        self
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.lower, self.upper)
    }

    /// Record one frame that took `dt` seconds.
    pub fn frame(&mut self, dt: f32) -> Option<PerformanceSignal> {
        if dt.is_nan() || dt <= 0.0 {
            return None;
        }
        self.elapsed += dt;
        self.frames += 1;
        if self.elapsed < self.window {
            return None;
        }

        self.samples.push(self.frames as f32 / self.elapsed);
        self.elapsed = 0.0;
        self.frames = 0;
        if self.samples.len() < self.iterations {
            return None;
        }

        let n = self.samples.len() as f32;
        let below = self.samples.iter().filter(|&&f| f < self.lower).count() as f32;
        let above = self.samples.iter().filter(|&&f| f > self.upper).count() as f32;
        self.samples.clear();

        if below / n >= self.threshold {
            Some(PerformanceSignal::Decline)
        } else if above / n >= self.threshold {
            Some(PerformanceSignal::Incline)
        } else {
            None
        }
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decline_arithmetic() {
        let mut settings = Settings::default();
        settings.snow_count = 2200;
        settings.tree_density = 36_000;
        let mut q = QualityController::new();
        q.apply(PerformanceSignal::Decline, &mut settings);
        assert_eq!(settings.snow_count, 1320);
        assert_eq!(settings.tree_density, 27_000);
        assert_eq!(settings.bloom_intensity, 1.2);
    }

    #[test]
    fn test_decline_respects_floors() {
        let mut settings = Settings::default();
        settings.snow_count = 600;
        settings.tree_density = 16_000;
        let mut q = QualityController::new();
        q.apply(PerformanceSignal::Decline, &mut settings);
        assert_eq!(settings.snow_count, 500);
        assert_eq!(settings.tree_density, 15_000);
        for _ in 0..5 {
            q.apply(PerformanceSignal::Decline, &mut settings);
        }
        assert_eq!(settings.snow_count, 500);
        assert_eq!(q.declines(), 6);
    }

    #[test]
    fn test_incline_restores_bloom_only() {
        let mut settings = Settings::default();
        let mut q = QualityController::new();
        q.apply(PerformanceSignal::Decline, &mut settings);
        let (snow, tree) = (settings.snow_count, settings.tree_density);
        q.apply(PerformanceSignal::Incline, &mut settings);
        assert_eq!(settings.bloom_intensity, 1.6);
        assert_eq!(settings.snow_count, snow);
        assert_eq!(settings.tree_density, tree);
    }

    #[test]
    fn test_monitor_reports_decline_when_slow() {
        let mut m = PerformanceMonitor::default();
        let signals: Vec<_> = (0..200).filter_map(|_| m.frame(1.0 / 30.0)).collect();
        assert!(!signals.is_empty());
        assert!(signals.iter().all(|&s| s == PerformanceSignal::Decline));
    }

    #[test]
    fn test_monitor_reports_incline_when_fast() {
        let mut m = PerformanceMonitor::default();
        let signals: Vec<_> = (0..1000).filter_map(|_| m.frame(1.0 / 120.0)).collect();
        assert!(!signals.is_empty());
        assert!(signals.iter().all(|&s| s == PerformanceSignal::Incline));
    }

    #[test]
    fn test_monitor_silent_in_band() {
        let mut m = PerformanceMonitor::default();
        assert!((0..1000).all(|_| m.frame(1.0 / 55.0).is_none()));
    }

    #[test]
    fn test_high_refresh_bounds() {
        assert_eq!(PerformanceMonitor::new(Some(144.0)).bounds(), (50.0, 90.0));
        assert_eq!(PerformanceMonitor::new(Some(60.0)).bounds(), (50.0, 60.0));
    }
}
