//! Frame timing.
//!
//! Provides the per-frame delta fed to every field. Deltas are clamped so a
//! stalled frame (window dragged, laptop resumed) cannot launch fireworks
//! across the scene or fast-forward the ring in one step.
//!
//! # Example
//!
//! ```ignore
//! use yuletide::time::Time;
//!
//! let mut time = Time::new();
//!
//! // In the redraw handler:
//! let dt = time.update();
//! composer.frame(dt);
//! ```

use std::time::Instant;

/// Largest delta handed to the simulation, in seconds.
pub const MAX_DELTA: f32 = 0.1;

/// Time tracking for the frame loop.
#[derive(Debug)]
pub struct Time {
    /// When the last frame occurred.
    last_frame: Instant,
    /// Whether time is paused.
    paused: bool,
}

impl Time {
    /// Create a new time tracker starting from now.
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            paused: false,
        }
    }

    /// Update timing values. Call once per frame.
    ///
    /// Returns the clamped delta in seconds, or 0 while paused.
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        let raw_delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if self.paused {
            return 0.0;
        }
        raw_delta.clamp(0.0, MAX_DELTA)
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop time while the window is occluded.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume after pausing. The paused interval is skipped, not replayed.
    pub fn resume(&mut self) {
        if self.paused {
            self.last_frame = Instant::now();
            self.paused = false;
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
