//! Events merged into the frame loop.
//!
//! Pointer presses, settings actions, performance reports and resizes
//! arrive whenever the platform delivers them. They are queued here and
//! drained in arrival order once per frame, so every mutation of scene
//! state happens inside the frame step.

use glam::Vec2;
use std::collections::VecDeque;

use crate::quality::PerformanceSignal;
use crate::settings::SettingsAction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneEvent {
    /// Primary pointer pressed at a device-pixel position.
    PointerDown { position: Vec2 },
    Settings(SettingsAction),
    Performance(PerformanceSignal),
    /// Surface resized to `width` x `height` device pixels.
    Resized { width: f32, height: f32 },
}

/// FIFO of pending scene events.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<SceneEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SceneEvent) {
        self.pending.push_back(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&mut self) -> Vec<SceneEvent> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order_and_empties() {
        let mut q = EventQueue::new();
        q.push(SceneEvent::Settings(SettingsAction::ToggleSnow));
        q.push(SceneEvent::PointerDown {
            position: Vec2::new(1.0, 2.0),
        });
        assert_eq!(q.len(), 2);

        let events = q.drain();
        assert!(q.is_empty());
        assert!(matches!(events[0], SceneEvent::Settings(_)));
        assert!(matches!(events[1], SceneEvent::PointerDown { .. }));
    }
}
