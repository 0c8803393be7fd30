//! Translation of window input into scene actions.
//!
//! The left button does double duty: a press queues a firework burst at
//! the cursor, and holding it while moving orbits the camera. Keyboard
//! shortcuts stand in for the settings panel:
//!
//! | Key     | Action                |
//! |---------|-----------------------|
//! | `R`     | toggle auto-rotate    |
//! | `B`     | toggle bloom          |
//! | `S`     | toggle snow           |
//! | `F`     | toggle fireworks      |
//! | `M`     | toggle music          |
//! | `T`     | next track            |
//! | `+`/`-` | volume up/down        |
//! | `F11`   | toggle fullscreen     |
//! | `Esc`   | quit                  |

use glam::Vec2;
use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::events::SceneEvent;
use crate::settings::SettingsAction;

/// Volume change per key press.
pub const VOLUME_STEP: f32 = 0.1;

/// What a window event asks the app to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    /// Forward to the scene queue.
    Scene(SceneEvent),
    /// Orbit the camera by a drag of this many pixels.
    Orbit(Vec2),
    ToggleFullscreen,
    Exit,
}

/// Map a key press to its action.
pub fn action_for_key(key: KeyCode) -> Option<InputAction> {
    let settings = |a| Some(InputAction::Scene(SceneEvent::Settings(a)));
    match key {
        KeyCode::KeyR => settings(SettingsAction::ToggleAutoRotate),
        KeyCode::KeyB => settings(SettingsAction::ToggleBloom),
        KeyCode::KeyS => settings(SettingsAction::ToggleSnow),
        KeyCode::KeyF => settings(SettingsAction::ToggleFireworks),
        KeyCode::KeyM => settings(SettingsAction::ToggleMusic),
        KeyCode::KeyT => settings(SettingsAction::NextTrack),
        KeyCode::Equal | KeyCode::NumpadAdd => settings(SettingsAction::AdjustVolume(VOLUME_STEP)),
        KeyCode::Minus | KeyCode::NumpadSubtract => {
            settings(SettingsAction::AdjustVolume(-VOLUME_STEP))
        }
        KeyCode::F11 => Some(InputAction::ToggleFullscreen),
        KeyCode::Escape => Some(InputAction::Exit),
        _ => None,
    }
}

/// Keyboard and pointer state for one window.
#[derive(Debug, Default)]
pub struct Input {
    keys_held: HashSet<KeyCode>,
    cursor: Vec2,
    dragging: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor position in device pixels.
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Process a winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<InputAction> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return None;
                };
                match event.state {
                    ElementState::Pressed => self.key_down(key),
                    ElementState::Released => {
                        self.keys_held.remove(&key);
                        None
                    }
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.pointer_down(),
                ElementState::Released => {
                    self.dragging = false;
                    None
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(Vec2::new(position.x as f32, position.y as f32))
            }
            WindowEvent::Focused(false) => {
                self.keys_held.clear();
                self.dragging = false;
                None
            }
            _ => None,
        }
    }

    /// Key repeat is swallowed; only the first press acts.
    fn key_down(&mut self, key: KeyCode) -> Option<InputAction> {
        if !self.keys_held.insert(key) {
            return None;
        }
        action_for_key(key)
    }

    fn pointer_down(&mut self) -> Option<InputAction> {
        self.dragging = true;
        Some(InputAction::Scene(SceneEvent::PointerDown {
            position: self.cursor,
        }))
    }

    fn cursor_moved(&mut self, position: Vec2) -> Option<InputAction> {
        let delta = position - self.cursor;
        self.cursor = position;
        self.dragging.then_some(InputAction::Orbit(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        assert_eq!(
            action_for_key(KeyCode::KeyS),
            Some(InputAction::Scene(SceneEvent::Settings(SettingsAction::ToggleSnow)))
        );
        assert_eq!(action_for_key(KeyCode::F11), Some(InputAction::ToggleFullscreen));
        assert_eq!(action_for_key(KeyCode::KeyQ), None);
    }

    #[test]
    fn test_key_repeat_swallowed() {
        let mut input = Input::new();
        assert!(input.key_down(KeyCode::KeyB).is_some());
        assert!(input.key_down(KeyCode::KeyB).is_none());
        input.keys_held.remove(&KeyCode::KeyB);
        assert!(input.key_down(KeyCode::KeyB).is_some());
    }

    #[test]
    fn test_press_reports_cursor_position() {
        let mut input = Input::new();
        input.cursor_moved(Vec2::new(120.0, 80.0));
        assert_eq!(
            input.pointer_down(),
            Some(InputAction::Scene(SceneEvent::PointerDown {
                position: Vec2::new(120.0, 80.0)
            }))
        );
    }

    #[test]
    fn test_drag_orbits_only_while_held() {
        let mut input = Input::new();
        assert_eq!(input.cursor_moved(Vec2::new(10.0, 10.0)), None);
        input.pointer_down();
        assert_eq!(
            input.cursor_moved(Vec2::new(15.0, 7.0)),
            Some(InputAction::Orbit(Vec2::new(5.0, -3.0)))
        );
        input.dragging = false;
        assert_eq!(input.cursor_moved(Vec2::new(20.0, 7.0)), None);
    }
}
