//! Input management system
//!
//! The windowing layer feeds raw events into an [`InputManager`]; once per
//! frame the manager hands out an [`InputState`] snapshot that the camera
//! polls. Pointer motion and scroll are per-frame quantities and reset with
//! every snapshot, key and button state persists until released.

use std::collections::HashSet;

use crate::foundation::math::Vec2;

/// Key codes the editor reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// W key (move forward)
    W,
    /// A key (strafe left)
    A,
    /// S key (move back)
    S,
    /// D key (strafe right)
    D,
    /// Q key (move down)
    Q,
    /// E key (move up)
    E,
    /// Left shift (sprint)
    LeftShift,
    /// Left control (pan modifier)
    LeftCtrl,
    /// Left alt (orbit modifier)
    LeftAlt,
    /// Escape key
    Escape,
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
}

/// Input as seen by one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    buttons_down: HashSet<MouseButton>,
    mouse_delta: Vec2,
    scroll: f32,
}

impl InputState {
    /// Snapshot with nothing pressed and no motion
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a held key
    pub fn with_key(mut self, key: KeyCode) -> Self {
        self.keys_down.insert(key);
        self
    }

    /// Add a held mouse button
    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.buttons_down.insert(button);
        self
    }

    /// Set the pointer motion for the frame
    pub fn with_mouse_delta(mut self, dx: f32, dy: f32) -> Self {
        self.mouse_delta = Vec2::new(dx, dy);
        self
    }

    /// Set the scroll signal for the frame (positive scrolls forward)
    pub fn with_scroll(mut self, scroll: f32) -> Self {
        self.scroll = scroll;
        self
    }

    /// Whether `key` is held
    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Whether `button` is held
    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// Pointer motion in pixels since the previous frame
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Scroll signal of the frame
    pub fn scroll(&self) -> f32 {
        self.scroll
    }
}

/// Accumulates window events between frames
#[derive(Debug, Default)]
pub struct InputManager {
    current: InputState,
    last_cursor: Option<Vec2>,
}

impl InputManager {
    /// Create a new input manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle key input
    pub fn handle_key_input(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.current.keys_down.insert(key);
        } else {
            self.current.keys_down.remove(&key);
        }
    }

    /// Handle mouse button input
    pub fn handle_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.current.buttons_down.insert(button);
        } else {
            self.current.buttons_down.remove(&button);
        }
    }

    /// Handle an absolute cursor position, accumulating motion since the last one
    pub fn handle_mouse_move(&mut self, x: f64, y: f64) {
        let cursor = Vec2::new(x as f32, y as f32);
        if let Some(last) = self.last_cursor {
            self.current.mouse_delta += cursor - last;
        }
        self.last_cursor = Some(cursor);
    }

    /// Handle a scroll wheel step
    pub fn handle_scroll(&mut self, delta: f32) {
        self.current.scroll += delta;
    }

    /// Take the frame's snapshot and reset the per-frame quantities
    pub fn end_frame(&mut self) -> InputState {
        let snapshot = self.current.clone();
        self.current.mouse_delta = Vec2::zeros();
        self.current.scroll = 0.0;
        snapshot
    }
}
