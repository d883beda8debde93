//! Scripted editor session
//!
//! The viewer has no window, so the interaction a user would perform is
//! replayed from a fixed timeline: orbit around the scene, look around, zoom,
//! fly with the keyboard, switch shading and debug views, then resize.

use relief_engine::input::{InputManager, KeyCode, MouseButton};
use relief_engine::render::{RenderPipeline, RenderResult, RenderTargetView};

/// One thing the user does
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Key(KeyCode, bool),
    Button(MouseButton, bool),
    Cursor(f64, f64),
    Scroll(f32),
    Shading(u32),
    View(RenderTargetView),
    BloomIterations(u32),
    DebugLights(bool),
    Resize(i32, i32),
}

/// (frame, action), ordered by frame
pub const TIMELINE: &[(u32, Action)] = &[
    // Alt + left drag orbits
    (10, Action::Key(KeyCode::LeftAlt, true)),
    (10, Action::Button(MouseButton::Left, true)),
    (10, Action::Cursor(400.0, 300.0)),
    (11, Action::Cursor(460.0, 300.0)),
    (12, Action::Cursor(520.0, 280.0)),
    (13, Action::Button(MouseButton::Left, false)),
    (13, Action::Key(KeyCode::LeftAlt, false)),
    // Right drag looks around
    (20, Action::Button(MouseButton::Right, true)),
    (21, Action::Cursor(500.0, 290.0)),
    (22, Action::Cursor(480.0, 300.0)),
    (23, Action::Button(MouseButton::Right, false)),
    (30, Action::Scroll(2.0)),
    (31, Action::Scroll(-1.0)),
    // Sprint forward, then strafe
    (40, Action::Key(KeyCode::LeftShift, true)),
    (40, Action::Key(KeyCode::W, true)),
    (55, Action::Key(KeyCode::W, false)),
    (55, Action::Key(KeyCode::LeftShift, false)),
    (56, Action::Key(KeyCode::D, true)),
    (62, Action::Key(KeyCode::D, false)),
    (70, Action::View(RenderTargetView::Normals)),
    (80, Action::View(RenderTargetView::Position)),
    (90, Action::View(RenderTargetView::Depth)),
    (100, Action::View(RenderTargetView::Specular)),
    (110, Action::View(RenderTargetView::Albedo)),
    (120, Action::Shading(1)),
    (130, Action::BloomIterations(12)),
    (140, Action::DebugLights(false)),
    (150, Action::Resize(1024, 768)),
    (160, Action::DebugLights(true)),
    (170, Action::Shading(0)),
];

/// Replays [`TIMELINE`] frame by frame
#[derive(Debug, Default)]
pub struct Script {
    next: usize,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions scheduled for `frame`
    pub fn due(&mut self, frame: u32) -> &'static [(u32, Action)] {
        let start = self.next;
        while self.next < TIMELINE.len() && TIMELINE[self.next].0 <= frame {
            self.next += 1;
        }
        &TIMELINE[start..self.next]
    }

    /// Feed the actions of `frame` to the input manager and the pipeline
    pub fn apply(&mut self, frame: u32, input: &mut InputManager, pipeline: &mut RenderPipeline) -> RenderResult<()> {
        for &(_, action) in self.due(frame) {
            log::debug!("Frame {}: {:?}", frame, action);
            match action {
                Action::Key(key, pressed) => input.handle_key_input(key, pressed),
                Action::Button(button, pressed) => input.handle_mouse_button(button, pressed),
                Action::Cursor(x, y) => input.handle_mouse_move(x, y),
                Action::Scroll(delta) => input.handle_scroll(delta),
                Action::Shading(index) => {
                    let mode = pipeline.settings_mut().select_shading_mode(index)?;
                    log::info!("Shading: {}", mode.label());
                }
                Action::View(view) => {
                    if pipeline.settings_mut().select_render_target(view) {
                        log::info!("Showing {}", view.label());
                    }
                }
                Action::BloomIterations(iterations) => pipeline.settings_mut().set_bloom_iterations(iterations),
                Action::DebugLights(visible) => pipeline.settings_mut().set_debug_lights(visible),
                Action::Resize(width, height) => pipeline.request_resize(width, height),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_is_ordered() {
        assert!(TIMELINE.windows(2).all(|pair| pair[0].0 <= pair[1].0));
    }

    #[test]
    fn each_action_is_due_once() {
        let mut script = Script::new();
        let mut seen = 0;
        for frame in 0..200 {
            seen += script.due(frame).len();
        }
        assert_eq!(seen, TIMELINE.len());
        assert!(script.due(500).is_empty());
    }

    #[test]
    fn skipped_frames_catch_up() {
        let mut script = Script::new();
        assert_eq!(script.due(11).len(), 4);
    }
}
