//! Camera interaction modes
//!
//! Each handler maps the camera state and one frame of input to a new
//! state. They never look at modifier keys to decide whether they apply;
//! [`PointerMode::from_input`] makes that decision once per frame.

use crate::foundation::math::{Quat, Vec2, Vec3};
use crate::input::{InputState, KeyCode, MouseButton};

use super::{CameraSettings, CameraState};

/// Largest |cos| allowed between forward and up before a rotation is rejected
const MAX_UP_ALIGNMENT: f32 = 0.999;

/// What the pointer currently drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerMode {
    /// Pointer motion is ignored
    Idle,
    /// LeftAlt + left button: rotate around the orbit target
    Orbit,
    /// LeftCtrl + left button: slide along the view plane
    Pan,
    /// Right button: turn the view direction in place
    Look,
}

impl PointerMode {
    /// Mode selected by the held keys and buttons, orbit winning over pan
    /// winning over look
    pub fn from_input(input: &InputState) -> Self {
        let left = input.is_button_down(MouseButton::Left);
        if left && input.is_key_down(KeyCode::LeftAlt) {
            Self::Orbit
        } else if left && input.is_key_down(KeyCode::LeftCtrl) {
            Self::Pan
        } else if input.is_button_down(MouseButton::Right) {
            Self::Look
        } else {
            Self::Idle
        }
    }
}

fn sprint(input: &InputState, settings: &CameraSettings) -> f32 {
    if input.is_key_down(KeyCode::LeftShift) {
        settings.sprint_multiplier
    } else {
        1.0
    }
}

fn right(state: &CameraState) -> Vec3 {
    state.forward.cross(&state.up).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::x)
}

fn keeps_up_usable(forward: &Vec3, up: &Vec3) -> bool {
    forward.dot(up).abs() < MAX_UP_ALIGNMENT
}

/// Rotate the camera around its orbit target
///
/// Yaw turns about world Y, pitch about world X. The pitch direction is
/// flipped once the camera is behind the target (negative z offset) so
/// dragging up always tilts the view the same way on screen.
pub fn orbit(state: CameraState, input: &InputState, dt: f32, settings: &CameraSettings) -> CameraState {
    let delta = input.mouse_delta();
    let offset = state.position - state.orbit_target;
    if delta == Vec2::zeros() || offset.norm() <= f32::EPSILON {
        return state;
    }

    let yaw = -delta.x * settings.sensitivity * dt;
    let mut pitch = -delta.y * settings.sensitivity * dt;
    if offset.z < 0.0 {
        pitch = -pitch;
    }

    let rotation = Quat::from_axis_angle(&Vec3::y_axis(), yaw) * Quat::from_axis_angle(&Vec3::x_axis(), pitch);
    let position = state.orbit_target + rotation * offset;
    let forward = (state.orbit_target - position).normalize();
    if !keeps_up_usable(&forward, &state.up) {
        return state;
    }

    CameraState {
        position,
        forward,
        ..state
    }
}

/// Slide the camera along its right and up axes
pub fn pan(state: CameraState, input: &InputState, dt: f32, _settings: &CameraSettings) -> CameraState {
    let delta = input.mouse_delta();
    if delta == Vec2::zeros() {
        return state;
    }

    let up = state.up.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);
    CameraState {
        position: state.position + right(&state) * (delta.x * dt) + up * (delta.y * dt),
        ..state
    }
}

/// Turn the view direction in place
pub fn look(state: CameraState, input: &InputState, dt: f32, settings: &CameraSettings) -> CameraState {
    let delta = input.mouse_delta();
    if delta == Vec2::zeros() {
        return state;
    }

    let rotation = Quat::from_euler_angles(
        -delta.y * settings.sensitivity * dt,
        -delta.x * settings.sensitivity * dt,
        0.0,
    );
    let forward = (rotation * state.forward).normalize();
    if !keeps_up_usable(&forward, &state.up) {
        return state;
    }

    CameraState { forward, ..state }
}

/// Move along the view direction by the scroll signal
pub fn zoom(state: CameraState, input: &InputState, dt: f32, settings: &CameraSettings) -> CameraState {
    let scroll = input.scroll();
    if scroll == 0.0 {
        return state;
    }

    CameraState {
        position: state.position + state.forward * (scroll * settings.zoom_speed * sprint(input, settings) * dt),
        ..state
    }
}

/// Fly with WASD, rise and sink with E and Q
pub fn keyboard(state: CameraState, input: &InputState, dt: f32, settings: &CameraSettings) -> CameraState {
    let step = settings.speed * sprint(input, settings) * dt;
    let right = right(&state);

    let mut position = state.position;
    if input.is_key_down(KeyCode::W) {
        position += state.forward * step;
    }
    if input.is_key_down(KeyCode::S) {
        position -= state.forward * step;
    }
    if input.is_key_down(KeyCode::A) {
        position -= right * step;
    }
    if input.is_key_down(KeyCode::D) {
        position += right * step;
    }
    if input.is_key_down(KeyCode::E) {
        position += Vec3::y() * step;
    }
    if input.is_key_down(KeyCode::Q) {
        position -= Vec3::y() * step;
    }

    CameraState { position, ..state }
}
