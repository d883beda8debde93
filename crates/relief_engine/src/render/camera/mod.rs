//! # Editor Camera
//!
//! A fly/orbit camera driven by polled input. Every frame the active
//! [`PointerMode`] handler runs first, then zoom and keyboard movement, and
//! finally the view matrix is rebuilt once with a look-at from the resulting
//! position and forward vector. The projection only changes through
//! [`EditorCamera::update_fov`] and [`EditorCamera::recalculate`].

pub mod modes;

pub use modes::PointerMode;

use crate::core::config::CameraConfig;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::input::InputState;

/// Position and orientation of the camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// World-space position
    pub position: Vec3,
    /// Unit view direction
    pub forward: Vec3,
    /// Up reference used by look-at and panning
    pub up: Vec3,
    /// Point orbiting rotates around
    pub orbit_target: Vec3,
}

/// Control speeds exposed by the editor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    /// Keyboard movement in units per second
    pub speed: f32,
    /// Scroll movement in units per second
    pub zoom_speed: f32,
    /// Pointer rotation scale
    pub sensitivity: f32,
    /// Speed factor while LeftShift is held
    pub sprint_multiplier: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            speed: 10.0,
            zoom_speed: 40.0,
            sensitivity: 1.0,
            sprint_multiplier: 3.0,
        }
    }
}

/// Input-driven view and projection
#[derive(Debug, Clone)]
pub struct EditorCamera {
    state: CameraState,
    settings: CameraSettings,
    fov_degrees: f32,
    near: f32,
    far: f32,
    aspect: f32,
    view: Mat4,
    projection: Mat4,
}

impl EditorCamera {
    /// Camera at (0, 0, 5) looking down -Z with an 80 degree field of view
    pub fn new(width: u32, height: u32, near: f32, far: f32) -> Self {
        let config = CameraConfig {
            near,
            far,
            ..CameraConfig::default()
        };
        Self::from_config(&config, width, height)
    }

    /// Camera configured from `config` for a `width` x `height` viewport
    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        let forward = (config.orbit_target - config.position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vec3::z());
        let state = CameraState {
            position: config.position,
            forward,
            up: Vec3::y(),
            orbit_target: config.orbit_target,
        };

        let mut camera = Self {
            state,
            settings: CameraSettings {
                speed: config.speed,
                zoom_speed: config.zoom_speed,
                sensitivity: config.sensitivity,
                sprint_multiplier: config.sprint_multiplier,
            },
            fov_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
            aspect: aspect_ratio(width, height),
            view: Mat4::identity(),
            projection: Mat4::identity(),
        };
        camera.rebuild_view();
        camera.rebuild_projection();
        camera
    }

    /// Apply one frame of input
    pub fn update(&mut self, input: &InputState, dt: f32) {
        let settings = &self.settings;
        let mode = PointerMode::from_input(input);

        let mut state = match mode {
            PointerMode::Orbit => modes::orbit(self.state, input, dt, settings),
            PointerMode::Pan => modes::pan(self.state, input, dt, settings),
            PointerMode::Look => modes::look(self.state, input, dt, settings),
            PointerMode::Idle => self.state,
        };
        state = modes::zoom(state, input, dt, settings);
        state = modes::keyboard(state, input, dt, settings);

        if state != self.state {
            log::trace!("Camera moved to {:?} facing {:?} ({:?})", state.position, state.forward, mode);
        }
        self.state = state;
        self.rebuild_view();
    }

    /// Change the vertical field of view
    pub fn update_fov(&mut self, fov_degrees: f32) {
        self.fov_degrees = fov_degrees;
        self.rebuild_projection();
    }

    /// Adapt the projection to a new viewport; non-positive sizes are ignored
    pub fn recalculate(&mut self, width: i32, height: i32) {
        let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
            return;
        };
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = aspect_ratio(width, height);
        self.rebuild_projection();
    }

    fn rebuild_view(&mut self) {
        let state = &self.state;
        self.view = Mat4::look_at(state.position, state.position + state.forward, state.up);
    }

    fn rebuild_projection(&mut self) {
        self.projection = Mat4::perspective(utils::deg_to_rad(self.fov_degrees), self.aspect, self.near, self.far);
    }

    /// World-to-view matrix
    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    /// View-to-clip matrix
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// World-to-clip matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// World-space position
    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    /// Unit view direction
    pub fn forward(&self) -> Vec3 {
        self.state.forward
    }

    /// Full camera state
    pub fn state(&self) -> &CameraState {
        &self.state
    }

    /// Vertical field of view in degrees
    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    /// Width over height of the viewport
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Control speeds
    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Set the keyboard speed
    pub fn set_speed(&mut self, speed: f32) {
        self.settings.speed = speed;
    }

    /// Set the scroll zoom speed
    pub fn set_zoom_speed(&mut self, speed: f32) {
        self.settings.zoom_speed = speed;
    }

    /// Set the pointer sensitivity
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.settings.sensitivity = sensitivity;
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KeyCode, MouseButton};
    use approx::assert_relative_eq;

    #[test]
    fn starts_looking_down_negative_z() {
        let camera = EditorCamera::new(1280, 720, 0.1, 100.0);

        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(camera.forward(), Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(camera.aspect(), 1280.0 / 720.0);
    }

    #[test]
    fn update_fov_changes_only_projection() {
        let mut camera = EditorCamera::new(800, 600, 0.1, 100.0);
        let view = *camera.view();
        let projection = *camera.projection();
        let position = camera.position();

        camera.update_fov(45.0);

        assert_eq!(*camera.view(), view);
        assert_eq!(camera.position(), position);
        assert_ne!(*camera.projection(), projection);
    }

    #[test]
    fn recalculate_ignores_degenerate_sizes() {
        let mut camera = EditorCamera::new(800, 600, 0.1, 100.0);
        let projection = *camera.projection();

        camera.recalculate(0, 600);
        camera.recalculate(800, -1);
        assert_eq!(*camera.projection(), projection);

        camera.recalculate(600, 600);
        assert_relative_eq!(camera.aspect(), 1.0);
        assert_ne!(*camera.projection(), projection);
    }

    #[test]
    fn zero_delta_orbit_leaves_camera_unchanged() {
        let mut camera = EditorCamera::new(800, 600, 0.1, 100.0);
        let view = *camera.view();
        let input = InputState::new()
            .with_key(KeyCode::LeftAlt)
            .with_button(MouseButton::Left);

        camera.update(&input, 0.016);

        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(camera.forward(), Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(*camera.view(), view);
    }

    #[test]
    fn update_rebuilds_view_from_movement() {
        let mut camera = EditorCamera::new(800, 600, 0.1, 100.0);

        camera.update(&InputState::new().with_key(KeyCode::W), 0.1);

        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, 4.0), epsilon = 1e-6);
        let eye = camera.view() * camera.position().push(1.0);
        assert_relative_eq!(eye.xyz(), Vec3::zeros(), epsilon = 1e-5);
    }

    #[test]
    fn setters_feed_the_handlers() {
        let mut camera = EditorCamera::new(800, 600, 0.1, 100.0);
        camera.set_speed(1.0);
        camera.set_zoom_speed(2.0);
        camera.set_sensitivity(0.5);

        assert_eq!(
            *camera.settings(),
            CameraSettings {
                speed: 1.0,
                zoom_speed: 2.0,
                sensitivity: 0.5,
                sprint_multiplier: 3.0,
            }
        );

        camera.update(&InputState::new().with_key(KeyCode::W), 1.0);
        assert_relative_eq!(camera.position().z, 4.0, epsilon = 1e-6);
    }
}
