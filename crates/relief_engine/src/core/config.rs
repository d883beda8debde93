//! # Unified Configuration System
//!
//! All configuration structures of the engine in one place. Every type has
//! defaults matching the stock editor scene, can be loaded from TOML or RON
//! through the [`Config`] trait, and is checked by `validate()` before use.
//!
//! ## Configuration Categories
//!
//! - **Window Config**: Presentation size and title
//! - **Camera Config**: Projection and editor camera controls
//! - **Bloom Config**: Blur iteration count and bright-pass range
//! - **Renderer Config**: Shading mode, displayed attachment, exposure
//! - **Run Config**: Frame count and time step of headless runs

use serde::{Serialize, Deserialize};

use crate::foundation::math::Vec3;
use crate::render::{RenderTargetView, ShadingMode};

pub use crate::config::{Config, ConfigError};

/// Bloom iterations allowed while limits are enforced
pub const BLOOM_ITERATION_LIMIT: u32 = 20;

/// Bloom iterations allowed once limits are surpassed
pub const BLOOM_ITERATION_MAX: u32 = 1000;

/// # Window Configuration
///
/// Size of the presentation target and the window title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Window title
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Relief Engine".to_string(),
        }
    }
}

impl WindowConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// # Camera Configuration
///
/// Projection parameters and the editor camera's control speeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clip plane distance
    pub near: f32,
    /// Far clip plane distance
    pub far: f32,
    /// Keyboard movement speed in units per second
    pub speed: f32,
    /// Scroll zoom speed in units per second
    pub zoom_speed: f32,
    /// Pointer sensitivity for orbit and look
    pub sensitivity: f32,
    /// Speed multiplier while sprinting
    pub sprint_multiplier: f32,
    /// Initial camera position
    pub position: Vec3,
    /// Point the orbit mode rotates around
    pub orbit_target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 80.0,
            near: 0.1,
            far: 100.0,
            speed: 10.0,
            zoom_speed: 40.0,
            sensitivity: 1.0,
            sprint_multiplier: 3.0,
            position: Vec3::new(0.0, 0.0, 5.0),
            orbit_target: Vec3::zeros(),
        }
    }
}

impl CameraConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.near <= 0.0 {
            return Err(ConfigError::Invalid(format!("near plane must be positive, got {}", self.near)));
        }
        if self.far <= self.near {
            return Err(ConfigError::Invalid(format!(
                "far plane {} must lie beyond near plane {}",
                self.far, self.near
            )));
        }
        if !(1.0..180.0).contains(&self.fov_degrees) {
            return Err(ConfigError::Invalid(format!(
                "field of view must be within 1..180 degrees, got {}",
                self.fov_degrees
            )));
        }
        if self.position == self.orbit_target {
            return Err(ConfigError::Invalid("camera cannot start on its orbit target".to_string()));
        }
        Ok(())
    }
}

/// # Bloom Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    /// Number of alternating blur passes
    pub iterations: u32,
    /// Brightness threshold scale used by the geometry shaders
    pub range: f32,
    /// Allow up to [`BLOOM_ITERATION_MAX`] iterations instead of [`BLOOM_ITERATION_LIMIT`]
    pub surpass_limits: bool,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            range: 1.0,
            surpass_limits: false,
        }
    }
}

impl BloomConfig {
    /// Largest iteration count currently permitted
    pub fn iteration_limit(&self) -> u32 {
        if self.surpass_limits {
            BLOOM_ITERATION_MAX
        } else {
            BLOOM_ITERATION_LIMIT
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations > self.iteration_limit() {
            return Err(ConfigError::Invalid(format!(
                "{} bloom iterations exceed the limit of {}",
                self.iterations,
                self.iteration_limit()
            )));
        }
        if !(0.0..=100.0).contains(&self.range) {
            return Err(ConfigError::Invalid(format!("bloom range must be within 0..=100, got {}", self.range)));
        }
        Ok(())
    }
}

/// # Renderer Configuration
///
/// Initial state of the render settings the editor exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Forward or deferred composition
    pub shading_mode: ShadingMode,
    /// Attachment shown by forward composition
    pub render_target: RenderTargetView,
    /// Exposure used by the tone mapping
    pub exposure_level: f32,
    /// Whether tone mapping is applied
    pub exposure_active: bool,
    /// Whether light indicator meshes are drawn
    pub debug_lights: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shading_mode: ShadingMode::Forward,
            render_target: RenderTargetView::Albedo,
            exposure_level: 1.0,
            exposure_active: false,
            debug_lights: true,
        }
    }
}

impl RendererConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.exposure_level) {
            return Err(ConfigError::Invalid(format!(
                "exposure level must be within 0..=100, got {}",
                self.exposure_level
            )));
        }
        Ok(())
    }
}

/// # Run Configuration
///
/// Drives a headless session: how many frames to render and the fixed
/// time step fed to the camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of frames to render
    pub frames: u32,
    /// Seconds per frame
    pub fixed_delta: f32,
    /// Directory model and texture paths are resolved against
    pub assets_dir: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: 240,
            fixed_delta: 1.0 / 60.0,
            assets_dir: "assets".to_string(),
        }
    }
}

impl RunConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fixed_delta <= 0.0 {
            return Err(ConfigError::Invalid(format!("time step must be positive, got {}", self.fixed_delta)));
        }
        Ok(())
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
/// This is the main configuration structure applications should use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Window configuration
    pub window: WindowConfig,
    /// Camera configuration
    pub camera: CameraConfig,
    /// Bloom configuration
    pub bloom: BloomConfig,
    /// Renderer configuration
    pub renderer: RendererConfig,
    /// Headless run configuration
    pub run: RunConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window.validate()?;
        self.camera.validate()?;
        self.bloom.validate()?;
        self.renderer.validate()?;
        self.run.validate()?;
        Ok(())
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ApplicationConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_clip_planes_are_rejected() {
        let camera = CameraConfig {
            near: 10.0,
            far: 1.0,
            ..CameraConfig::default()
        };

        assert!(matches!(camera.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_window_is_rejected() {
        let window = WindowConfig {
            width: 0,
            ..WindowConfig::default()
        };

        assert!(window.validate().is_err());
    }

    #[test]
    fn bloom_limit_depends_on_surpass_flag() {
        let mut bloom = BloomConfig {
            iterations: 50,
            ..BloomConfig::default()
        };
        assert!(bloom.validate().is_err());

        bloom.surpass_limits = true;
        assert!(bloom.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: ApplicationConfig = toml::from_str(
            r#"
            [window]
            width = 800
            height = 600

            [bloom]
            iterations = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.title, "Relief Engine");
        assert_eq!(config.bloom.iterations, 4);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn ron_round_trip_preserves_renderer_settings() {
        let mut config = ApplicationConfig::default();
        config.renderer.shading_mode = ShadingMode::Deferred;
        config.renderer.render_target = RenderTargetView::Normals;

        let text = ron::ser::to_string(&config).unwrap();
        let parsed: ApplicationConfig = ron::from_str(&text).unwrap();

        assert_eq!(parsed, config);
    }
}
