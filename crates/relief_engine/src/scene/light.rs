//! Light records
//!
//! Lights are plain values: the editor overlay writes their fields directly
//! and the frame writer copies the enabled ones into the global parameter
//! block every frame.

use serde::{Deserialize, Serialize};

use crate::assets::ModelId;
use crate::foundation::math::{euler_transform, Mat4, Vec3};

/// Indicator scale of point lights, whose sphere mesh is modelled in
/// centimetres
const POINT_INDICATOR_SCALE: f32 = 0.002;

/// Kind of light source
///
/// The discriminant is the value the shaders read from the light block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightType {
    /// Parallel rays along `direction`
    Directional = 0,
    /// Omnidirectional emitter at `position`
    Point = 1,
}

impl LightType {
    /// Value written to the light block
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Name shown by the editor
    pub fn label(self) -> &'static str {
        match self {
            Self::Directional => "Directional",
            Self::Point => "Point",
        }
    }
}

/// A light source in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Directional or point
    pub light_type: LightType,
    /// Linear RGB color
    pub color: Vec3,
    /// Direction of the rays, also the indicator's Euler rotation
    pub direction: Vec3,
    /// World-space position of the indicator and of point lights
    pub position: Vec3,
    /// Per-channel intensity
    pub intensity: Vec3,
    /// Disabled lights are neither shaded nor drawn
    pub enabled: bool,
    /// Indicator mesh drawn by the light pass
    pub model: Option<ModelId>,
}

impl Light {
    /// Enabled light of unit intensity
    pub fn new(light_type: LightType, position: Vec3, direction: Vec3, color: Vec3) -> Self {
        Self {
            light_type,
            color,
            direction,
            position,
            intensity: Vec3::repeat(1.0),
            enabled: true,
            model: None,
        }
    }

    /// Directional light
    pub fn directional(position: Vec3, direction: Vec3, color: Vec3) -> Self {
        Self::new(LightType::Directional, position, direction, color)
    }

    /// Point light
    pub fn point(position: Vec3, color: Vec3) -> Self {
        Self::new(LightType::Point, position, Vec3::repeat(1.0), color)
    }

    /// Attach the indicator mesh
    pub fn with_model(mut self, model: Option<ModelId>) -> Self {
        self.model = model;
        self
    }

    /// Set every channel of the intensity to `intensity`
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.set_intensity(intensity);
        self
    }

    /// Set every channel of the intensity to `intensity`
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = Vec3::repeat(intensity);
    }

    /// Scale applied to the indicator mesh
    pub fn indicator_scale(&self) -> f32 {
        match self.light_type {
            LightType::Directional => 1.0,
            LightType::Point => POINT_INDICATOR_SCALE,
        }
    }

    /// Model matrix of the indicator mesh
    pub fn transform_matrix(&self) -> Mat4 {
        euler_transform(self.position, self.direction, Vec3::repeat(self.indicator_scale()))
    }
}
