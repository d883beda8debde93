//! Entity records

use crate::assets::{ModelId, TextureId};
use crate::foundation::math::{euler_transform, utils, Mat4, Vec3};
use crate::render::staging::FrameRegion;

/// Parallax occlusion parameters of a relief-mapped entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReliefParams {
    /// Albedo map
    pub texture: TextureId,
    /// Tangent-space normal map
    pub normal_map: TextureId,
    /// Height map
    pub depth_map: TextureId,
    /// Height scale; negative values extrude instead of carving
    pub bumpiness: f32,
    /// Ray-march layers when viewed head-on
    pub min_layers: f32,
    /// Ray-march layers at grazing angles
    pub max_layers: f32,
}

/// A model placed in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// World-space translation
    pub position: Vec3,
    /// Euler rotation in radians
    pub rotation: Vec3,
    /// Per-axis scale
    pub scale: Vec3,
    /// Drawn geometry
    pub model: ModelId,
    /// Drawn through the relief program when set
    pub relief: Option<ReliefParams>,
    /// Per-draw parameter block written this frame
    pub local_params: FrameRegion,
}

impl Entity {
    /// Unrotated, unit-scale entity at `position`
    pub fn new(model: ModelId, position: Vec3) -> Self {
        Self {
            position,
            rotation: Vec3::zeros(),
            scale: Vec3::repeat(1.0),
            model,
            relief: None,
            local_params: FrameRegion::default(),
        }
    }

    /// Set the per-axis scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Set the rotation in radians
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Draw through the relief program
    pub fn with_relief(mut self, relief: ReliefParams) -> Self {
        self.relief = Some(relief);
        self
    }

    /// Whether the relief program draws this entity
    pub fn is_relief(&self) -> bool {
        self.relief.is_some()
    }

    /// Rotation in degrees, as the editor shows it
    pub fn rotation_degrees(&self) -> Vec3 {
        self.rotation.map(utils::rad_to_deg)
    }

    /// Set the rotation from degrees
    pub fn set_rotation_degrees(&mut self, degrees: Vec3) {
        self.rotation = degrees.map(utils::deg_to_rad);
    }

    /// Model-to-world matrix
    pub fn transform_matrix(&self) -> Mat4 {
        euler_transform(self.position, self.rotation, self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use approx::assert_relative_eq;

    #[test]
    fn transform_scales_then_translates() {
        let entity = Entity::new(ModelId(0), Vec3::new(1.0, 2.0, 3.0)).with_scale(Vec3::new(2.0, 2.0, 2.0));

        let world = entity.transform_matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));

        assert_relative_eq!(world.coords, Vec3::new(3.0, 2.0, 3.0));
    }

    #[test]
    fn degree_round_trip() {
        let mut entity = Entity::new(ModelId(0), Vec3::zeros());
        entity.set_rotation_degrees(Vec3::new(90.0, 0.0, -45.0));

        assert_relative_eq!(entity.rotation.x, std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(entity.rotation_degrees(), Vec3::new(90.0, 0.0, -45.0), epsilon = 1e-4);
    }

    #[test]
    fn relief_flag_follows_params() {
        let plain = Entity::new(ModelId(1), Vec3::zeros());
        assert!(!plain.is_relief());

        let relief = plain.with_relief(ReliefParams {
            texture: TextureId(0),
            normal_map: TextureId(1),
            depth_map: TextureId(2),
            bumpiness: 0.2,
            min_layers: 8.0,
            max_layers: 32.0,
        });
        assert!(relief.is_relief());
        assert_eq!(relief.local_params, FrameRegion::default());
    }
}
