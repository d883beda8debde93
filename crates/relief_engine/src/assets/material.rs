//! Surface materials
//!
//! Importers describe materials with [`MaterialDesc`], which still refers to
//! textures by file path. The asset library resolves those paths into
//! [`Material`]s holding texture ids, substituting placeholder textures for
//! maps that are absent or fail to load.

use std::path::PathBuf;

use crate::assets::TextureId;
use crate::foundation::math::Vec3;

/// Material as read from a model file
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    /// Material name
    pub name: String,
    /// Diffuse color
    pub albedo: Vec3,
    /// Emitted color
    pub emissive: Vec3,
    /// Specular exponent mapped to 0..1
    pub smoothness: f32,
    /// Diffuse map
    pub albedo_map: Option<PathBuf>,
    /// Emission map
    pub emissive_map: Option<PathBuf>,
    /// Specular map
    pub specular_map: Option<PathBuf>,
    /// Tangent-space normal map
    pub normal_map: Option<PathBuf>,
    /// Height map
    pub bump_map: Option<PathBuf>,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            albedo: Vec3::new(1.0, 1.0, 1.0),
            emissive: Vec3::zeros(),
            smoothness: 0.0,
            albedo_map: None,
            emissive_map: None,
            specular_map: None,
            normal_map: None,
            bump_map: None,
        }
    }
}

impl MaterialDesc {
    /// Smoothness from a Phong specular exponent
    pub fn smoothness_from_shininess(shininess: f32) -> f32 {
        shininess / 256.0
    }
}

/// Material ready for drawing
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Material name
    pub name: String,
    /// Diffuse color
    pub albedo: Vec3,
    /// Emitted color
    pub emissive: Vec3,
    /// Specular exponent mapped to 0..1
    pub smoothness: f32,
    /// Diffuse map
    pub albedo_texture: TextureId,
    /// Emission map
    pub emissive_texture: TextureId,
    /// Specular map
    pub specular_texture: TextureId,
    /// Tangent-space normal map
    pub normal_texture: TextureId,
    /// Height map
    pub bump_texture: TextureId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn shininess_maps_onto_unit_range() {
        assert_relative_eq!(MaterialDesc::smoothness_from_shininess(128.0), 0.5);
        assert_relative_eq!(MaterialDesc::smoothness_from_shininess(0.0), 0.0);
    }

    #[test]
    fn default_material_is_white_and_unmapped() {
        let desc = MaterialDesc::default();

        assert_eq!(desc.albedo, Vec3::new(1.0, 1.0, 1.0));
        assert!(desc.albedo_map.is_none());
        assert!(desc.bump_map.is_none());
    }
}
