//! Scene contents
//!
//! A flat list of entities and a flat list of lights. There is no hierarchy:
//! each record carries its own world transform and references shared models
//! and textures in the [`AssetLibrary`](crate::assets::AssetLibrary) by id.

pub mod entity;
pub mod light;

pub use entity::{Entity, ReliefParams};
pub use light::{Light, LightType};

/// Everything the pipeline draws
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Drawn in insertion order
    pub entities: Vec<Entity>,
    /// Shaded and optionally drawn as indicators
    pub lights: Vec<Light>,
}

impl Scene {
    /// Empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity and return its index
    pub fn add_entity(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    /// Append a light and return its index
    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    /// Lights that contribute to shading
    pub fn enabled_lights(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter().filter(|light| light.enabled)
    }

    /// Number of lights that contribute to shading
    pub fn enabled_light_count(&self) -> usize {
        self.enabled_lights().count()
    }
}
