//! The stock editor scene
//!
//! Two directional lights, nine colored point lights, two Patrick statues,
//! a Barbaro bust and two relief-mapped walls. Model and texture paths are
//! relative to the asset directory. Models that cannot be loaded are left
//! out; the relief plane and the point-light sphere fall back to built-in
//! geometry and missing relief maps to the neutral placeholders.

use relief_engine::assets::{primitives, AssetLibrary, LoadedModel, ModelId, Submesh, TextureId};
use relief_engine::foundation::math::Vec3;
use relief_engine::render::GraphicsDevice;
use relief_engine::scene::{Entity, Light, ReliefParams, Scene};

const DIRECTIONAL_INDICATOR: &str = "Primitives/planeDirectionalLight.obj";
const POINT_INDICATOR: &str = "Primitives/sphere.fbx";
const RELIEF_PLANE: &str = "Relief/plane.fbx";
const PATRICK: &str = "Patrick/Patrick.obj";
const BARBARO: &str = "Barbaro/barbaraso.obj";

/// Albedo, normal and height map paths of a relief material
struct ReliefMaps {
    albedo: &'static str,
    normal: &'static str,
    height: &'static str,
}

const BRICKS: ReliefMaps = ReliefMaps {
    albedo: "Relief/bricks2.jpg",
    normal: "Relief/bricks2_normal.jpg",
    height: "Relief/bricks2_disp.jpg",
};

const WALL: ReliefMaps = ReliefMaps {
    albedo: "Relief/Wall2/WallAlbedo.jpg",
    normal: "Relief/Wall2/WallNormal.jpg",
    height: "Relief/Wall2/WallHeight.png",
};

/// (position, color, intensity)
const POINT_LIGHTS: [([f32; 3], [f32; 3], f32); 9] = [
    ([0.5, 5.3, 3.7], [0.0, 1.0, 0.0], 3.7),
    ([9.0, 0.0, 2.0], [0.0, 0.0, 1.0], 1.0),
    ([-9.0, 0.0, 2.0], [1.0, 0.0, 0.0], 1.0),
    ([-29.5, 4.0, -4.8], [1.0, 0.0, 0.0], 5.0),
    ([25.0, 4.0, -5.5], [1.0, 1.0, 0.0], 10.0),
    ([1.8, 5.9, -2.1], [0.1, 0.65, 0.65], 3.8),
    ([6.4, 4.0, -3.0], [0.5, 0.5, 0.0], 1.0),
    ([-2.8, 0.0, 2.0], [1.0, 0.0, 0.75], 1.0),
    ([2.8, 0.0, 2.0], [0.0, 0.2, 1.0], 1.0),
];

fn vec3(v: [f32; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

/// Load `path`, or register `fallback` when the file is unavailable
fn model_or_builtin(
    assets: &mut AssetLibrary,
    device: &mut impl GraphicsDevice,
    path: &str,
    fallback: fn() -> Submesh,
) -> Option<ModelId> {
    if let Some(id) = assets.load_model(device, path) {
        return Some(id);
    }
    log::info!("Using built-in geometry for {}", path);
    match assets.add_model(device, LoadedModel::from_submeshes(vec![fallback()])) {
        Ok(id) => Some(id),
        Err(e) => {
            log::warn!("Built-in geometry for {} failed: {}", path, e);
            None
        }
    }
}

fn relief_params(
    assets: &mut AssetLibrary,
    device: &mut impl GraphicsDevice,
    maps: &ReliefMaps,
    bumpiness: f32,
) -> ReliefParams {
    let placeholders = assets.placeholders();
    let mut texture = |path: &str, fallback: TextureId| assets.load_texture(device, path).unwrap_or(fallback);

    ReliefParams {
        texture: texture(maps.albedo, placeholders.white),
        normal_map: texture(maps.normal, placeholders.flat_normal),
        depth_map: texture(maps.height, placeholders.black),
        bumpiness,
        min_layers: 8.0,
        max_layers: 32.0,
    }
}

fn point_sphere() -> Submesh {
    // Radius matches the centimetre-scale sphere the indicator scale expects
    let mut sphere = primitives::sphere(16, 12);
    sphere.scale_positions(50.0);
    sphere
}

/// Build the stock scene
pub fn build(assets: &mut AssetLibrary, device: &mut impl GraphicsDevice) -> Scene {
    let mut scene = Scene::new();

    // Lights
    let directional = assets.load_model(device, DIRECTIONAL_INDICATOR);
    scene.add_light(
        Light::directional(Vec3::new(-10.0, 5.0, 0.0), Vec3::new(-1.0, 1.0, 1.0), Vec3::repeat(0.65))
            .with_model(directional),
    );
    scene.add_light(
        Light::directional(Vec3::new(10.0, 5.0, 0.0), Vec3::new(1.0, 1.0, 1.0), Vec3::new(0.1, 0.65, 0.65))
            .with_model(directional),
    );

    let sphere = model_or_builtin(assets, device, POINT_INDICATOR, point_sphere);
    for (position, color, intensity) in POINT_LIGHTS {
        scene.add_light(
            Light::point(vec3(position), vec3(color))
                .with_intensity(intensity)
                .with_model(sphere),
        );
    }

    // Entities
    match assets.load_model(device, PATRICK) {
        Some(patrick) => {
            scene.add_entity(Entity::new(patrick, Vec3::new(9.0, 0.0, 0.0)));
            scene.add_entity(Entity::new(patrick, Vec3::new(-9.0, 0.0, 0.0)));
        }
        None => log::warn!("Skipping the Patrick statues"),
    }

    if let Some(plane) = model_or_builtin(assets, device, RELIEF_PLANE, primitives::plane) {
        let bricks = relief_params(assets, device, &BRICKS, 0.2);
        scene.add_entity(
            Entity::new(plane, Vec3::new(-30.3, 6.0, -10.0))
                .with_scale(Vec3::new(20.0, 20.0, 1.0))
                .with_relief(bricks),
        );

        let wall = relief_params(assets, device, &WALL, -0.2);
        scene.add_entity(
            Entity::new(plane, Vec3::new(23.9, 6.0, -10.0))
                .with_scale(Vec3::new(20.0, 20.0, 1.0))
                .with_relief(wall),
        );
    }

    match assets.load_model(device, BARBARO) {
        Some(barbaro) => {
            scene.add_entity(Entity::new(barbaro, Vec3::new(0.2, -2.8, 0.8)).with_scale(Vec3::repeat(4.0)));
        }
        None => log::warn!("Skipping the Barbaro bust"),
    }

    log::info!(
        "Demo scene: {} entities, {} lights, {} models, {} textures",
        scene.entities.len(),
        scene.lights.len(),
        assets.model_count(),
        assets.texture_count()
    );
    scene
}
