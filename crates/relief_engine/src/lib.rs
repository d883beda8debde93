//! # Relief Engine
//!
//! A forward/deferred scene renderer with a multi-pass bloom post-process
//! and an editor-style orbit/fly camera.
//!
//! ## Features
//!
//! - **Multi-attachment geometry pass**: lit color, normals, positions,
//!   specular and bright-pass color in one HDR render target
//! - **Relief mapping**: parallax occlusion parameters per entity
//! - **Bloom**: separable Gaussian blur ping-ponged between two targets
//! - **Forward and deferred composition** with optional tone mapping
//! - **Shared uniform buffer**: per-frame globals and per-entity blocks
//!   written through an alignment-aware staging writer
//! - **Headless device**: the whole pipeline runs against a tracking
//!   test double
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relief_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let mut device = HeadlessDevice::new();
//!     let mut assets = AssetLibrary::new(&mut device, "assets")?;
//!     let mut programs = ProgramLibrary::new();
//!     // programs.load(&mut device, "MESH", MESH_SOURCE)?; ...
//!
//!     let mut scene = Scene::new();
//!     scene.add_light(Light::point(Vec3::new(0.0, 2.0, 0.0), Vec3::new(1.0, 1.0, 1.0)));
//!
//!     let mut pipeline = RenderPipeline::new(&mut device, &config, PipelinePrograms::default())?;
//!     pipeline.update(&mut device, &InputState::new(), 1.0 / 60.0, &mut scene)?;
//!     pipeline.render(&mut device, &scene, &mut assets, &programs)?;
//!
//!     pipeline.destroy(&mut device);
//!     programs.destroy(&mut device);
//!     assets.destroy(&mut device);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Shared configuration
pub mod core;

pub mod assets;
pub mod config;
pub mod foundation;
pub mod input;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, AssetLibrary, ModelId, TextureId},
        core::config::{ApplicationConfig, Config},
        foundation::{
            math::{Mat4, Vec3},
            time::FrameTimer,
        },
        input::{InputManager, InputState, KeyCode, MouseButton},
        render::{
            backends::HeadlessDevice, EditorCamera, GraphicsDevice, PipelinePrograms, ProgramLibrary,
            RenderError, RenderPipeline, RenderSettings, RenderTargetView, ShadingMode,
        },
        scene::{Entity, Light, LightType, ReliefParams, Scene},
    };
}
