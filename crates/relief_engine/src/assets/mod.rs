//! Asset management system
//!
//! The [`AssetLibrary`] owns every texture, material, mesh and model the
//! renderer draws. Resources are addressed by small index ids that stay
//! valid for the lifetime of the library. Loading failures are recoverable:
//! the loaders log a warning and return `None`, and callers fall back to the
//! placeholder textures created with the library or skip the resource.

pub mod image_loader;
pub mod material;
pub mod mesh;
pub mod obj_loader;
pub mod primitives;

pub use image_loader::ImageData;
pub use material::{Material, MaterialDesc};
pub use mesh::{Mesh, Submesh, VertexBufferLayout};
pub use obj_loader::{LoadedModel, ObjLoader};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::render::device::{GraphicsDevice, TextureHandle, VertexArrayHandle};
use crate::render::program::Program;
use crate::render::{RenderError, RenderResult};

/// Index of a texture in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// Index of a material in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub usize);

/// Index of a mesh in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub usize);

/// Index of a model in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub usize);

/// A texture resident on the device
#[derive(Debug, Clone)]
pub struct Texture {
    /// Device handle
    pub handle: TextureHandle,
    /// File the pixels came from, if any
    pub path: Option<PathBuf>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// A mesh together with one material per submesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    /// Shared geometry
    pub mesh: MeshId,
    /// Material of every submesh, in submesh order
    pub materials: Vec<MaterialId>,
}

/// 1x1 textures substituted for missing maps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholders {
    /// Opaque white, the neutral albedo
    pub white: TextureId,
    /// Opaque black, no emission or height
    pub black: TextureId,
    /// Tangent-space +Z, the neutral normal map
    pub flat_normal: TextureId,
    /// Magenta, marks textures that failed to resolve
    pub magenta: TextureId,
}

/// Everything needed to issue one submesh draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmeshDraw {
    /// Vertex array linked to the drawing program
    pub vertex_array: VertexArrayHandle,
    /// Number of indices
    pub index_count: u32,
    /// Byte offset into the index buffer
    pub index_offset: usize,
    /// Albedo map of the submesh material
    pub albedo: TextureHandle,
    /// Normal map of the submesh material
    pub normals: TextureHandle,
}

/// Asset errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Failed to load asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Invalid asset data
    #[error("Invalid asset data: {0}")]
    InvalidData(String),

    /// Unsupported asset format
    #[error("Unsupported asset format: {0}")]
    UnsupportedFormat(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Device rejected the upload
    #[error("Device error: {0}")]
    Render(#[from] RenderError),
}

/// Owner of every renderable resource
#[derive(Debug)]
pub struct AssetLibrary {
    root: PathBuf,
    textures: Vec<Texture>,
    texture_cache: HashMap<PathBuf, TextureId>,
    materials: Vec<Material>,
    meshes: Vec<Mesh>,
    models: Vec<Model>,
    model_cache: HashMap<PathBuf, ModelId>,
    placeholders: Placeholders,
}

impl AssetLibrary {
    /// Create a library resolving relative paths against `root`
    ///
    /// # Errors
    ///
    /// Fails when the device cannot create the placeholder textures.
    pub fn new(device: &mut impl GraphicsDevice, root: impl Into<PathBuf>) -> Result<Self, AssetError> {
        let mut textures = Vec::new();
        let mut placeholder = |color: [u8; 4]| -> Result<TextureId, AssetError> {
            let image = ImageData::solid_color(1, 1, color);
            let handle = device.create_texture(&image.texture_desc(), Some(&image.data))?;
            textures.push(Texture {
                handle,
                path: None,
                width: 1,
                height: 1,
            });
            Ok(TextureId(textures.len() - 1))
        };

        let placeholders = Placeholders {
            white: placeholder([255, 255, 255, 255])?,
            black: placeholder([0, 0, 0, 255])?,
            flat_normal: placeholder([128, 128, 255, 255])?,
            magenta: placeholder([255, 0, 255, 255])?,
        };

        let root = root.into();
        log::info!("Asset library rooted at {}", root.display());

        Ok(Self {
            root,
            textures,
            texture_cache: HashMap::new(),
            materials: Vec::new(),
            meshes: Vec::new(),
            models: Vec::new(),
            model_cache: HashMap::new(),
            placeholders,
        })
    }

    /// Directory relative paths are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fallback textures
    pub fn placeholders(&self) -> Placeholders {
        self.placeholders
    }

    /// Load a texture relative to the asset root
    ///
    /// Textures are cached by path, so loading the same file twice returns
    /// the same id. Returns `None` and logs a warning when the image cannot
    /// be decoded or uploaded.
    pub fn load_texture(&mut self, device: &mut impl GraphicsDevice, path: impl AsRef<Path>) -> Option<TextureId> {
        let full_path = self.root.join(path);
        self.load_texture_at(device, full_path)
    }

    fn load_texture_at(&mut self, device: &mut impl GraphicsDevice, path: PathBuf) -> Option<TextureId> {
        if let Some(id) = self.texture_cache.get(&path) {
            return Some(*id);
        }

        let result = ImageData::from_file(&path, true).and_then(|image| self.insert_texture(device, &image));
        match result {
            Ok(id) => {
                self.textures[id.0].path = Some(path.clone());
                self.texture_cache.insert(path, id);
                Some(id)
            }
            Err(e) => {
                log::warn!("Could not load texture {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Upload decoded pixels as a new texture
    ///
    /// # Errors
    ///
    /// Returns the device error when the upload is rejected.
    pub fn insert_texture(&mut self, device: &mut impl GraphicsDevice, image: &ImageData) -> Result<TextureId, AssetError> {
        let handle = device.create_texture(&image.texture_desc(), Some(&image.data))?;
        self.textures.push(Texture {
            handle,
            path: None,
            width: image.width,
            height: image.height,
        });
        Ok(TextureId(self.textures.len() - 1))
    }

    /// Texture by id
    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0)
    }

    /// Device handle of a texture, magenta when the id is unknown
    pub fn texture_handle(&self, id: TextureId) -> TextureHandle {
        self.textures
            .get(id.0)
            .or_else(|| self.textures.get(self.placeholders.magenta.0))
            .map_or(TextureHandle(0), |texture| texture.handle)
    }

    /// Number of textures including the placeholders
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Load a model relative to the asset root
    ///
    /// Models are cached by path. Returns `None` and logs a warning when the
    /// file cannot be imported.
    pub fn load_model(&mut self, device: &mut impl GraphicsDevice, path: impl AsRef<Path>) -> Option<ModelId> {
        let full_path = self.root.join(path);
        if let Some(id) = self.model_cache.get(&full_path) {
            return Some(*id);
        }

        match self.import_model(device, &full_path) {
            Ok(id) => {
                self.model_cache.insert(full_path, id);
                Some(id)
            }
            Err(e) => {
                log::warn!("Could not load model {}: {}", full_path.display(), e);
                None
            }
        }
    }

    #[cfg(feature = "obj")]
    fn import_model(&mut self, device: &mut impl GraphicsDevice, path: &Path) -> Result<ModelId, AssetError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("obj") => {
                let loaded = ObjLoader::load_obj(path)?;
                self.add_model(device, loaded)
            }
            _ => Err(AssetError::UnsupportedFormat(path.display().to_string())),
        }
    }

    #[cfg(not(feature = "obj"))]
    fn import_model(&mut self, _device: &mut impl GraphicsDevice, path: &Path) -> Result<ModelId, AssetError> {
        Err(AssetError::UnsupportedFormat(format!(
            "{} (model import is disabled)",
            path.display()
        )))
    }

    /// Register a model built in memory
    ///
    /// Material texture paths are loaded through the texture cache, with
    /// placeholders standing in for maps that are absent or fail to load.
    ///
    /// # Errors
    ///
    /// Fails when the geometry cannot be uploaded or a submesh references a
    /// material that does not exist.
    pub fn add_model(&mut self, device: &mut impl GraphicsDevice, loaded: LoadedModel) -> Result<ModelId, AssetError> {
        let LoadedModel {
            mut mesh,
            materials,
            submesh_materials,
        } = loaded;

        if submesh_materials.len() != mesh.submeshes().len() {
            return Err(AssetError::InvalidData(format!(
                "{} submeshes but {} material assignments",
                mesh.submeshes().len(),
                submesh_materials.len()
            )));
        }
        if let Some(bad) = submesh_materials.iter().find(|index| **index >= materials.len()) {
            return Err(AssetError::InvalidData(format!("material {bad} does not exist")));
        }

        mesh.upload(device)?;

        let base = self.materials.len();
        for desc in materials {
            let material = self.resolve_material(device, desc);
            self.materials.push(material);
        }

        self.meshes.push(mesh);
        self.models.push(Model {
            mesh: MeshId(self.meshes.len() - 1),
            materials: submesh_materials
                .into_iter()
                .map(|index| MaterialId(base + index))
                .collect(),
        });

        Ok(ModelId(self.models.len() - 1))
    }

    fn resolve_material(&mut self, device: &mut impl GraphicsDevice, desc: MaterialDesc) -> Material {
        let placeholders = self.placeholders;
        let mut resolve = |path: Option<PathBuf>, fallback: TextureId| {
            path.and_then(|path| self.load_texture_at(device, path))
                .unwrap_or(fallback)
        };

        Material {
            albedo_texture: resolve(desc.albedo_map, placeholders.white),
            emissive_texture: resolve(desc.emissive_map, placeholders.black),
            specular_texture: resolve(desc.specular_map, placeholders.black),
            normal_texture: resolve(desc.normal_map, placeholders.flat_normal),
            bump_texture: resolve(desc.bump_map, placeholders.black),
            name: desc.name,
            albedo: desc.albedo,
            emissive: desc.emissive,
            smoothness: desc.smoothness,
        }
    }

    /// Model by id
    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.get(id.0)
    }

    /// Mesh by id
    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    /// Material by id
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    /// Number of models
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Number of submeshes of a model
    pub fn submesh_count(&self, id: ModelId) -> usize {
        self.model(id).map_or(0, |model| model.materials.len())
    }

    /// Vertex array linking a model's submesh to `program`
    ///
    /// # Errors
    ///
    /// See [`Mesh::find_vao`].
    pub fn find_vao(
        &mut self,
        device: &mut impl GraphicsDevice,
        model: ModelId,
        submesh: usize,
        program: &Program,
    ) -> RenderResult<VertexArrayHandle> {
        let mesh_id = self
            .models
            .get(model.0)
            .map(|model| model.mesh)
            .ok_or_else(|| RenderError::BackendError(format!("model {} does not exist", model.0)))?;
        let mesh = self
            .meshes
            .get_mut(mesh_id.0)
            .ok_or_else(|| RenderError::BackendError(format!("mesh {} does not exist", mesh_id.0)))?;
        mesh.find_vao(device, submesh, program)
    }

    /// Vertex array, index range and material maps of a submesh
    ///
    /// # Errors
    ///
    /// See [`Mesh::find_vao`].
    pub fn submesh_draw(
        &mut self,
        device: &mut impl GraphicsDevice,
        model: ModelId,
        submesh: usize,
        program: &Program,
    ) -> RenderResult<SubmeshDraw> {
        let vertex_array = self.find_vao(device, model, submesh, program)?;

        let entry = &self.models[model.0];
        let geometry = &self.meshes[entry.mesh.0].submeshes()[submesh];
        let material = entry.materials.get(submesh).and_then(|id| self.material(*id));
        let (albedo, normals) = material.map_or(
            (self.placeholders.white, self.placeholders.flat_normal),
            |material| (material.albedo_texture, material.normal_texture),
        );

        Ok(SubmeshDraw {
            vertex_array,
            index_count: geometry.index_count(),
            index_offset: geometry.index_offset(),
            albedo: self.texture_handle(albedo),
            normals: self.texture_handle(normals),
        })
    }

    /// Release every device object owned by the library
    pub fn destroy(&mut self, device: &mut impl GraphicsDevice) {
        for mesh in &mut self.meshes {
            mesh.destroy(device);
        }
        for texture in self.textures.drain(..) {
            device.destroy_texture(texture.handle);
        }
        self.meshes.clear();
        self.models.clear();
        self.materials.clear();
        self.texture_cache.clear();
        self.model_cache.clear();
        log::debug!("Asset library released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::HeadlessDevice;

    fn quad_model() -> LoadedModel {
        LoadedModel {
            mesh: Mesh::new(vec![primitives::plane()]),
            materials: vec![MaterialDesc {
                albedo_map: Some(PathBuf::from("missing/albedo.png")),
                ..MaterialDesc::default()
            }],
            submesh_materials: vec![0],
        }
    }

    #[test]
    fn placeholders_are_created_up_front() {
        let mut device = HeadlessDevice::new();
        let library = AssetLibrary::new(&mut device, "assets").unwrap();

        assert_eq!(library.texture_count(), 4);
        assert_eq!(device.live_texture_count(), 4);
        assert_ne!(library.placeholders().white, library.placeholders().black);
    }

    #[test]
    fn missing_texture_yields_none() {
        let mut device = HeadlessDevice::new();
        let mut library = AssetLibrary::new(&mut device, "assets").unwrap();

        assert!(library.load_texture(&mut device, "nope.png").is_none());
        assert_eq!(library.texture_count(), 4);
    }

    #[test]
    fn missing_model_yields_none() {
        let mut device = HeadlessDevice::new();
        let mut library = AssetLibrary::new(&mut device, "assets").unwrap();

        assert!(library.load_model(&mut device, "Patrick/Patrick.obj").is_none());
        assert!(library.load_model(&mut device, "Relief/plane.fbx").is_none());
        assert_eq!(library.model_count(), 0);
    }

    #[test]
    fn added_model_falls_back_to_placeholder_maps() {
        let mut device = HeadlessDevice::new();
        let mut library = AssetLibrary::new(&mut device, "assets").unwrap();

        let id = library.add_model(&mut device, quad_model()).unwrap();
        let model = library.model(id).unwrap().clone();
        let material = library.material(model.materials[0]).unwrap();

        assert_eq!(material.albedo_texture, library.placeholders().white);
        assert_eq!(material.normal_texture, library.placeholders().flat_normal);
        assert_eq!(library.submesh_count(id), 1);
    }

    #[test]
    fn out_of_range_material_is_rejected() {
        let mut device = HeadlessDevice::new();
        let mut library = AssetLibrary::new(&mut device, "assets").unwrap();
        let mut loaded = quad_model();
        loaded.submesh_materials = vec![3];

        assert!(matches!(library.add_model(&mut device, loaded), Err(AssetError::InvalidData(_))));
    }

    #[test]
    fn submesh_draw_reports_index_range() {
        let mut device = HeadlessDevice::new();
        let mut library = AssetLibrary::new(&mut device, "assets").unwrap();
        let id = library.add_model(&mut device, quad_model()).unwrap();

        let handle = device
            .create_program("MESH", "layout(location = 0) in vec3 aPosition;", "void main() {}")
            .unwrap();
        let program = Program::new("MESH", handle, device.program_inputs(handle));
        let draw = library.submesh_draw(&mut device, id, 0, &program).unwrap();

        assert_eq!(draw.index_count, 6);
        assert_eq!(draw.index_offset, 0);
        assert_eq!(draw.albedo, library.texture_handle(library.placeholders().white));
    }

    #[test]
    fn destroy_releases_everything() {
        let mut device = HeadlessDevice::new();
        let mut library = AssetLibrary::new(&mut device, "assets").unwrap();
        library.add_model(&mut device, quad_model()).unwrap();

        library.destroy(&mut device);

        assert_eq!(device.live_object_count(), 0);
    }
}
