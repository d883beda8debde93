//! Mesh geometry and vertex array caching
//!
//! A [`Mesh`] is a list of [`Submesh`]es whose interleaved float vertices and
//! `u32` indices are packed into one vertex buffer and one index buffer at
//! upload time. Each submesh remembers its byte offsets into those buffers.
//!
//! Vertex array objects depend on both the vertex layout and the inputs of
//! the program drawing them, so they are created lazily by
//! [`Mesh::find_vao`] and cached per (submesh, program) pair.

use crate::render::device::{
    BufferHandle, BufferKind, BufferUsage, GraphicsDevice, ProgramHandle, VertexArrayDesc,
    VertexArrayHandle, VertexAttribute,
};
use crate::render::program::Program;
use crate::render::{RenderError, RenderResult};

/// Shader location of vertex positions
pub const POSITION_LOCATION: u32 = 0;
/// Shader location of vertex normals
pub const NORMAL_LOCATION: u32 = 1;
/// Shader location of texture coordinates
pub const TEXCOORD_LOCATION: u32 = 2;
/// Shader location of tangents
pub const TANGENT_LOCATION: u32 = 3;
/// Shader location of bitangents
pub const BITANGENT_LOCATION: u32 = 4;

const FLOAT_SIZE: usize = std::mem::size_of::<f32>();

/// Interleaved float layout of a submesh's vertices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexBufferLayout {
    attributes: Vec<VertexAttribute>,
    stride: usize,
}

impl VertexBufferLayout {
    /// Empty layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute of `components` floats at the end of the vertex
    pub fn push(mut self, location: u32, components: u32) -> Self {
        self.attributes.push(VertexAttribute {
            location,
            components,
            offset: self.stride,
        });
        self.stride += components as usize * FLOAT_SIZE;
        self
    }

    /// Position and normal, plus texture coordinates and tangent space when present
    pub fn standard(has_texcoords: bool, has_tangent_space: bool) -> Self {
        let mut layout = Self::new()
            .push(POSITION_LOCATION, 3)
            .push(NORMAL_LOCATION, 3);
        if has_texcoords {
            layout = layout.push(TEXCOORD_LOCATION, 2);
        }
        if has_tangent_space {
            layout = layout.push(TANGENT_LOCATION, 3).push(BITANGENT_LOCATION, 3);
        }
        layout
    }

    /// Attributes in declaration order
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Bytes per vertex
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Floats per vertex
    pub fn floats_per_vertex(&self) -> usize {
        self.stride / FLOAT_SIZE
    }

    /// Attribute bound to a shader location
    pub fn attribute(&self, location: u32) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|attribute| attribute.location == location)
    }
}

/// One draw call's worth of geometry
#[derive(Debug, Clone)]
pub struct Submesh {
    layout: VertexBufferLayout,
    vertices: Vec<f32>,
    indices: Vec<u32>,
    vertex_offset: usize,
    index_offset: usize,
    vaos: Vec<(ProgramHandle, VertexArrayHandle)>,
}

impl Submesh {
    /// Create a submesh from interleaved vertices matching `layout`
    pub fn new(layout: VertexBufferLayout, vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            layout,
            vertices,
            indices,
            vertex_offset: 0,
            index_offset: 0,
            vaos: Vec::new(),
        }
    }

    /// Vertex layout
    pub fn layout(&self) -> &VertexBufferLayout {
        &self.layout
    }

    /// Interleaved vertex data
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Triangle indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of indices drawn
    pub fn index_count(&self) -> u32 {
        u32::try_from(self.indices.len()).unwrap_or(u32::MAX)
    }

    /// Byte offset of the first vertex in the mesh's vertex buffer
    pub fn vertex_offset(&self) -> usize {
        self.vertex_offset
    }

    /// Byte offset of the first index in the mesh's index buffer
    pub fn index_offset(&self) -> usize {
        self.index_offset
    }

    /// Multiply every vertex position by `factor`
    ///
    /// Only meaningful before the owning mesh is uploaded.
    pub fn scale_positions(&mut self, factor: f32) {
        let Some(position) = self.layout.attribute(POSITION_LOCATION).copied() else {
            return;
        };
        let first = position.offset / FLOAT_SIZE;
        let floats = self.layout.floats_per_vertex();
        if floats == 0 {
            return;
        }

        for vertex in self.vertices.chunks_exact_mut(floats) {
            for value in &mut vertex[first..first + position.components as usize] {
                *value *= factor;
            }
        }
    }
}

/// Geometry shared by every entity referencing the same model
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    submeshes: Vec<Submesh>,
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
}

impl Mesh {
    /// Create a mesh that is not yet uploaded
    pub fn new(submeshes: Vec<Submesh>) -> Self {
        Self {
            submeshes,
            vertex_buffer: None,
            index_buffer: None,
        }
    }

    /// Submeshes in draw order
    pub fn submeshes(&self) -> &[Submesh] {
        &self.submeshes
    }

    /// Whether the geometry lives in device buffers
    pub fn is_uploaded(&self) -> bool {
        self.vertex_buffer.is_some()
    }

    /// Pack every submesh into one vertex and one index buffer
    ///
    /// # Errors
    ///
    /// Returns the device's error when a buffer cannot be created.
    pub fn upload(&mut self, device: &mut impl GraphicsDevice) -> RenderResult<()> {
        let mut vertex_bytes: Vec<u8> = Vec::new();
        let mut index_bytes: Vec<u8> = Vec::new();

        for submesh in &mut self.submeshes {
            submesh.vertex_offset = vertex_bytes.len();
            vertex_bytes.extend_from_slice(bytemuck::cast_slice(&submesh.vertices));

            submesh.index_offset = index_bytes.len();
            index_bytes.extend_from_slice(bytemuck::cast_slice(&submesh.indices));
        }

        if vertex_bytes.is_empty() || index_bytes.is_empty() {
            return Err(RenderError::ResourceCreationFailed("mesh has no geometry".to_string()));
        }

        let vertex_buffer = device.create_buffer(
            BufferKind::Vertex,
            BufferUsage::Static,
            vertex_bytes.len(),
            Some(&vertex_bytes),
        )?;
        let index_buffer = match device.create_buffer(
            BufferKind::Index,
            BufferUsage::Static,
            index_bytes.len(),
            Some(&index_bytes),
        ) {
            Ok(buffer) => buffer,
            Err(err) => {
                device.destroy_buffer(vertex_buffer);
                return Err(err);
            }
        };

        self.vertex_buffer = Some(vertex_buffer);
        self.index_buffer = Some(index_buffer);
        log::debug!(
            "Uploaded mesh with {} submeshes ({} vertex bytes, {} index bytes)",
            self.submeshes.len(),
            vertex_bytes.len(),
            index_bytes.len()
        );
        Ok(())
    }

    /// Vertex array binding `submesh_index` to the inputs of `program`
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnlinkedAttribute`] when the program reads a
    /// location the submesh layout lacks, and a backend error when the mesh
    /// was never uploaded or the index is out of range.
    pub fn find_vao(
        &mut self,
        device: &mut impl GraphicsDevice,
        submesh_index: usize,
        program: &Program,
    ) -> RenderResult<VertexArrayHandle> {
        let (Some(vertex_buffer), index_buffer) = (self.vertex_buffer, self.index_buffer) else {
            return Err(RenderError::BackendError("mesh drawn before upload".to_string()));
        };
        let submesh = self.submeshes.get_mut(submesh_index).ok_or_else(|| {
            RenderError::BackendError(format!("submesh {submesh_index} does not exist"))
        })?;

        if let Some((_, vao)) = submesh.vaos.iter().find(|(owner, _)| *owner == program.handle()) {
            return Ok(*vao);
        }

        let mut attributes = Vec::with_capacity(program.vertex_inputs().len());
        for input in program.vertex_inputs() {
            let attribute = submesh.layout.attribute(input.location).ok_or_else(|| {
                RenderError::UnlinkedAttribute {
                    program: program.name().to_string(),
                    location: input.location,
                }
            })?;
            attributes.push(VertexAttribute {
                offset: attribute.offset + submesh.vertex_offset,
                ..*attribute
            });
        }

        let vao = device.create_vertex_array(&VertexArrayDesc {
            vertex_buffer,
            index_buffer,
            stride: submesh.layout.stride,
            attributes,
        })?;
        submesh.vaos.push((program.handle(), vao));
        Ok(vao)
    }

    /// Release the buffers and every cached vertex array
    pub fn destroy(&mut self, device: &mut impl GraphicsDevice) {
        for submesh in &mut self.submeshes {
            for (_, vao) in submesh.vaos.drain(..) {
                device.destroy_vertex_array(vao);
            }
        }
        if let Some(buffer) = self.vertex_buffer.take() {
            device.destroy_buffer(buffer);
        }
        if let Some(buffer) = self.index_buffer.take() {
            device.destroy_buffer(buffer);
        }
    }
}
