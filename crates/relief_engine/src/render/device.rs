//! Graphics device abstraction
//!
//! [`GraphicsDevice`] is the seam between the render pipeline and the
//! graphics API. It exposes the object model the pipeline is written
//! against: textures, framebuffers, buffers, programs and vertex arrays,
//! addressed by opaque non-zero handles, plus the small amount of global
//! state (bindings, depth test, blending) the passes toggle.
//!
//! Every call is issued from the render thread in submission order. A device
//! implementation must never hand out a handle value of zero; zero is the
//! "default framebuffer / nothing bound" value of the underlying APIs and the
//! pipeline relies on handles being distinguishable from it.

use std::fmt;
use std::ptr::NonNull;

use bitflags::bitflags;

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::RenderResult;

/// Handle to a texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Handle to a framebuffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferHandle(pub u32);

/// Handle to a buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

/// Handle to a vertex array object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayHandle(pub u32);

/// Storage format of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TextureFormat {
    /// 8-bit normalized RGBA, used for sampled images and the presentation target
    Rgba8,
    /// 16-bit float RGBA, used for HDR geometry and bloom attachments
    Rgba16F,
    /// 24-bit depth
    Depth24,
}

impl TextureFormat {
    /// Whether the format can only be attached as a depth attachment
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth24)
    }

    /// Bytes per texel of the format
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgba16F => 8,
            Self::Depth24 => 3,
        }
    }
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    /// Point sampling
    Nearest,
    /// Bilinear sampling (trilinear when mipmaps are present)
    Linear,
}

/// Texture addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    /// Clamp coordinates to the edge texels
    ClampToEdge,
    /// Tile the texture
    Repeat,
}

/// Everything needed to allocate a 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Storage format
    pub format: TextureFormat,
    /// Minification and magnification filter
    pub filter: TextureFilter,
    /// Addressing mode on every axis
    pub wrap: TextureWrap,
    /// Whether a full mip chain is generated after upload
    pub mipmaps: bool,
}

impl TextureDesc {
    /// Description of a render-target attachment: nearest filtering,
    /// clamp-to-edge addressing and no mipmaps
    pub fn attachment(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            filter: TextureFilter::Nearest,
            wrap: TextureWrap::ClampToEdge,
            mipmaps: false,
        }
    }

    /// Description of a sampled image texture with linear filtering and mipmaps
    pub fn sampled(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8,
            filter: TextureFilter::Linear,
            wrap: TextureWrap::ClampToEdge,
            mipmaps: true,
        }
    }
}

/// Completeness state of a framebuffer as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    /// The framebuffer can be rendered to
    Complete,
    /// The default framebuffer does not exist
    Undefined,
    /// An attachment is incomplete or has mismatched dimensions
    IncompleteAttachment,
    /// No image is attached
    MissingAttachment,
    /// A draw buffer refers to an attachment point without an image
    IncompleteDrawBuffer,
    /// The read buffer refers to an attachment point without an image
    IncompleteReadBuffer,
    /// The combination of attachment formats is not supported
    Unsupported,
    /// Attachments disagree on their sample counts
    IncompleteMultisample,
    /// Attachments disagree on being layered
    IncompleteLayerTargets,
}

impl FramebufferStatus {
    /// Whether the framebuffer is complete
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

impl fmt::Display for FramebufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Complete => "framebuffer complete",
            Self::Undefined => "framebuffer not defined!",
            Self::IncompleteAttachment => "Incomplete attachment!",
            Self::MissingAttachment => "missing attachment!",
            Self::IncompleteDrawBuffer => "Incomplete draw buffer!",
            Self::IncompleteReadBuffer => "Incomplete read buffer!",
            Self::Unsupported => "Framebuffer not supported!",
            Self::IncompleteMultisample => "Incomplete multisampling!",
            Self::IncompleteLayerTargets => "Incomplete layer targets!",
        };
        f.write_str(reason)
    }
}

bitflags! {
    /// Buffers cleared by [`GraphicsDevice::clear`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        /// Color attachments
        const COLOR = 1 << 0;
        /// Depth attachment
        const DEPTH = 1 << 1;
        /// Stencil attachment
        const STENCIL = 1 << 2;
    }
}

/// What a buffer object is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Vertex attribute data
    Vertex,
    /// Element indices
    Index,
    /// Uniform block data
    Uniform,
}

/// Expected update frequency of a buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Written once, drawn many times
    Static,
    /// Rewritten occasionally
    Dynamic,
    /// Rewritten every frame
    Stream,
}

/// One float attribute sourced from a vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    /// Number of float components
    pub components: u32,
    /// Byte offset of the first component inside the buffer
    pub offset: usize,
}

/// Layout used to configure a vertex array object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexArrayDesc {
    /// Buffer providing every attribute
    pub vertex_buffer: BufferHandle,
    /// Optional element buffer captured by the vertex array
    pub index_buffer: Option<BufferHandle>,
    /// Distance between consecutive vertices in bytes
    pub stride: usize,
    /// Enabled attributes
    pub attributes: Vec<VertexAttribute>,
}

/// A vertex input declared by a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexInput {
    /// Shader input location
    pub location: u32,
    /// Number of float components (2 for `vec2`, 3 for `vec3`, ...)
    pub components: u32,
}

/// A value assignable to a program uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Signed integer, also used for sampler units and enum selectors
    Int(i32),
    /// Boolean, uploaded as an integer
    Bool(bool),
    /// Single float
    Float(f32),
    /// Three floats
    Vec3(Vec3),
    /// Four floats
    Vec4(Vec4),
    /// Column-major 4x4 matrix
    Mat4(Mat4),
}

/// Implementation limits queried once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Largest uniform block in bytes
    pub max_uniform_block_size: usize,
    /// Required alignment of uniform buffer range offsets
    pub uniform_buffer_offset_alignment: usize,
    /// Largest number of color attachments per framebuffer
    pub max_color_attachments: u32,
}

/// Driver identification shown in the editor overlay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// API version string
    pub version: String,
    /// Renderer (GPU) name
    pub renderer: String,
    /// Vendor name
    pub vendor: String,
    /// Shading language version string
    pub shading_language_version: String,
    /// Supported extensions
    pub extensions: Vec<String>,
}

/// CPU-visible view of a mapped buffer
///
/// Obtained from [`GraphicsDevice::map_buffer`]. The view is only valid
/// until the matching [`GraphicsDevice::unmap_buffer`]; the staging buffer
/// owns it for exactly that window.
#[derive(Debug)]
pub struct MappedMemory {
    ptr: NonNull<u8>,
    len: usize,
}

impl MappedMemory {
    /// Wrap a raw mapping
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writes of `len` bytes until the buffer it was
    /// mapped from is unmapped, and nothing else may access that memory in
    /// the meantime.
    pub unsafe fn from_raw(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Size of the mapping in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapping is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy `bytes` into the mapping at `offset`
    ///
    /// # Panics
    ///
    /// Panics if the write does not fit inside the mapping.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset
            .checked_add(bytes.len())
            .expect("mapped write range overflows usize");
        assert!(
            end <= self.len,
            "mapped write of {} bytes at offset {} exceeds mapping of {} bytes",
            bytes.len(),
            offset,
            self.len
        );

        // SAFETY: the range was bounds-checked above and `from_raw` guarantees
        // exclusive write access to `len` bytes behind `ptr`.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.ptr.as_ptr().add(offset), bytes.len());
        }
    }
}

/// The graphics API as seen by the render pipeline
///
/// Object creation returns [`RenderResult`] so a driver can report
/// allocation failures; state changes and draws cannot fail at this level.
pub trait GraphicsDevice {
    // === Queries ===

    /// Implementation limits
    fn limits(&self) -> DeviceLimits;

    /// Driver identification
    fn info(&self) -> DeviceInfo;

    // === Textures ===

    /// Allocate a 2D texture, optionally uploading tightly packed `pixels`
    fn create_texture(&mut self, desc: &TextureDesc, pixels: Option<&[u8]>) -> RenderResult<TextureHandle>;

    /// Release a texture
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Bind `texture` to sampler `unit`
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    // === Framebuffers ===

    /// Allocate an empty framebuffer object
    fn create_framebuffer(&mut self) -> RenderResult<FramebufferHandle>;

    /// Release a framebuffer object (attachments are not released)
    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle);

    /// Attach `texture` as color attachment `index`
    fn attach_color(&mut self, framebuffer: FramebufferHandle, index: u32, texture: TextureHandle);

    /// Attach `texture` as the depth attachment
    fn attach_depth(&mut self, framebuffer: FramebufferHandle, texture: TextureHandle);

    /// Route fragment outputs `0..count` to color attachments `0..count`
    fn set_draw_buffers(&mut self, framebuffer: FramebufferHandle, count: u32);

    /// Completeness check
    fn framebuffer_status(&self, framebuffer: FramebufferHandle) -> FramebufferStatus;

    /// Make `framebuffer` the draw destination, or the default one for `None`
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>);

    // === Buffers ===

    /// Allocate a buffer of `size` bytes, optionally initialized from `data`
    fn create_buffer(
        &mut self,
        kind: BufferKind,
        usage: BufferUsage,
        size: usize,
        data: Option<&[u8]>,
    ) -> RenderResult<BufferHandle>;

    /// Release a buffer
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Map the whole buffer for writing
    fn map_buffer(&mut self, buffer: BufferHandle) -> RenderResult<MappedMemory>;

    /// End the mapping started by [`GraphicsDevice::map_buffer`]
    fn unmap_buffer(&mut self, buffer: BufferHandle);

    /// Bind `size` bytes of `buffer` starting at `offset` to uniform block `binding`
    fn bind_buffer_range(&mut self, binding: u32, buffer: BufferHandle, offset: usize, size: usize);

    // === Programs ===

    /// Compile and link a program from its two stage sources
    fn create_program(&mut self, name: &str, vertex_source: &str, fragment_source: &str) -> RenderResult<ProgramHandle>;

    /// Release a program
    fn destroy_program(&mut self, program: ProgramHandle);

    /// Vertex inputs the linked program actually consumes
    fn program_inputs(&self, program: ProgramHandle) -> Vec<VertexInput>;

    /// Make `program` current, or unbind with `None`
    fn use_program(&mut self, program: Option<ProgramHandle>);

    /// Assign a uniform of `program`; unknown names are ignored
    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue);

    // === Vertex arrays ===

    /// Allocate and configure a vertex array object
    fn create_vertex_array(&mut self, desc: &VertexArrayDesc) -> RenderResult<VertexArrayHandle>;

    /// Release a vertex array object
    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Bind a vertex array, or unbind with `None`
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>);

    // === State and draws ===

    /// Set the viewport rectangle starting at the origin
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Set the color used by [`GraphicsDevice::clear`]
    fn set_clear_color(&mut self, color: Vec4);

    /// Clear the selected buffers of the bound framebuffer
    fn clear(&mut self, flags: ClearFlags);

    /// Enable or disable depth testing
    fn set_depth_test(&mut self, enabled: bool);

    /// Enable or disable alpha blending
    fn set_blend(&mut self, enabled: bool);

    /// Draw `count` indexed triangles' worth of `u32` indices starting at byte `offset`
    fn draw_elements(&mut self, count: u32, offset: usize);

    /// Draw `count` vertices starting at `first`
    fn draw_arrays(&mut self, first: u32, count: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incompleteness_reasons_are_distinct() {
        let statuses = [
            FramebufferStatus::Undefined,
            FramebufferStatus::IncompleteAttachment,
            FramebufferStatus::MissingAttachment,
            FramebufferStatus::IncompleteDrawBuffer,
            FramebufferStatus::IncompleteReadBuffer,
            FramebufferStatus::Unsupported,
            FramebufferStatus::IncompleteMultisample,
            FramebufferStatus::IncompleteLayerTargets,
        ];

        let messages: std::collections::HashSet<String> =
            statuses.iter().map(ToString::to_string).collect();

        assert_eq!(messages.len(), statuses.len());
        assert!(statuses.iter().all(|status| !status.is_complete()));
        assert_eq!(FramebufferStatus::MissingAttachment.to_string(), "missing attachment!");
    }

    #[test]
    fn attachment_description_is_point_sampled() {
        let desc = TextureDesc::attachment(800, 600, TextureFormat::Rgba16F);

        assert_eq!(desc.filter, TextureFilter::Nearest);
        assert_eq!(desc.wrap, TextureWrap::ClampToEdge);
        assert!(!desc.mipmaps);
    }

    #[test]
    #[should_panic(expected = "exceeds mapping")]
    fn mapped_write_past_end_panics() {
        let mut backing = vec![0u8; 8];
        let ptr = NonNull::new(backing.as_mut_ptr()).unwrap();
        let mut mapped = unsafe { MappedMemory::from_raw(ptr, backing.len()) };

        mapped.write(6, &[1, 2, 3]);
    }
}
