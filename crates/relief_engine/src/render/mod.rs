//! # Rendering System
//!
//! Forward and deferred scene rendering with a multi-pass bloom post-process.
//!
//! ## Architecture
//!
//! Every frame runs the same fixed sequence of passes, orchestrated by
//! [`RenderPipeline`]:
//!
//! 1. **Geometry pass**: entities (and optionally light indicators) are drawn
//!    into a five-attachment HDR [`RenderTarget`]. Attachment 4 receives the
//!    bright-pass color that seeds the bloom.
//! 2. **Bloom pass**: [`BloomPass`] ping-pongs a separable blur between two
//!    single-attachment targets.
//! 3. **Composite pass**: a full-screen quad resolves the geometry
//!    attachments and the blurred bloom into the presentation target, either
//!    by showing one attachment ([`ShadingMode::Forward`]) or by lighting all
//!    of them ([`ShadingMode::Deferred`]).
//!
//! Per-frame shader parameters travel through a single uniform buffer written
//! by the [`StagingBuffer`]; draw calls bind sub-ranges of it.
//!
//! All graphics API access goes through the [`GraphicsDevice`] trait so the
//! pipeline runs unchanged on the [`backends::HeadlessDevice`].

pub mod backends;
pub mod bloom;
pub mod camera;
pub mod composite;
pub mod device;
pub mod frame_data;
pub mod framebuffer;
pub mod pipeline;
pub mod program;
pub mod quad;
pub mod settings;
pub mod staging;

pub use bloom::BloomPass;
pub use camera::{CameraSettings, CameraState, EditorCamera};
pub use composite::{RenderTargetView, ShadingMode};
pub use device::{
    BufferHandle, ClearFlags, DeviceInfo, DeviceLimits, FramebufferHandle, FramebufferStatus,
    GraphicsDevice, ProgramHandle, TextureFormat, TextureHandle, UniformValue, VertexArrayHandle,
};
pub use framebuffer::RenderTarget;
pub use pipeline::{PipelinePrograms, RenderPipeline};
pub use program::{Program, ProgramLibrary};
pub use settings::RenderSettings;
pub use staging::{FrameRegion, StagingBuffer};

/// Errors raised by the rendering system
///
/// Incomplete render targets and an unresolved shading mode are setup errors:
/// they are logged at error level where detected and propagate to the
/// application, which terminates on them.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// A render target failed its completeness check
    ///
    /// Raised while (re)creating a [`RenderTarget`]. The status names the
    /// specific reason reported by the device.
    #[error("Framebuffer is incomplete: {status}")]
    IncompleteFramebuffer {
        /// Reason reported by the device
        status: FramebufferStatus,
    },

    /// The requested shading mode is neither forward nor deferred
    #[error("There must be a type of shading method selected! (got {0})")]
    NoShadingMethod(u32),

    /// A program consumes a vertex input the mesh does not provide
    #[error("Program {program} reads vertex location {location} which the mesh does not provide")]
    UnlinkedAttribute {
        /// Name of the program
        program: String,
        /// Shader input location without a matching mesh attribute
        location: u32,
    },

    /// A program was requested by name but never loaded
    #[error("Program not loaded: {0}")]
    MissingProgram(String),

    /// Resource creation or management failed
    ///
    /// Occurs when the device cannot create buffers, textures, framebuffers
    /// or programs, typically due to invalid sizes or data.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Device-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
