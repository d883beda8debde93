//! Composite pass
//!
//! Resolves the geometry target into the presentation target. Forward
//! shading shows one attachment blended with the bloom; deferred shading
//! samples all four color attachments and lights them in screen space.
//! Both variants only bind their inputs here; the caller draws the
//! full-screen quad afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::render::device::{GraphicsDevice, TextureHandle, UniformValue};
use crate::render::framebuffer::RenderTarget;
use crate::render::program::Program;
use crate::render::{RenderError, RenderResult};

/// How the geometry attachments are turned into the final image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShadingMode {
    /// Display one attachment, lit during the geometry pass
    Forward = 0,
    /// Light every attachment in the composite pass
    Deferred = 1,
}

impl ShadingMode {
    /// Every mode in selector order
    pub const ALL: [Self; 2] = [Self::Forward, Self::Deferred];

    /// Name shown by the editor
    pub fn label(self) -> &'static str {
        match self {
            Self::Forward => "Forward",
            Self::Deferred => "Deferred",
        }
    }
}

impl TryFrom<u32> for ShadingMode {
    type Error = RenderError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Forward),
            1 => Ok(Self::Deferred),
            other => Err(RenderError::NoShadingMethod(other)),
        }
    }
}

impl fmt::Display for ShadingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Attachment of the geometry target shown by forward shading
///
/// The discriminant is the value of the `renderMode`/`renderTarget` shader
/// uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderTargetView {
    /// Lit color
    Albedo = 0,
    /// World-space normals
    Normals = 1,
    /// World-space positions
    Position = 2,
    /// Linear depth
    Depth = 3,
    /// Specular intensity
    Specular = 4,
}

/// Where a view reads its texels from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentSource {
    /// A color attachment index
    Color(usize),
    /// The depth attachment
    Depth,
}

impl RenderTargetView {
    /// Every view in selector order
    pub const ALL: [Self; 5] = [Self::Albedo, Self::Normals, Self::Position, Self::Depth, Self::Specular];

    /// Name shown by the editor
    pub fn label(self) -> &'static str {
        match self {
            Self::Albedo => "Albedo",
            Self::Normals => "Normals",
            Self::Position => "Position",
            Self::Depth => "Depth",
            Self::Specular => "Specular",
        }
    }

    /// Value passed to the shaders
    pub fn index(self) -> i32 {
        self as i32
    }

    /// Geometry target attachment holding this view
    pub fn source(self) -> AttachmentSource {
        match self {
            Self::Albedo => AttachmentSource::Color(0),
            Self::Normals => AttachmentSource::Color(1),
            Self::Position => AttachmentSource::Color(2),
            Self::Specular => AttachmentSource::Color(3),
            Self::Depth => AttachmentSource::Depth,
        }
    }
}

impl fmt::Display for RenderTargetView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Values shared by both composite variants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeInputs {
    /// Blurred bright-pass texture
    pub bloom: TextureHandle,
    /// Tone mapping exposure
    pub exposure_level: f32,
    /// Whether tone mapping runs
    pub exposure_active: bool,
}

fn color(geometry: &RenderTarget, index: usize) -> RenderResult<TextureHandle> {
    geometry.color_attachment(index).ok_or_else(|| {
        RenderError::BackendError(format!(
            "geometry target has {} color attachments, composite reads attachment {}",
            geometry.color_attachments().len(),
            index
        ))
    })
}

fn set_exposure(device: &mut impl GraphicsDevice, program: &Program, inputs: &CompositeInputs) {
    device.set_uniform(program.handle(), "exposureLevel", UniformValue::Float(inputs.exposure_level));
    device.set_uniform(program.handle(), "exposureActive", UniformValue::Bool(inputs.exposure_active));
}

/// Bind the forward composite: the selected attachment on unit 0 and the
/// bloom on unit 1, with blending enabled
///
/// # Errors
///
/// Fails when the geometry target lacks the attachment the view reads.
pub fn bind_forward(
    device: &mut impl GraphicsDevice,
    program: &Program,
    geometry: &RenderTarget,
    view: RenderTargetView,
    inputs: &CompositeInputs,
) -> RenderResult<()> {
    let shown = match view.source() {
        AttachmentSource::Color(index) => color(geometry, index)?,
        AttachmentSource::Depth => geometry.depth_attachment(),
    };

    device.use_program(Some(program.handle()));
    device.set_blend(true);
    set_exposure(device, program, inputs);

    device.set_uniform(program.handle(), "screenTexture", UniformValue::Int(0));
    device.bind_texture(0, shown);

    device.set_uniform(program.handle(), "renderTarget", UniformValue::Int(view.index()));

    device.set_uniform(program.handle(), "bloomBlur", UniformValue::Int(1));
    device.bind_texture(1, inputs.bloom);
    Ok(())
}

/// Samplers of the deferred composite, bound to units 0..=3
pub const DEFERRED_SAMPLERS: [&str; 4] = ["gColor", "gNormal", "gPosition", "gAlbedoSpec"];

/// Bind the deferred composite: color attachments 0-3 on units 0-3 and the
/// bloom on unit 4, with blending disabled
///
/// # Errors
///
/// Fails when the geometry target has fewer than four color attachments.
pub fn bind_deferred(
    device: &mut impl GraphicsDevice,
    program: &Program,
    geometry: &RenderTarget,
    inputs: &CompositeInputs,
) -> RenderResult<()> {
    let mut attachments = [TextureHandle(0); 4];
    for (index, slot) in attachments.iter_mut().enumerate() {
        *slot = color(geometry, index)?;
    }

    device.set_blend(false);
    device.use_program(Some(program.handle()));
    set_exposure(device, program, inputs);

    for (unit, sampler) in DEFERRED_SAMPLERS.iter().enumerate() {
        device.set_uniform(program.handle(), sampler, UniformValue::Int(unit as i32));
    }
    for (unit, texture) in attachments.iter().enumerate() {
        device.bind_texture(unit as u32, *texture);
    }

    device.set_uniform(program.handle(), "bloomBlur", UniformValue::Int(4));
    device.bind_texture(4, inputs.bloom);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::HeadlessDevice;
    use crate::render::device::TextureFormat;

    fn setup() -> (HeadlessDevice, Program, RenderTarget, CompositeInputs) {
        let mut device = HeadlessDevice::new();
        let handle = device.create_program("QUAD", "void main() {}", "void main() {}").unwrap();
        let program = Program::new("QUAD", handle, Vec::new());
        let geometry = RenderTarget::new(&mut device, 64, 64, &[TextureFormat::Rgba16F; 5]).unwrap();
        let bloom = device
            .create_texture(&crate::render::device::TextureDesc::attachment(64, 64, TextureFormat::Rgba16F), None)
            .unwrap();
        let inputs = CompositeInputs {
            bloom,
            exposure_level: 2.5,
            exposure_active: true,
        };
        (device, program, geometry, inputs)
    }

    #[test]
    fn shading_mode_from_index() {
        assert_eq!(ShadingMode::try_from(0).unwrap(), ShadingMode::Forward);
        assert_eq!(ShadingMode::try_from(1).unwrap(), ShadingMode::Deferred);
        assert!(matches!(ShadingMode::try_from(2), Err(RenderError::NoShadingMethod(2))));
    }

    #[test]
    fn views_map_to_their_attachments() {
        assert_eq!(RenderTargetView::Specular.source(), AttachmentSource::Color(3));
        assert_eq!(RenderTargetView::Depth.source(), AttachmentSource::Depth);
        assert_eq!(RenderTargetView::Depth.index(), 3);
        assert_eq!(RenderTargetView::Specular.index(), 4);
        for (position, view) in RenderTargetView::ALL.iter().enumerate() {
            assert_eq!(view.index(), position as i32);
        }
    }

    #[test]
    fn forward_binds_selected_attachment_and_bloom() {
        let (mut device, program, geometry, inputs) = setup();

        bind_forward(&mut device, &program, &geometry, RenderTargetView::Depth, &inputs).unwrap();

        assert_eq!(device.bound_texture(0), Some(geometry.depth_attachment()));
        assert_eq!(device.bound_texture(1), Some(inputs.bloom));
        assert!(device.blend_enabled());
        assert_eq!(device.uniform(program.handle(), "renderTarget"), Some(UniformValue::Int(3)));
        assert_eq!(device.uniform(program.handle(), "bloomBlur"), Some(UniformValue::Int(1)));
        assert_eq!(device.uniform(program.handle(), "exposureLevel"), Some(UniformValue::Float(2.5)));

        geometry.destroy(&mut device);
    }

    #[test]
    fn deferred_binds_all_color_attachments() {
        let (mut device, program, geometry, inputs) = setup();
        device.set_blend(true);

        bind_deferred(&mut device, &program, &geometry, &inputs).unwrap();

        for unit in 0..4 {
            assert_eq!(device.bound_texture(unit), geometry.color_attachment(unit as usize));
        }
        assert_eq!(device.bound_texture(4), Some(inputs.bloom));
        assert!(!device.blend_enabled());
        assert_eq!(device.uniform(program.handle(), "gAlbedoSpec"), Some(UniformValue::Int(3)));
        assert_eq!(device.uniform(program.handle(), "bloomBlur"), Some(UniformValue::Int(4)));

        geometry.destroy(&mut device);
    }

    #[test]
    fn deferred_needs_four_color_attachments() {
        let (mut device, program, geometry, inputs) = setup();
        let thin = RenderTarget::new(&mut device, 64, 64, &[TextureFormat::Rgba8]).unwrap();

        let result = bind_deferred(&mut device, &program, &thin, &inputs);

        assert!(matches!(result, Err(RenderError::BackendError(_))));
        thin.destroy(&mut device);
        geometry.destroy(&mut device);
    }
}
