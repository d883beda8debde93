//! Off-screen render targets
//!
//! A [`RenderTarget`] owns a framebuffer object, one color attachment per
//! requested format and a single depth attachment, all sharing one size.
//! Attachments are point-sampled and clamped since they are only read back
//! texel-for-texel by the bloom and composite passes.

use crate::render::device::{
    FramebufferHandle, GraphicsDevice, TextureDesc, TextureFormat, TextureHandle,
};
use crate::render::{RenderError, RenderResult};

/// GPU objects backing one configuration of a render target
struct Attachments {
    framebuffer: FramebufferHandle,
    colors: Vec<TextureHandle>,
    depth: TextureHandle,
}

/// Framebuffer with its color and depth attachments
///
/// The format list is part of the target's state so that [`RenderTarget::resize`]
/// can rebuild the exact same attachment layout. GPU objects are released by
/// [`RenderTarget::destroy`]; consuming the target there makes a second
/// release impossible.
pub struct RenderTarget {
    framebuffer: FramebufferHandle,
    color_attachments: Vec<TextureHandle>,
    depth_attachment: TextureHandle,
    formats: Vec<TextureFormat>,
    width: u32,
    height: u32,
    released: bool,
}

impl RenderTarget {
    /// Allocate a render target of `width` x `height` with one color
    /// attachment per entry of `formats` plus a depth attachment
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::IncompleteFramebuffer`] when the device rejects
    /// the attachment combination, or the device's error when allocation fails.
    pub fn new(
        device: &mut impl GraphicsDevice,
        width: u32,
        height: u32,
        formats: &[TextureFormat],
    ) -> RenderResult<Self> {
        let attachments = Self::allocate(device, width, height, formats)?;
        log::debug!(
            "Created render target {:?} ({}x{}, {} color attachments)",
            attachments.framebuffer,
            width,
            height,
            formats.len()
        );

        Ok(Self {
            framebuffer: attachments.framebuffer,
            color_attachments: attachments.colors,
            depth_attachment: attachments.depth,
            formats: formats.to_vec(),
            width,
            height,
            released: false,
        })
    }

    /// Make this target the draw destination
    pub fn bind(&self, device: &mut impl GraphicsDevice) {
        device.bind_framebuffer(Some(self.framebuffer));
    }

    /// Restore the default draw destination
    pub fn unbind(&self, device: &mut impl GraphicsDevice) {
        device.bind_framebuffer(None);
    }

    /// Rebuild every attachment at a new size with the same formats
    ///
    /// Sizes with a non-positive component are ignored; a minimized window
    /// reports them transiently. The old objects are released before the new
    /// ones are allocated.
    ///
    /// # Errors
    ///
    /// Same as [`RenderTarget::new`].
    pub fn resize(&mut self, device: &mut impl GraphicsDevice, width: i32, height: i32) -> RenderResult<()> {
        let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
            return Ok(());
        };
        if width == 0 || height == 0 {
            return Ok(());
        }

        log::debug!(
            "Resizing render target {:?} from {}x{} to {}x{}",
            self.framebuffer,
            self.width,
            self.height,
            width,
            height
        );

        self.release(device);
        let attachments = Self::allocate(device, width, height, &self.formats)?;

        self.framebuffer = attachments.framebuffer;
        self.color_attachments = attachments.colors;
        self.depth_attachment = attachments.depth;
        self.width = width;
        self.height = height;
        self.released = false;
        Ok(())
    }

    /// Release the framebuffer and every attachment
    pub fn destroy(mut self, device: &mut impl GraphicsDevice) {
        self.release(device);
    }

    /// Color attachment `index`, if it exists
    pub fn color_attachment(&self, index: usize) -> Option<TextureHandle> {
        self.color_attachments.get(index).copied()
    }

    /// All color attachments in attachment order
    pub fn color_attachments(&self) -> &[TextureHandle] {
        &self.color_attachments
    }

    /// The depth attachment
    pub fn depth_attachment(&self) -> TextureHandle {
        self.depth_attachment
    }

    /// Formats of the color attachments
    pub fn formats(&self) -> &[TextureFormat] {
        &self.formats
    }

    /// Current size in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The framebuffer object
    pub fn handle(&self) -> FramebufferHandle {
        self.framebuffer
    }

    fn release(&mut self, device: &mut impl GraphicsDevice) {
        if self.released {
            return;
        }

        device.destroy_framebuffer(self.framebuffer);
        for texture in self.color_attachments.drain(..) {
            device.destroy_texture(texture);
        }
        device.destroy_texture(self.depth_attachment);
        self.released = true;
    }

    fn allocate(
        device: &mut impl GraphicsDevice,
        width: u32,
        height: u32,
        formats: &[TextureFormat],
    ) -> RenderResult<Attachments> {
        let framebuffer = device.create_framebuffer()?;
        let mut colors = Vec::with_capacity(formats.len());

        let built = Self::attach_all(device, framebuffer, width, height, formats, &mut colors);
        match built {
            Ok(depth) => Ok(Attachments { framebuffer, colors, depth }),
            Err(err) => {
                for texture in colors {
                    device.destroy_texture(texture);
                }
                device.destroy_framebuffer(framebuffer);
                Err(err)
            }
        }
    }

    fn attach_all(
        device: &mut impl GraphicsDevice,
        framebuffer: FramebufferHandle,
        width: u32,
        height: u32,
        formats: &[TextureFormat],
        colors: &mut Vec<TextureHandle>,
    ) -> RenderResult<TextureHandle> {
        for (index, format) in (0u32..).zip(formats) {
            let texture = device.create_texture(&TextureDesc::attachment(width, height, *format), None)?;
            colors.push(texture);
            device.attach_color(framebuffer, index, texture);
        }

        let depth = device.create_texture(&TextureDesc::attachment(width, height, TextureFormat::Depth24), None)?;
        device.attach_depth(framebuffer, depth);

        let status = device.framebuffer_status(framebuffer);
        if !status.is_complete() {
            log::error!("Render target {:?} is incomplete: {}", framebuffer, status);
            device.destroy_texture(depth);
            return Err(RenderError::IncompleteFramebuffer { status });
        }

        let count = u32::try_from(formats.len())
            .map_err(|_| RenderError::ResourceCreationFailed(format!("{} color attachments", formats.len())))?;
        device.set_draw_buffers(framebuffer, count);
        Ok(depth)
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        if !self.released {
            log::warn!(
                "Render target {:?} dropped without destroy(); {} GPU objects leaked",
                self.framebuffer,
                self.color_attachments.len() + 2
            );
        }
    }
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("framebuffer", &self.framebuffer)
            .field("color_attachments", &self.color_attachments)
            .field("depth_attachment", &self.depth_attachment)
            .field("size", &(self.width, self.height))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::HeadlessDevice;
    use crate::render::device::FramebufferStatus;

    const GEOMETRY: [TextureFormat; 5] = [TextureFormat::Rgba16F; 5];

    #[test]
    fn allocates_one_color_attachment_per_format() {
        let mut device = HeadlessDevice::new();
        let target = RenderTarget::new(&mut device, 320, 240, &GEOMETRY).unwrap();

        assert_eq!(target.color_attachments().len(), 5);
        assert_eq!(target.formats(), &GEOMETRY);
        assert_eq!(device.draw_buffer_count(target.handle()), 5);
        assert_eq!(device.framebuffer_colors(target.handle()), target.color_attachments());

        let depth = device.texture_desc(target.depth_attachment()).unwrap();
        assert_eq!(depth.format, TextureFormat::Depth24);
        assert_eq!((depth.width, depth.height), (320, 240));

        target.destroy(&mut device);
        assert_eq!(device.live_object_count(), 0);
    }

    #[test]
    fn resize_rebuilds_with_new_size_and_same_formats() {
        let mut device = HeadlessDevice::new();
        let formats = [TextureFormat::Rgba16F, TextureFormat::Rgba8];
        let mut target = RenderTarget::new(&mut device, 100, 100, &formats).unwrap();
        let old_colors = target.color_attachments().to_vec();

        target.resize(&mut device, 200, 50).unwrap();

        assert_eq!(target.size(), (200, 50));
        assert_eq!(target.formats(), &formats);
        assert!(old_colors.iter().all(|texture| !device.is_texture_live(*texture)));
        for texture in target.color_attachments() {
            let desc = device.texture_desc(*texture).unwrap();
            assert_eq!((desc.width, desc.height), (200, 50));
        }
        // two colors + depth
        assert_eq!(device.live_texture_count(), 3);

        target.destroy(&mut device);
    }

    #[test]
    fn same_size_resize_still_reallocates() {
        let mut device = HeadlessDevice::new();
        let formats = [TextureFormat::Rgba16F, TextureFormat::Rgba8];
        let mut target = RenderTarget::new(&mut device, 800, 600, &formats).unwrap();
        let old_colors = target.color_attachments().to_vec();
        let old_depth = target.depth_attachment();
        let live_textures = device.live_texture_count();

        target.resize(&mut device, 800, 600).unwrap();

        assert_eq!(target.size(), (800, 600));
        assert_eq!(target.color_attachments().len(), 2);
        assert_eq!(target.formats(), &formats);
        for (old, new) in old_colors.iter().zip(target.color_attachments()) {
            assert_ne!(old, new);
            assert!(!device.is_texture_live(*old));
            assert!(device.is_texture_live(*new));
        }
        assert_ne!(target.depth_attachment(), old_depth);
        assert!(!device.is_texture_live(old_depth));
        assert_eq!(device.live_texture_count(), live_textures);
        assert!(device.validation_errors().is_empty());

        target.destroy(&mut device);
    }

    #[test]
    fn non_positive_resize_keeps_handles() {
        let mut device = HeadlessDevice::new();
        let mut target = RenderTarget::new(&mut device, 64, 64, &[TextureFormat::Rgba8]).unwrap();
        let framebuffer = target.handle();
        let colors = target.color_attachments().to_vec();
        let depth = target.depth_attachment();

        for (width, height) in [(0, 64), (64, 0), (-5, 64), (64, -1)] {
            target.resize(&mut device, width, height).unwrap();
        }

        assert_eq!(target.handle(), framebuffer);
        assert_eq!(target.color_attachments(), colors.as_slice());
        assert_eq!(target.depth_attachment(), depth);
        assert_eq!(target.size(), (64, 64));

        target.destroy(&mut device);
    }

    #[test]
    fn incomplete_target_reports_reason_and_frees_everything() {
        let mut device = HeadlessDevice::new();
        device.force_framebuffer_status(Some(FramebufferStatus::Unsupported));

        let result = RenderTarget::new(&mut device, 64, 64, &[TextureFormat::Rgba16F]);

        match result {
            Err(RenderError::IncompleteFramebuffer { status }) => {
                assert_eq!(status, FramebufferStatus::Unsupported);
            }
            other => panic!("expected an incomplete framebuffer, got {other:?}"),
        }
        assert_eq!(device.live_object_count(), 0);
    }

    #[test]
    fn bind_and_unbind_switch_draw_destination() {
        let mut device = HeadlessDevice::new();
        let target = RenderTarget::new(&mut device, 8, 8, &[TextureFormat::Rgba8]).unwrap();

        target.bind(&mut device);
        assert_eq!(device.bound_framebuffer(), Some(target.handle()));

        target.unbind(&mut device);
        assert_eq!(device.bound_framebuffer(), None);

        target.destroy(&mut device);
    }
}
