//! Bloom blur
//!
//! A separable Gaussian blur ping-pongs between two single-attachment
//! targets. Pass `n` renders into buffer `horizontal` while sampling the
//! other buffer, except the first pass which samples the bright-pass seed.

use crate::foundation::math::Vec4;
use crate::render::device::{ClearFlags, GraphicsDevice, TextureFormat, TextureHandle, UniformValue};
use crate::render::framebuffer::RenderTarget;
use crate::render::program::Program;
use crate::render::quad::FullscreenQuad;
use crate::render::{RenderError, RenderResult};

/// Format of the blur buffers
pub const BLOOM_FORMAT: TextureFormat = TextureFormat::Rgba16F;

/// Two ping-pong targets
#[derive(Debug)]
pub struct BloomPass {
    buffers: [RenderTarget; 2],
}

impl BloomPass {
    /// Allocate both buffers at `width` x `height`
    ///
    /// # Errors
    ///
    /// Same as [`RenderTarget::new`].
    pub fn new(device: &mut impl GraphicsDevice, width: u32, height: u32) -> RenderResult<Self> {
        let first = RenderTarget::new(device, width, height, &[BLOOM_FORMAT])?;
        let second = match RenderTarget::new(device, width, height, &[BLOOM_FORMAT]) {
            Ok(target) => target,
            Err(e) => {
                first.destroy(device);
                return Err(e);
            }
        };
        Ok(Self {
            buffers: [first, second],
        })
    }

    /// Blur `seed` with `iterations` alternating passes and return the
    /// texture written last
    ///
    /// With zero iterations nothing is blurred: buffer 0 is cleared and its
    /// attachment returned, so the composite samples black. The blur program
    /// is unbound again on return.
    ///
    /// # Errors
    ///
    /// Fails when a buffer lost its attachment to a failed resize.
    pub fn run(
        &self,
        device: &mut impl GraphicsDevice,
        program: &Program,
        quad: &FullscreenQuad,
        seed: TextureHandle,
        iterations: u32,
    ) -> RenderResult<TextureHandle> {
        device.use_program(Some(program.handle()));
        device.set_uniform(
            program.handle(),
            "iterations",
            UniformValue::Int(i32::try_from(iterations).unwrap_or(i32::MAX)),
        );
        device.set_depth_test(false);
        device.set_clear_color(Vec4::new(0.0, 0.0, 0.0, 1.0));

        if iterations == 0 {
            self.buffers[0].bind(device);
            device.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
            self.buffers[0].unbind(device);
            device.use_program(None);
            return self.output(0);
        }

        let mut horizontal = true;
        for pass in 0..iterations {
            self.buffers[usize::from(horizontal)].bind(device);
            device.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
            device.set_uniform(program.handle(), "horizontal", UniformValue::Bool(horizontal));

            let source = if pass == 0 { seed } else { self.output(usize::from(!horizontal))? };
            device.bind_texture(0, source);
            quad.draw(device);

            horizontal = !horizontal;
        }
        device.bind_framebuffer(None);
        device.use_program(None);
        log::trace!("Bloom ran {} passes", iterations);

        self.output(usize::from(!horizontal))
    }

    fn output(&self, index: usize) -> RenderResult<TextureHandle> {
        self.buffers[index]
            .color_attachment(0)
            .ok_or_else(|| RenderError::BackendError(format!("bloom buffer {} has no color attachment", index)))
    }

    /// Ping-pong buffer `index` (0 or 1)
    pub fn buffer(&self, index: usize) -> Option<&RenderTarget> {
        self.buffers.get(index)
    }

    /// Resize both buffers; non-positive sizes are ignored
    ///
    /// # Errors
    ///
    /// Same as [`RenderTarget::resize`].
    pub fn resize(&mut self, device: &mut impl GraphicsDevice, width: i32, height: i32) -> RenderResult<()> {
        for buffer in &mut self.buffers {
            buffer.resize(device, width, height)?;
        }
        Ok(())
    }

    /// Release both buffers
    pub fn destroy(self, device: &mut impl GraphicsDevice) {
        let [first, second] = self.buffers;
        first.destroy(device);
        second.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::{Command, HeadlessDevice};
    use crate::render::device::{FramebufferStatus, TextureDesc};

    struct Fixture {
        device: HeadlessDevice,
        program: Program,
        quad: FullscreenQuad,
        seed: TextureHandle,
        bloom: BloomPass,
    }

    fn fixture() -> Fixture {
        let mut device = HeadlessDevice::new();
        let handle = device.create_program("BLOOM", "void main() {}", "void main() {}").unwrap();
        let program = Program::new("BLOOM", handle, Vec::new());
        let quad = FullscreenQuad::new(&mut device).unwrap();
        let seed = device
            .create_texture(&TextureDesc::attachment(32, 32, TextureFormat::Rgba16F), None)
            .unwrap();
        let bloom = BloomPass::new(&mut device, 32, 32).unwrap();
        device.take_commands();
        Fixture { device, program, quad, seed, bloom }
    }

    fn sampled_textures(commands: &[Command]) -> Vec<TextureHandle> {
        commands
            .iter()
            .filter_map(|command| match command {
                Command::BindTexture { unit: 0, texture } => Some(*texture),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn zero_iterations_returns_cleared_first_buffer() {
        let mut f = fixture();

        let result = f.bloom.run(&mut f.device, &f.program, &f.quad, f.seed, 0).unwrap();

        assert_eq!(Some(result), f.bloom.buffer(0).unwrap().color_attachment(0));
        let commands = f.device.take_commands();
        assert!(commands.contains(&Command::Clear(ClearFlags::COLOR | ClearFlags::DEPTH)));
        assert!(!commands.iter().any(|c| matches!(c, Command::DrawArrays { .. })));
        assert_eq!(f.device.current_program(), None);
    }

    #[test]
    fn failed_resize_reports_missing_buffer() {
        let mut f = fixture();
        f.device.force_framebuffer_status(Some(FramebufferStatus::Unsupported));
        assert!(f.bloom.resize(&mut f.device, 64, 64).is_err());
        f.device.force_framebuffer_status(None);

        let result = f.bloom.run(&mut f.device, &f.program, &f.quad, f.seed, 2);

        assert!(matches!(result, Err(RenderError::BackendError(_))));
    }

    #[test]
    fn passes_alternate_between_buffers() {
        let mut f = fixture();
        let ping = f.bloom.buffer(0).unwrap().color_attachments()[0];
        let pong = f.bloom.buffer(1).unwrap().color_attachments()[0];

        let result = f.bloom.run(&mut f.device, &f.program, &f.quad, f.seed, 4).unwrap();

        let commands = f.device.take_commands();
        // First pass writes buffer 1 from the seed, then each pass reads the previous output
        assert_eq!(sampled_textures(&commands), vec![f.seed, pong, ping, pong]);
        assert_eq!(result, ping);
        assert_eq!(f.device.bound_framebuffer(), None);
        assert!(!f.device.depth_test_enabled());
        assert_eq!(f.device.uniform(f.program.handle(), "iterations"), Some(UniformValue::Int(4)));
        assert_eq!(f.device.current_program(), None);
        assert_eq!(commands.last(), Some(&Command::UseProgram(None)));
    }

    #[test]
    fn odd_iteration_count_ends_in_second_buffer() {
        let mut f = fixture();

        let result = f.bloom.run(&mut f.device, &f.program, &f.quad, f.seed, 3).unwrap();

        assert_eq!(Some(result), f.bloom.buffer(1).unwrap().color_attachment(0));
        assert_eq!(f.device.uniform(f.program.handle(), "horizontal"), Some(UniformValue::Bool(true)));
    }

    #[test]
    fn resize_and_destroy_release_everything() {
        let mut f = fixture();
        f.bloom.resize(&mut f.device, 64, 16).unwrap();
        assert_eq!(f.bloom.buffer(1).unwrap().size(), (64, 16));

        f.bloom.destroy(&mut f.device);
        f.quad.destroy(&mut f.device);
        f.device.destroy_texture(f.seed);
        f.device.destroy_program(f.program.handle());

        assert_eq!(f.device.live_object_count(), 0);
    }
}
