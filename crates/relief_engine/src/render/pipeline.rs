//! # Render Pipeline
//!
//! Owner of every per-frame GPU resource and sequencer of the passes.
//!
//! A frame is produced in two calls:
//!
//! - [`RenderPipeline::update`] applies a queued resize, moves the camera
//!   and writes the frame's shader parameters into the staging buffer.
//! - [`RenderPipeline::render`] runs the geometry, bloom and composite
//!   passes, always in that order.
//!
//! Programs are looked up by name in a [`ProgramLibrary`] on every frame, so
//! a program reloaded by the editor takes effect on the next frame.

use crate::assets::{AssetLibrary, ModelId, SubmeshDraw};
use crate::core::config::ApplicationConfig;
use crate::foundation::math::Vec4;
use crate::input::InputState;
use crate::render::bloom::BloomPass;
use crate::render::camera::EditorCamera;
use crate::render::composite::{self, CompositeInputs, ShadingMode};
use crate::render::device::{
    BufferKind, BufferUsage, ClearFlags, DeviceInfo, GraphicsDevice, TextureFormat, TextureHandle, UniformValue,
};
use crate::render::frame_data::{self, GLOBAL_PARAMS_BINDING, LOCAL_PARAMS_BINDING};
use crate::render::framebuffer::RenderTarget;
use crate::render::program::ProgramLibrary;
use crate::render::quad::FullscreenQuad;
use crate::render::settings::RenderSettings;
use crate::render::staging::{FrameRegion, StagingBuffer};
use crate::render::{RenderError, RenderResult};
use crate::scene::Scene;

/// Color attachments of the geometry target: lit color, normals, positions,
/// specular and the bright-pass color
pub const GEOMETRY_FORMATS: [TextureFormat; 5] = [TextureFormat::Rgba16F; 5];

/// Geometry attachment that seeds the bloom
pub const BRIGHT_ATTACHMENT: usize = 4;

/// Attachment format of the presentation target
pub const PRESENTATION_FORMAT: TextureFormat = TextureFormat::Rgba8;

/// Names of the programs each pass draws with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePrograms {
    /// Regular entities
    pub mesh: String,
    /// Relief-mapped entities
    pub relief: String,
    /// Light indicators
    pub light: String,
    /// Separable blur
    pub bloom: String,
    /// Forward composite
    pub forward: String,
    /// Deferred composite
    pub deferred: String,
}

impl Default for PipelinePrograms {
    fn default() -> Self {
        Self {
            mesh: "MESH".to_string(),
            relief: "RELIEF".to_string(),
            light: "LIGHT".to_string(),
            bloom: "BLOOM".to_string(),
            forward: "FORWARD".to_string(),
            deferred: "DEFERRED".to_string(),
        }
    }
}

/// Render targets, uniform staging, camera and settings of one view
pub struct RenderPipeline {
    geometry: RenderTarget,
    bloom: BloomPass,
    presentation: RenderTarget,
    staging: StagingBuffer,
    quad: FullscreenQuad,
    camera: EditorCamera,
    settings: RenderSettings,
    programs: PipelinePrograms,
    global_params: FrameRegion,
    uniform_alignment: usize,
    device_info: DeviceInfo,
    width: u32,
    height: u32,
    pending_resize: Option<(i32, i32)>,
}

impl RenderPipeline {
    /// Allocate every target at the configured window size
    ///
    /// The uniform buffer offset alignment and the device info are queried
    /// here once and kept for the pipeline's lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::IncompleteFramebuffer`] when a target fails its
    /// completeness check, or the device's error when an allocation fails.
    pub fn new(
        device: &mut impl GraphicsDevice,
        config: &ApplicationConfig,
        programs: PipelinePrograms,
    ) -> RenderResult<Self> {
        let (width, height) = (config.window.width, config.window.height);
        let limits = device.limits();
        let device_info = device.info();
        log::info!(
            "Renderer: {} ({}), version {}",
            device_info.renderer,
            device_info.vendor,
            device_info.version
        );

        let geometry = RenderTarget::new(device, width, height, &GEOMETRY_FORMATS)?;
        let bloom = BloomPass::new(device, width, height)?;
        let presentation = RenderTarget::new(device, width, height, &[PRESENTATION_FORMAT])?;
        let staging = StagingBuffer::new(
            device,
            BufferKind::Uniform,
            BufferUsage::Stream,
            limits.max_uniform_block_size,
        )?;
        let quad = FullscreenQuad::new(device)?;

        log::info!(
            "Render pipeline ready at {}x{} ({} byte uniform buffer, {} byte offset alignment)",
            width,
            height,
            limits.max_uniform_block_size,
            limits.uniform_buffer_offset_alignment
        );

        Ok(Self {
            geometry,
            bloom,
            presentation,
            staging,
            quad,
            camera: EditorCamera::from_config(&config.camera, width, height),
            settings: RenderSettings::from_config(&config.renderer, &config.bloom),
            programs,
            global_params: FrameRegion::default(),
            uniform_alignment: limits.uniform_buffer_offset_alignment.max(1),
            device_info,
            width,
            height,
            pending_resize: None,
        })
    }

    /// Queue a viewport resize, applied before the next update or render
    ///
    /// A later request replaces an earlier one that was not applied yet.
    pub fn request_resize(&mut self, width: i32, height: i32) {
        self.pending_resize = Some((width, height));
    }

    /// Whether a resize is waiting to be applied
    pub fn has_pending_resize(&self) -> bool {
        self.pending_resize.is_some()
    }

    fn apply_pending_resize(&mut self, device: &mut impl GraphicsDevice) -> RenderResult<()> {
        let Some((width, height)) = self.pending_resize.take() else {
            return Ok(());
        };
        if width <= 0 || height <= 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return Ok(());
        }

        self.geometry.resize(device, width, height)?;
        self.bloom.resize(device, width, height)?;
        self.presentation.resize(device, width, height)?;
        self.camera.recalculate(width, height);
        self.width = self.geometry.size().0;
        self.height = self.geometry.size().1;
        log::info!("Viewport resized to {}x{}", self.width, self.height);
        Ok(())
    }

    /// Advance the camera and write this frame's shader parameters
    ///
    /// Every entity's local parameter region is stored back on the entity.
    ///
    /// # Errors
    ///
    /// Fails when a queued resize cannot reallocate the targets or the
    /// staging buffer cannot be mapped.
    ///
    /// # Panics
    ///
    /// Panics when the scene does not fit into the staging buffer.
    pub fn update(
        &mut self,
        device: &mut impl GraphicsDevice,
        input: &InputState,
        dt: f32,
        scene: &mut Scene,
    ) -> RenderResult<()> {
        self.apply_pending_resize(device)?;
        self.camera.update(input, dt);

        self.staging.map(device)?;
        self.global_params = frame_data::write_global_params(&mut self.staging, &self.camera.position(), &scene.lights);
        frame_data::write_entity_params(
            &mut self.staging,
            &mut scene.entities,
            self.camera.view(),
            &self.camera.view_projection(),
            self.uniform_alignment,
        );
        self.staging.unmap(device);

        log::trace!(
            "Frame parameters: {} entities, {} of {} bytes used",
            scene.entities.len(),
            self.staging.head(),
            self.staging.capacity()
        );
        Ok(())
    }

    /// Produce one frame into the presentation target
    ///
    /// # Errors
    ///
    /// Fails when a program a pass needs is not loaded, a mesh does not
    /// provide an input its program reads, or a queued resize cannot
    /// reallocate the targets.
    pub fn render(
        &mut self,
        device: &mut impl GraphicsDevice,
        scene: &Scene,
        assets: &mut AssetLibrary,
        library: &ProgramLibrary,
    ) -> RenderResult<()> {
        self.apply_pending_resize(device)?;
        device.set_viewport(self.width, self.height);

        // Geometry
        self.geometry.bind(device);
        device.set_clear_color(Vec4::new(0.0, 0.0, 0.0, 1.0));
        device.set_depth_test(true);
        device.clear(ClearFlags::COLOR | ClearFlags::DEPTH);

        self.draw_entities(device, scene, assets, library)?;
        if self.settings.debug_lights() {
            self.draw_light_indicators(device, scene, assets, library)?;
        }
        self.geometry.unbind(device);

        // Bloom
        let seed = self.geometry.color_attachment(BRIGHT_ATTACHMENT).ok_or_else(|| {
            RenderError::BackendError(format!("geometry target has no attachment {}", BRIGHT_ATTACHMENT))
        })?;
        let bloom_program = library.require(&self.programs.bloom)?;
        let bloom = self
            .bloom
            .run(device, bloom_program, &self.quad, seed, self.settings.bloom_iterations())?;

        // Composite
        self.presentation.bind(device);
        device.set_clear_color(Vec4::new(0.0, 0.0, 0.0, 1.0));
        device.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        device.set_depth_test(false);

        let inputs = CompositeInputs {
            bloom,
            exposure_level: self.settings.exposure_level(),
            exposure_active: self.settings.exposure_active(),
        };
        match self.settings.shading_mode() {
            ShadingMode::Forward => {
                let program = library.require(&self.programs.forward)?;
                composite::bind_forward(device, program, &self.geometry, self.settings.render_target(), &inputs)?;
            }
            ShadingMode::Deferred => {
                let program = library.require(&self.programs.deferred)?;
                composite::bind_deferred(device, program, &self.geometry, &inputs)?;
            }
        }

        self.quad.draw(device);
        device.use_program(None);
        self.presentation.unbind(device);
        Ok(())
    }

    fn draw_entities(
        &self,
        device: &mut impl GraphicsDevice,
        scene: &Scene,
        assets: &mut AssetLibrary,
        library: &ProgramLibrary,
    ) -> RenderResult<()> {
        let buffer = self.staging.handle();
        device.bind_buffer_range(GLOBAL_PARAMS_BINDING, buffer, self.global_params.offset, self.global_params.size);

        let render_mode = UniformValue::Int(self.settings.render_target().index());
        let bloom_range = UniformValue::Float(self.settings.bloom_range());

        for entity in &scene.entities {
            let local = entity.local_params;

            match &entity.relief {
                Some(relief) => {
                    let program = library.require(&self.programs.relief)?;
                    let handle = program.handle();
                    device.use_program(Some(handle));
                    device.set_uniform(handle, "renderMode", render_mode);
                    device.bind_buffer_range(LOCAL_PARAMS_BINDING, buffer, local.offset, local.size);

                    let texture = assets.texture_handle(relief.texture);
                    let normal_map = assets.texture_handle(relief.normal_map);
                    let depth_map = assets.texture_handle(relief.depth_map);

                    for submesh in 0..assets.submesh_count(entity.model) {
                        let draw = assets.submesh_draw(device, entity.model, submesh, program)?;

                        device.set_uniform(handle, "bloomRange", bloom_range);
                        device.set_uniform(handle, "bumpiness", UniformValue::Float(relief.bumpiness));
                        device.set_uniform(handle, "minLayers", UniformValue::Float(relief.min_layers));
                        device.set_uniform(handle, "maxLayers", UniformValue::Float(relief.max_layers));
                        device.set_uniform(handle, "viewPos", UniformValue::Vec3(self.camera.position()));

                        device.set_uniform(handle, "uTexture", UniformValue::Int(0));
                        device.bind_texture(0, texture);
                        device.set_uniform(handle, "uNormalMap", UniformValue::Int(1));
                        device.bind_texture(1, normal_map);
                        device.set_uniform(handle, "uDepthMap", UniformValue::Int(2));
                        device.bind_texture(2, depth_map);

                        draw_submesh(device, &draw);
                    }
                }
                None => {
                    let program = library.require(&self.programs.mesh)?;
                    let handle = program.handle();
                    device.use_program(Some(handle));
                    device.set_uniform(handle, "renderMode", render_mode);
                    device.set_uniform(handle, "bloomRange", bloom_range);
                    device.bind_buffer_range(LOCAL_PARAMS_BINDING, buffer, local.offset, local.size);

                    for submesh in 0..assets.submesh_count(entity.model) {
                        let draw = assets.submesh_draw(device, entity.model, submesh, program)?;

                        device.set_uniform(handle, "uTexture", UniformValue::Int(0));
                        device.bind_texture(0, draw.albedo);
                        device.set_uniform(handle, "uNormalMap", UniformValue::Int(1));
                        device.bind_texture(1, draw.normals);

                        draw_submesh(device, &draw);
                    }
                }
            }
        }

        device.use_program(None);
        Ok(())
    }

    fn draw_light_indicators(
        &self,
        device: &mut impl GraphicsDevice,
        scene: &Scene,
        assets: &mut AssetLibrary,
        library: &ProgramLibrary,
    ) -> RenderResult<()> {
        let indicators: Vec<(ModelId, _)> = scene
            .enabled_lights()
            .filter_map(|light| light.model.map(|model| (model, light)))
            .collect();
        if indicators.is_empty() {
            return Ok(());
        }

        let program = library.require(&self.programs.light)?;
        let handle = program.handle();
        device.use_program(Some(handle));
        device.set_uniform(handle, "view", UniformValue::Mat4(*self.camera.view()));
        device.set_uniform(handle, "projection", UniformValue::Mat4(*self.camera.projection()));

        for (model, light) in indicators {
            device.set_uniform(handle, "model", UniformValue::Mat4(light.transform_matrix()));
            device.set_uniform(handle, "lightColor", UniformValue::Vec3(light.color));
            device.set_uniform(handle, "intensity", UniformValue::Vec3(light.intensity));

            for submesh in 0..assets.submesh_count(model) {
                let draw = assets.submesh_draw(device, model, submesh, program)?;
                draw_submesh(device, &draw);
            }
        }

        device.use_program(None);
        Ok(())
    }

    /// Editor camera
    pub fn camera(&self) -> &EditorCamera {
        &self.camera
    }

    /// Editor camera, for the overlay's setters
    pub fn camera_mut(&mut self) -> &mut EditorCamera {
        &mut self.camera
    }

    /// Runtime render settings
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Runtime render settings, for the overlay's widgets
    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    /// Program names used by the passes
    pub fn programs(&self) -> &PipelinePrograms {
        &self.programs
    }

    /// Final image shown by the overlay
    ///
    /// `None` once a failed resize has released the presentation target.
    pub fn presentation(&self) -> Option<TextureHandle> {
        self.presentation.color_attachment(0)
    }

    /// Presentation render target
    pub fn presentation_target(&self) -> &RenderTarget {
        &self.presentation
    }

    /// Multi-attachment geometry target
    pub fn geometry(&self) -> &RenderTarget {
        &self.geometry
    }

    /// Bloom ping-pong buffers
    pub fn bloom(&self) -> &BloomPass {
        &self.bloom
    }

    /// Region of this frame's global parameters
    pub fn global_params(&self) -> FrameRegion {
        self.global_params
    }

    /// Uniform buffer holding the frame parameters
    pub fn staging(&self) -> &StagingBuffer {
        &self.staging
    }

    /// Alignment of every entity's parameter region
    pub fn uniform_alignment(&self) -> usize {
        self.uniform_alignment
    }

    /// Driver identification queried at startup
    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// Viewport size in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Release every target, the staging buffer and the quad
    pub fn destroy(self, device: &mut impl GraphicsDevice) {
        self.geometry.destroy(device);
        self.bloom.destroy(device);
        self.presentation.destroy(device);
        self.staging.destroy(device);
        self.quad.destroy(device);
        log::info!("Render pipeline released");
    }
}

fn draw_submesh(device: &mut impl GraphicsDevice, draw: &SubmeshDraw) {
    device.bind_vertex_array(Some(draw.vertex_array));
    device.draw_elements(draw.index_count, draw.index_offset);
    device.bind_vertex_array(None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::HeadlessDevice;
    use crate::render::device::FramebufferStatus;

    fn pipeline(device: &mut HeadlessDevice) -> RenderPipeline {
        let mut config = ApplicationConfig::default();
        config.window.width = 320;
        config.window.height = 240;
        RenderPipeline::new(device, &config, PipelinePrograms::default()).unwrap()
    }

    #[test]
    fn targets_match_window_size() {
        let mut device = HeadlessDevice::new();
        let pipeline = pipeline(&mut device);

        assert_eq!(pipeline.size(), (320, 240));
        assert_eq!(pipeline.geometry().color_attachments().len(), 5);
        assert_eq!(pipeline.presentation_target().formats(), &[PRESENTATION_FORMAT]);
        assert_eq!(pipeline.bloom().buffer(1).unwrap().size(), (320, 240));
        assert_eq!(pipeline.uniform_alignment(), 256);
        assert_eq!(pipeline.staging().capacity(), 65536);

        pipeline.destroy(&mut device);
        assert_eq!(device.live_object_count(), 0);
    }

    #[test]
    fn resize_waits_for_the_next_frame() {
        let mut device = HeadlessDevice::new();
        let mut pipeline = pipeline(&mut device);
        let mut scene = Scene::new();

        pipeline.request_resize(640, 480);
        assert!(pipeline.has_pending_resize());
        assert_eq!(pipeline.geometry().size(), (320, 240));

        pipeline.update(&mut device, &InputState::new(), 0.016, &mut scene).unwrap();

        assert!(!pipeline.has_pending_resize());
        assert_eq!(pipeline.size(), (640, 480));
        assert_eq!(pipeline.bloom().buffer(0).unwrap().size(), (640, 480));
        assert_eq!(pipeline.presentation_target().size(), (640, 480));
        assert!((pipeline.camera().aspect() - 640.0 / 480.0).abs() < 1e-6);

        pipeline.destroy(&mut device);
    }

    #[test]
    fn failed_resize_surfaces_as_error() {
        let mut device = HeadlessDevice::new();
        let mut pipeline = pipeline(&mut device);
        assert_eq!(pipeline.presentation(), pipeline.presentation_target().color_attachment(0));

        device.force_framebuffer_status(Some(FramebufferStatus::Unsupported));
        pipeline.request_resize(640, 480);
        let result = pipeline.update(&mut device, &InputState::new(), 0.016, &mut Scene::new());

        assert!(matches!(result, Err(RenderError::IncompleteFramebuffer { .. })));
        assert!(pipeline.geometry().color_attachment(0).is_none());
        // Geometry failed first, so the presentation target was left intact
        assert!(pipeline.presentation().is_some());
    }

    #[test]
    fn degenerate_resize_is_dropped() {
        let mut device = HeadlessDevice::new();
        let mut pipeline = pipeline(&mut device);
        let attachments = pipeline.geometry().color_attachments().to_vec();

        pipeline.request_resize(0, 480);
        pipeline.update(&mut device, &InputState::new(), 0.016, &mut Scene::new()).unwrap();

        assert_eq!(pipeline.geometry().color_attachments(), attachments.as_slice());
        assert_eq!(pipeline.size(), (320, 240));

        pipeline.destroy(&mut device);
    }

    #[test]
    fn update_without_lights_writes_header_only() {
        let mut device = HeadlessDevice::new();
        let mut pipeline = pipeline(&mut device);

        pipeline.update(&mut device, &InputState::new(), 0.016, &mut Scene::new()).unwrap();

        assert_eq!(pipeline.global_params(), FrameRegion { offset: 0, size: 16 });
        assert!(!device.is_buffer_mapped(pipeline.staging().handle()));

        pipeline.destroy(&mut device);
    }

    #[test]
    fn missing_composite_program_is_reported() {
        let mut device = HeadlessDevice::new();
        let mut pipeline = pipeline(&mut device);
        let mut assets = AssetLibrary::new(&mut device, ".").unwrap();
        let library = ProgramLibrary::new();

        let result = pipeline.render(&mut device, &Scene::new(), &mut assets, &library);

        assert!(matches!(result, Err(RenderError::MissingProgram(name)) if name == "BLOOM"));

        assets.destroy(&mut device);
        pipeline.destroy(&mut device);
    }
}
