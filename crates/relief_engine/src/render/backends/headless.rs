//! Headless graphics device
//!
//! An in-memory [`GraphicsDevice`] that allocates no GPU resources. It keeps
//! a table of every live object, emulates framebuffer completeness and
//! buffer mapping, and records the state-changing calls of each frame as a
//! [`Command`] log. The viewer runs on it when no windowing backend is
//! available, and the tests use it to observe exactly what the pipeline
//! submitted.

use std::collections::{BTreeMap, HashMap};
use std::ptr::NonNull;

use crate::foundation::math::Vec4;
use crate::render::device::{
    BufferHandle, BufferKind, BufferUsage, ClearFlags, DeviceInfo, DeviceLimits,
    FramebufferHandle, FramebufferStatus, GraphicsDevice, MappedMemory, ProgramHandle,
    TextureDesc, TextureHandle, UniformValue, VertexArrayDesc, VertexArrayHandle, VertexInput,
};
use crate::render::{RenderError, RenderResult};

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// [`GraphicsDevice::bind_framebuffer`]
    BindFramebuffer(Option<FramebufferHandle>),
    /// [`GraphicsDevice::set_viewport`]
    Viewport {
        /// Viewport width
        width: u32,
        /// Viewport height
        height: u32,
    },
    /// [`GraphicsDevice::clear`]
    Clear(ClearFlags),
    /// [`GraphicsDevice::set_depth_test`]
    DepthTest(bool),
    /// [`GraphicsDevice::set_blend`]
    Blend(bool),
    /// [`GraphicsDevice::use_program`]
    UseProgram(Option<ProgramHandle>),
    /// [`GraphicsDevice::set_uniform`]
    SetUniform {
        /// Target program
        program: ProgramHandle,
        /// Uniform name
        name: String,
        /// Assigned value
        value: UniformValue,
    },
    /// [`GraphicsDevice::bind_texture`]
    BindTexture {
        /// Sampler unit
        unit: u32,
        /// Bound texture
        texture: TextureHandle,
    },
    /// [`GraphicsDevice::bind_buffer_range`]
    BindBufferRange {
        /// Uniform block binding point
        binding: u32,
        /// Source buffer
        buffer: BufferHandle,
        /// Range start in bytes
        offset: usize,
        /// Range length in bytes
        size: usize,
    },
    /// [`GraphicsDevice::bind_vertex_array`]
    BindVertexArray(Option<VertexArrayHandle>),
    /// [`GraphicsDevice::draw_elements`]
    DrawElements {
        /// Index count
        count: u32,
        /// Byte offset into the index buffer
        offset: usize,
    },
    /// [`GraphicsDevice::draw_arrays`]
    DrawArrays {
        /// First vertex
        first: u32,
        /// Vertex count
        count: u32,
    },
}

#[derive(Debug, Default)]
struct FramebufferState {
    colors: BTreeMap<u32, TextureHandle>,
    depth: Option<TextureHandle>,
    draw_buffers: u32,
}

#[derive(Debug)]
struct BufferState {
    kind: BufferKind,
    usage: BufferUsage,
    data: Vec<u8>,
    mapped: bool,
}

#[derive(Debug)]
struct ProgramState {
    name: String,
    inputs: Vec<VertexInput>,
    uniforms: HashMap<String, UniformValue>,
}

/// In-memory tracking device
#[derive(Debug)]
pub struct HeadlessDevice {
    next_handle: u32,
    limits: DeviceLimits,
    info: DeviceInfo,

    textures: HashMap<TextureHandle, TextureDesc>,
    framebuffers: HashMap<FramebufferHandle, FramebufferState>,
    buffers: HashMap<BufferHandle, BufferState>,
    // Storage of buffers destroyed while mapped; freed on unmap
    retired_mappings: HashMap<BufferHandle, Vec<u8>>,
    programs: HashMap<ProgramHandle, ProgramState>,
    vertex_arrays: HashMap<VertexArrayHandle, VertexArrayDesc>,

    bound_framebuffer: Option<FramebufferHandle>,
    current_program: Option<ProgramHandle>,
    bound_vertex_array: Option<VertexArrayHandle>,
    texture_units: BTreeMap<u32, TextureHandle>,
    depth_test: bool,
    blend: bool,
    clear_color: Vec4,

    forced_status: Option<FramebufferStatus>,
    commands: Vec<Command>,
    validation_errors: Vec<String>,
}

impl Drop for HeadlessDevice {
    fn drop(&mut self) {
        // A mapping may outlive the device; its storage must too
        let still_mapped = self
            .buffers
            .drain()
            .filter(|(_, state)| state.mapped)
            .map(|(handle, state)| (handle, state.data))
            .chain(self.retired_mappings.drain());
        for (handle, data) in still_mapped {
            log::warn!("Buffer {:?} still mapped when the device was dropped; leaking its storage", handle);
            std::mem::forget(data);
        }
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Create a device with the limits of a typical desktop driver
    pub fn new() -> Self {
        Self::with_limits(DeviceLimits {
            max_uniform_block_size: 65536,
            uniform_buffer_offset_alignment: 256,
            max_color_attachments: 8,
        })
    }

    /// Create a device reporting the given limits
    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            next_handle: 1,
            limits,
            info: DeviceInfo {
                version: "4.3 (headless)".to_string(),
                renderer: "Headless tracking device".to_string(),
                vendor: "relief_engine".to_string(),
                shading_language_version: "4.30".to_string(),
                extensions: vec![
                    "GL_ARB_uniform_buffer_object".to_string(),
                    "GL_ARB_framebuffer_object".to_string(),
                    "GL_ARB_texture_float".to_string(),
                ],
            },
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            buffers: HashMap::new(),
            retired_mappings: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashMap::new(),
            bound_framebuffer: None,
            current_program: None,
            bound_vertex_array: None,
            texture_units: BTreeMap::new(),
            depth_test: false,
            blend: false,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            forced_status: None,
            commands: Vec::new(),
            validation_errors: Vec::new(),
        }
    }

    /// Make every completeness check report `status` (`None` restores emulation)
    pub fn force_framebuffer_status(&mut self, status: Option<FramebufferStatus>) {
        self.forced_status = status;
    }

    // === Inspection ===

    /// Whether a texture is currently allocated
    pub fn is_texture_live(&self, texture: TextureHandle) -> bool {
        self.textures.contains_key(&texture)
    }

    /// Whether a framebuffer is currently allocated
    pub fn is_framebuffer_live(&self, framebuffer: FramebufferHandle) -> bool {
        self.framebuffers.contains_key(&framebuffer)
    }

    /// Description of a live texture
    pub fn texture_desc(&self, texture: TextureHandle) -> Option<&TextureDesc> {
        self.textures.get(&texture)
    }

    /// Number of live textures
    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Number of live framebuffers
    pub fn live_framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    /// Number of live objects of every kind
    pub fn live_object_count(&self) -> usize {
        self.textures.len()
            + self.framebuffers.len()
            + self.buffers.len()
            + self.programs.len()
            + self.vertex_arrays.len()
    }

    /// Contents of a live buffer
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|state| state.data.as_slice())
    }

    /// Whether a buffer is currently mapped
    pub fn is_buffer_mapped(&self, buffer: BufferHandle) -> bool {
        self.buffers.get(&buffer).is_some_and(|state| state.mapped)
    }

    /// Kind and usage a buffer was created with
    pub fn buffer_tags(&self, buffer: BufferHandle) -> Option<(BufferKind, BufferUsage)> {
        self.buffers.get(&buffer).map(|state| (state.kind, state.usage))
    }

    /// Color attachments of a live framebuffer in attachment order
    pub fn framebuffer_colors(&self, framebuffer: FramebufferHandle) -> Vec<TextureHandle> {
        self.framebuffers
            .get(&framebuffer)
            .map(|state| state.colors.values().copied().collect())
            .unwrap_or_default()
    }

    /// Number of draw buffers declared on a live framebuffer
    pub fn draw_buffer_count(&self, framebuffer: FramebufferHandle) -> u32 {
        self.framebuffers.get(&framebuffer).map_or(0, |state| state.draw_buffers)
    }

    /// Currently bound framebuffer (`None` is the default framebuffer)
    pub fn bound_framebuffer(&self) -> Option<FramebufferHandle> {
        self.bound_framebuffer
    }

    /// Texture bound to a sampler unit
    pub fn bound_texture(&self, unit: u32) -> Option<TextureHandle> {
        self.texture_units.get(&unit).copied()
    }

    /// Program selected by the last `use_program`
    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    /// Whether depth testing is enabled
    pub fn depth_test_enabled(&self) -> bool {
        self.depth_test
    }

    /// Whether blending is enabled
    pub fn blend_enabled(&self) -> bool {
        self.blend
    }

    /// Last color passed to [`GraphicsDevice::set_clear_color`]
    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    /// Last value assigned to a uniform of a program
    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        self.programs.get(&program)?.uniforms.get(name).copied()
    }

    /// Name a program was created with
    pub fn program_name(&self, program: ProgramHandle) -> Option<&str> {
        self.programs.get(&program).map(|state| state.name.as_str())
    }

    /// Recorded calls since the last [`HeadlessDevice::take_commands`]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drain the recorded calls
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Misuse detected so far (misaligned ranges, draws without a program, ...)
    pub fn validation_errors(&self) -> &[String] {
        &self.validation_errors
    }

    fn allocate_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn report(&mut self, message: String) {
        log::warn!("Headless device validation: {}", message);
        self.validation_errors.push(message);
    }

    fn emulate_status(&self, framebuffer: FramebufferHandle) -> FramebufferStatus {
        let Some(state) = self.framebuffers.get(&framebuffer) else {
            return FramebufferStatus::Undefined;
        };

        if state.colors.is_empty() && state.depth.is_none() {
            return FramebufferStatus::MissingAttachment;
        }

        if state.colors.len() > self.limits.max_color_attachments as usize {
            return FramebufferStatus::Unsupported;
        }

        let mut extent = None;
        let attachments = state
            .colors
            .values()
            .map(|texture| (texture, false))
            .chain(state.depth.iter().map(|texture| (texture, true)));

        for (texture, is_depth_slot) in attachments {
            let Some(desc) = self.textures.get(texture) else {
                return FramebufferStatus::IncompleteAttachment;
            };
            if desc.format.is_depth() != is_depth_slot {
                return FramebufferStatus::IncompleteAttachment;
            }
            match extent {
                None => extent = Some((desc.width, desc.height)),
                Some(size) if size != (desc.width, desc.height) => {
                    return FramebufferStatus::IncompleteAttachment;
                }
                Some(_) => {}
            }
        }

        if (0..state.draw_buffers).any(|index| !state.colors.contains_key(&index)) {
            return FramebufferStatus::IncompleteDrawBuffer;
        }

        FramebufferStatus::Complete
    }
}

/// Extract `(location, components)` from `layout(location = N) in vecK name;`
fn parse_vertex_input(line: &str) -> Option<VertexInput> {
    let line = line.trim();
    if !line.starts_with("layout") {
        return None;
    }

    let open = line.find('(')?;
    let close = line.find(')')?;
    let qualifier = &line[open + 1..close];
    let location = qualifier
        .split(',')
        .filter_map(|part| part.split_once('='))
        .find(|(key, _)| key.trim() == "location")
        .and_then(|(_, value)| value.trim().parse().ok())?;

    let mut tokens = line[close + 1..].split_whitespace();
    if tokens.next()? != "in" {
        return None;
    }
    let components = match tokens.next()? {
        "float" => 1,
        "vec2" => 2,
        "vec3" => 3,
        "vec4" => 4,
        _ => return None,
    };

    Some(VertexInput { location, components })
}

impl GraphicsDevice for HeadlessDevice {
    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn create_texture(&mut self, desc: &TextureDesc, pixels: Option<&[u8]>) -> RenderResult<TextureHandle> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::ResourceCreationFailed(format!(
                "texture of {}x{} has no texels",
                desc.width, desc.height
            )));
        }

        if let Some(pixels) = pixels {
            let expected = desc.width as usize * desc.height as usize * desc.format.bytes_per_pixel();
            if pixels.len() != expected {
                return Err(RenderError::ResourceCreationFailed(format!(
                    "texture upload of {} bytes, expected {}",
                    pixels.len(),
                    expected
                )));
            }
        }

        let handle = TextureHandle(self.allocate_handle());
        self.textures.insert(handle, *desc);
        log::debug!("Created texture {:?} ({}x{} {:?})", handle, desc.width, desc.height, desc.format);
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_none() {
            self.report(format!("destroyed unknown texture {texture:?}"));
        }
        self.texture_units.retain(|_, bound| *bound != texture);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        if !self.textures.contains_key(&texture) {
            self.report(format!("bound unknown texture {texture:?} to unit {unit}"));
        }
        self.texture_units.insert(unit, texture);
        self.commands.push(Command::BindTexture { unit, texture });
    }

    fn create_framebuffer(&mut self) -> RenderResult<FramebufferHandle> {
        let handle = FramebufferHandle(self.allocate_handle());
        self.framebuffers.insert(handle, FramebufferState::default());
        log::debug!("Created framebuffer {:?}", handle);
        Ok(handle)
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if self.framebuffers.remove(&framebuffer).is_none() {
            self.report(format!("destroyed unknown framebuffer {framebuffer:?}"));
        }
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
    }

    fn attach_color(&mut self, framebuffer: FramebufferHandle, index: u32, texture: TextureHandle) {
        match self.framebuffers.get_mut(&framebuffer) {
            Some(state) => {
                state.colors.insert(index, texture);
            }
            None => self.report(format!("attached color to unknown framebuffer {framebuffer:?}")),
        }
    }

    fn attach_depth(&mut self, framebuffer: FramebufferHandle, texture: TextureHandle) {
        match self.framebuffers.get_mut(&framebuffer) {
            Some(state) => state.depth = Some(texture),
            None => self.report(format!("attached depth to unknown framebuffer {framebuffer:?}")),
        }
    }

    fn set_draw_buffers(&mut self, framebuffer: FramebufferHandle, count: u32) {
        match self.framebuffers.get_mut(&framebuffer) {
            Some(state) => state.draw_buffers = count,
            None => self.report(format!("set draw buffers on unknown framebuffer {framebuffer:?}")),
        }
    }

    fn framebuffer_status(&self, framebuffer: FramebufferHandle) -> FramebufferStatus {
        self.forced_status.unwrap_or_else(|| self.emulate_status(framebuffer))
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        if let Some(handle) = framebuffer {
            if !self.framebuffers.contains_key(&handle) {
                self.report(format!("bound unknown framebuffer {handle:?}"));
            }
        }
        self.bound_framebuffer = framebuffer;
        self.commands.push(Command::BindFramebuffer(framebuffer));
    }

    fn create_buffer(
        &mut self,
        kind: BufferKind,
        usage: BufferUsage,
        size: usize,
        data: Option<&[u8]>,
    ) -> RenderResult<BufferHandle> {
        if size == 0 {
            return Err(RenderError::ResourceCreationFailed("buffer of zero bytes".to_string()));
        }

        let mut contents = vec![0u8; size];
        if let Some(data) = data {
            if data.len() > size {
                return Err(RenderError::ResourceCreationFailed(format!(
                    "{} bytes of initial data do not fit a {} byte buffer",
                    data.len(),
                    size
                )));
            }
            contents[..data.len()].copy_from_slice(data);
        }

        let handle = BufferHandle(self.allocate_handle());
        self.buffers.insert(
            handle,
            BufferState {
                kind,
                usage,
                data: contents,
                mapped: false,
            },
        );
        log::debug!("Created {:?} buffer {:?} of {} bytes", kind, handle, size);
        Ok(handle)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        match self.buffers.remove(&buffer) {
            Some(state) if state.mapped => {
                self.report(format!("destroyed buffer {buffer:?} while it was mapped"));
                self.retired_mappings.insert(buffer, state.data);
            }
            Some(_) => {}
            None => self.report(format!("destroyed unknown buffer {buffer:?}")),
        }
    }

    fn map_buffer(&mut self, buffer: BufferHandle) -> RenderResult<MappedMemory> {
        let state = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| RenderError::BackendError(format!("mapping unknown buffer {buffer:?}")))?;

        if state.mapped {
            return Err(RenderError::BackendError(format!("buffer {buffer:?} is already mapped")));
        }

        let ptr = NonNull::new(state.data.as_mut_ptr())
            .ok_or_else(|| RenderError::BackendError(format!("buffer {buffer:?} has no storage")))?;
        state.mapped = true;

        // SAFETY: the storage vector is never resized while the buffer lives,
        // and the buffer stays exclusively mapped until `unmap_buffer`.
        Ok(unsafe { MappedMemory::from_raw(ptr, state.data.len()) })
    }

    fn unmap_buffer(&mut self, buffer: BufferHandle) {
        match self.buffers.get_mut(&buffer) {
            Some(state) if state.mapped => state.mapped = false,
            Some(_) => self.report(format!("unmapped buffer {buffer:?} that was not mapped")),
            None => {
                if self.retired_mappings.remove(&buffer).is_none() {
                    self.report(format!("unmapped unknown buffer {buffer:?}"));
                }
            }
        }
    }

    fn bind_buffer_range(&mut self, binding: u32, buffer: BufferHandle, offset: usize, size: usize) {
        let alignment = self.limits.uniform_buffer_offset_alignment;
        let mut problems = Vec::new();

        match self.buffers.get(&buffer) {
            Some(state) => {
                if offset % alignment != 0 {
                    problems.push(format!("range offset {offset} is not a multiple of {alignment}"));
                }
                if offset + size > state.data.len() {
                    problems.push(format!(
                        "range {}..{} exceeds buffer of {} bytes",
                        offset,
                        offset + size,
                        state.data.len()
                    ));
                }
                if state.mapped {
                    problems.push(format!("bound range of mapped buffer {buffer:?}"));
                }
            }
            None => problems.push(format!("bound range of unknown buffer {buffer:?}")),
        }

        for problem in problems {
            self.report(problem);
        }
        self.commands.push(Command::BindBufferRange { binding, buffer, offset, size });
    }

    fn create_program(&mut self, name: &str, vertex_source: &str, fragment_source: &str) -> RenderResult<ProgramHandle> {
        if vertex_source.trim().is_empty() || fragment_source.trim().is_empty() {
            return Err(RenderError::ResourceCreationFailed(format!(
                "program {name} has an empty shader stage"
            )));
        }

        let mut inputs: Vec<VertexInput> = vertex_source.lines().filter_map(parse_vertex_input).collect();
        inputs.sort_by_key(|input| input.location);
        inputs.dedup_by_key(|input| input.location);

        let handle = ProgramHandle(self.allocate_handle());
        log::debug!("Linked program {} as {:?} with {} vertex inputs", name, handle, inputs.len());
        self.programs.insert(
            handle,
            ProgramState {
                name: name.to_string(),
                inputs,
                uniforms: HashMap::new(),
            },
        );
        Ok(handle)
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program).is_none() {
            self.report(format!("destroyed unknown program {program:?}"));
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn program_inputs(&self, program: ProgramHandle) -> Vec<VertexInput> {
        self.programs
            .get(&program)
            .map(|state| state.inputs.clone())
            .unwrap_or_default()
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.current_program = program;
        self.commands.push(Command::UseProgram(program));
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) {
        match self.programs.get_mut(&program) {
            Some(state) => {
                state.uniforms.insert(name.to_string(), value);
            }
            None => self.report(format!("set uniform {name} on unknown program {program:?}")),
        }
        self.commands.push(Command::SetUniform {
            program,
            name: name.to_string(),
            value,
        });
    }

    fn create_vertex_array(&mut self, desc: &VertexArrayDesc) -> RenderResult<VertexArrayHandle> {
        if !self.buffers.contains_key(&desc.vertex_buffer) {
            return Err(RenderError::ResourceCreationFailed(format!(
                "vertex array sources unknown buffer {:?}",
                desc.vertex_buffer
            )));
        }

        let handle = VertexArrayHandle(self.allocate_handle());
        self.vertex_arrays.insert(handle, desc.clone());
        log::debug!("Created vertex array {:?} with {} attributes", handle, desc.attributes.len());
        Ok(handle)
    }

    fn destroy_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if self.vertex_arrays.remove(&vertex_array).is_none() {
            self.report(format!("destroyed unknown vertex array {vertex_array:?}"));
        }
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        self.bound_vertex_array = vertex_array;
        self.commands.push(Command::BindVertexArray(vertex_array));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.commands.push(Command::Viewport { width, height });
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.commands.push(Command::Clear(flags));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        self.commands.push(Command::DepthTest(enabled));
    }

    fn set_blend(&mut self, enabled: bool) {
        self.blend = enabled;
        self.commands.push(Command::Blend(enabled));
    }

    fn draw_elements(&mut self, count: u32, offset: usize) {
        if self.current_program.is_none() {
            self.report("draw_elements without a program".to_string());
        }
        if self.bound_vertex_array.is_none() {
            self.report("draw_elements without a vertex array".to_string());
        }
        self.commands.push(Command::DrawElements { count, offset });
    }

    fn draw_arrays(&mut self, first: u32, count: u32) {
        if self.current_program.is_none() {
            self.report("draw_arrays without a program".to_string());
        }
        if self.bound_vertex_array.is_none() {
            self.report("draw_arrays without a vertex array".to_string());
        }
        self.commands.push(Command::DrawArrays { first, count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::TextureFormat;

    #[test]
    fn handles_are_non_zero_and_unique() {
        let mut device = HeadlessDevice::new();
        let desc = TextureDesc::attachment(4, 4, TextureFormat::Rgba8);

        let first = device.create_texture(&desc, None).unwrap();
        let second = device.create_texture(&desc, None).unwrap();
        let framebuffer = device.create_framebuffer().unwrap();

        assert_ne!(first.0, 0);
        assert_ne!(first, second);
        assert_ne!(framebuffer.0, first.0);
        assert_ne!(framebuffer.0, second.0);
    }

    #[test]
    fn empty_framebuffer_is_missing_attachments() {
        let mut device = HeadlessDevice::new();
        let framebuffer = device.create_framebuffer().unwrap();

        assert_eq!(device.framebuffer_status(framebuffer), FramebufferStatus::MissingAttachment);
        assert_eq!(
            device.framebuffer_status(FramebufferHandle(9999)),
            FramebufferStatus::Undefined
        );
    }

    #[test]
    fn mismatched_attachment_sizes_are_incomplete() {
        let mut device = HeadlessDevice::new();
        let framebuffer = device.create_framebuffer().unwrap();
        let color = device
            .create_texture(&TextureDesc::attachment(64, 64, TextureFormat::Rgba16F), None)
            .unwrap();
        let depth = device
            .create_texture(&TextureDesc::attachment(32, 32, TextureFormat::Depth24), None)
            .unwrap();

        device.attach_color(framebuffer, 0, color);
        device.attach_depth(framebuffer, depth);
        device.set_draw_buffers(framebuffer, 1);

        assert_eq!(device.framebuffer_status(framebuffer), FramebufferStatus::IncompleteAttachment);
    }

    #[test]
    fn draw_buffers_beyond_attachments_are_incomplete() {
        let mut device = HeadlessDevice::new();
        let framebuffer = device.create_framebuffer().unwrap();
        let color = device
            .create_texture(&TextureDesc::attachment(16, 16, TextureFormat::Rgba8), None)
            .unwrap();

        device.attach_color(framebuffer, 0, color);
        device.set_draw_buffers(framebuffer, 2);

        assert_eq!(device.framebuffer_status(framebuffer), FramebufferStatus::IncompleteDrawBuffer);

        device.set_draw_buffers(framebuffer, 1);
        assert_eq!(device.framebuffer_status(framebuffer), FramebufferStatus::Complete);
    }

    #[test]
    fn mapped_writes_land_in_buffer_contents() {
        let mut device = HeadlessDevice::new();
        let buffer = device
            .create_buffer(BufferKind::Uniform, BufferUsage::Stream, 16, None)
            .unwrap();

        let mut mapped = device.map_buffer(buffer).unwrap();
        mapped.write(4, &[1, 2, 3, 4]);
        assert!(device.map_buffer(buffer).is_err());
        device.unmap_buffer(buffer);

        assert_eq!(&device.buffer_contents(buffer).unwrap()[4..8], &[1, 2, 3, 4]);
        assert!(!device.is_buffer_mapped(buffer));
    }

    #[test]
    fn destroying_a_mapped_buffer_keeps_its_storage_until_unmap() {
        let mut device = HeadlessDevice::new();
        let buffer = device
            .create_buffer(BufferKind::Uniform, BufferUsage::Stream, 64, None)
            .unwrap();

        let mut mapped = device.map_buffer(buffer).unwrap();
        device.destroy_buffer(buffer);
        assert_eq!(device.validation_errors().len(), 1);
        assert_eq!(device.live_object_count(), 0);

        let other = device
            .create_buffer(BufferKind::Uniform, BufferUsage::Stream, 64, None)
            .unwrap();
        mapped.write(0, &[0xAB; 64]);
        assert_eq!(device.buffer_contents(other).unwrap(), &[0u8; 64][..]);

        device.unmap_buffer(buffer);
        assert_eq!(device.validation_errors().len(), 1);

        device.unmap_buffer(buffer);
        assert_eq!(device.validation_errors().len(), 2);
    }

    #[test]
    fn mapping_may_outlive_the_device() {
        let mut device = HeadlessDevice::new();
        let buffer = device
            .create_buffer(BufferKind::Uniform, BufferUsage::Stream, 32, None)
            .unwrap();

        let mut mapped = device.map_buffer(buffer).unwrap();
        drop(device);
        mapped.write(0, &[1; 32]);
        assert_eq!(mapped.len(), 32);
    }

    #[test]
    fn program_inputs_are_parsed_from_vertex_source() {
        let mut device = HeadlessDevice::new();
        let vertex = "layout(location = 1) in vec3 aNormal;\n\
                      layout(location = 0) in vec3 aPosition;\n\
                      layout(location=2) in vec2 aTexCoord;\n\
                      out vec2 vTexCoord;";

        let program = device.create_program("MESH", vertex, "void main() {}").unwrap();

        assert_eq!(
            device.program_inputs(program),
            vec![
                VertexInput { location: 0, components: 3 },
                VertexInput { location: 1, components: 3 },
                VertexInput { location: 2, components: 2 },
            ]
        );
    }

    #[test]
    fn misaligned_range_is_reported() {
        let mut device = HeadlessDevice::new();
        let buffer = device
            .create_buffer(BufferKind::Uniform, BufferUsage::Stream, 1024, None)
            .unwrap();

        device.bind_buffer_range(1, buffer, 256, 192);
        assert!(device.validation_errors().is_empty());

        device.bind_buffer_range(1, buffer, 100, 64);
        assert_eq!(device.validation_errors().len(), 1);
    }
}
