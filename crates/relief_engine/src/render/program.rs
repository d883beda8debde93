//! Shader programs
//!
//! Programs are written as a single GLSL file holding both stages. The
//! library compiles the file twice, prefixing a version directive, a define
//! with the program name and a define selecting the stage, so the source
//! selects the active stage with `#ifdef VERTEX` / `#ifdef FRAGMENT`.

use std::collections::HashMap;

use crate::render::device::{GraphicsDevice, ProgramHandle, VertexInput};
use crate::render::{RenderError, RenderResult};

const GLSL_VERSION: &str = "#version 430";

/// A linked program and the vertex inputs it reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    name: String,
    handle: ProgramHandle,
    vertex_inputs: Vec<VertexInput>,
}

impl Program {
    /// Wrap an already linked program
    pub fn new(name: impl Into<String>, handle: ProgramHandle, vertex_inputs: Vec<VertexInput>) -> Self {
        Self {
            name: name.into(),
            handle,
            vertex_inputs,
        }
    }

    /// Program name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device handle
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Active vertex attributes, sorted by location
    pub fn vertex_inputs(&self) -> &[VertexInput] {
        &self.vertex_inputs
    }
}

/// Source of one stage of a single-file program
pub fn stage_source(name: &str, stage: &str, source: &str) -> String {
    format!("{GLSL_VERSION}\n#define {name}\n#define {stage}\n{source}")
}

/// Programs addressed by name
#[derive(Debug, Default)]
pub struct ProgramLibrary {
    programs: HashMap<String, Program>,
}

impl ProgramLibrary {
    /// Empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and link a single-file program under `name`
    ///
    /// Loading a name again replaces the previous program and releases it.
    ///
    /// # Errors
    ///
    /// Returns the device error when compilation or linking fails; the
    /// previous program of that name is kept in that case.
    pub fn load(&mut self, device: &mut impl GraphicsDevice, name: &str, source: &str) -> RenderResult<&Program> {
        let vertex = stage_source(name, "VERTEX", source);
        let fragment = stage_source(name, "FRAGMENT", source);

        let handle = device.create_program(name, &vertex, &fragment).map_err(|e| {
            log::error!("Program {} failed to build: {}", name, e);
            e
        })?;
        let program = Program::new(name, handle, device.program_inputs(handle));
        log::info!("Loaded program {} with {} vertex inputs", name, program.vertex_inputs.len());

        if let Some(previous) = self.programs.insert(name.to_string(), program) {
            device.destroy_program(previous.handle);
        }
        self.require(name)
    }

    /// Program by name
    pub fn get(&self, name: &str) -> Option<&Program> {
        self.programs.get(name)
    }

    /// Program by name, failing when it was never loaded
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingProgram`].
    pub fn require(&self, name: &str) -> RenderResult<&Program> {
        self.get(name).ok_or_else(|| RenderError::MissingProgram(name.to_string()))
    }

    /// Program by device handle
    pub fn by_handle(&self, handle: ProgramHandle) -> Option<&Program> {
        self.programs.values().find(|program| program.handle == handle)
    }

    /// Number of loaded programs
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether no program is loaded
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Release every program
    pub fn destroy(&mut self, device: &mut impl GraphicsDevice) {
        for (_, program) in self.programs.drain() {
            device.destroy_program(program.handle);
        }
    }
}
