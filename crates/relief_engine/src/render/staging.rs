//! Uniform staging buffer
//!
//! A linear, alignment-aware writer over a mapped buffer object. Each frame
//! the buffer is mapped once, the global and per-entity parameter blocks are
//! appended one after the other, and the buffer is unmapped before any draw
//! binds a range of it.
//!
//! Vectors and matrices are always written at 16-byte alignment, the std140
//! rule for `vec3`, `vec4` and matrix columns. Every shader consuming the
//! buffer declares its blocks with `layout(binding = N, std140)`.
//!
//! Misuse (writing while unmapped, mapping twice, a non-power-of-two
//! alignment, running past the capacity) is a programming error and panics
//! at the point of detection.

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::device::{BufferHandle, BufferKind, BufferUsage, GraphicsDevice, MappedMemory};
use crate::render::RenderResult;

/// Alignment of `vec3`, `vec4` and matrix columns inside a uniform block
pub const VEC4_ALIGNMENT: usize = 16;

/// Alignment of 4-byte scalars inside a uniform block
pub const SCALAR_ALIGNMENT: usize = 4;

/// Whether `value` is a non-zero power of two
pub fn is_power_of_two(value: usize) -> bool {
    value != 0 && value & (value - 1) == 0
}

/// Round `value` up to the next multiple of the power-of-two `alignment`
///
/// Returns `None` when the result does not fit in `usize`.
pub fn align(value: usize, alignment: usize) -> Option<usize> {
    value
        .checked_add(alignment - 1)
        .map(|padded| padded & !(alignment - 1))
}

/// Byte range of one logical record inside the staging buffer
///
/// Only meaningful for the frame it was written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameRegion {
    /// Offset of the first byte
    pub offset: usize,
    /// Length in bytes
    pub size: usize,
}

impl FrameRegion {
    /// One past the last byte of the region
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Fixed-capacity buffer written through a moving cursor
pub struct StagingBuffer {
    buffer: BufferHandle,
    kind: BufferKind,
    usage: BufferUsage,
    capacity: usize,
    head: usize,
    mapping: Option<MappedMemory>,
    released: bool,
}

impl StagingBuffer {
    /// Allocate a buffer of `capacity` bytes
    ///
    /// # Errors
    ///
    /// Returns the device's error when the buffer cannot be created.
    pub fn new(
        device: &mut impl GraphicsDevice,
        kind: BufferKind,
        usage: BufferUsage,
        capacity: usize,
    ) -> RenderResult<Self> {
        let buffer = device.create_buffer(kind, usage, capacity, None)?;
        log::debug!("Created {:?} staging buffer {:?} of {} bytes", kind, buffer, capacity);

        Ok(Self {
            buffer,
            kind,
            usage,
            capacity,
            head: 0,
            mapping: None,
            released: false,
        })
    }

    /// Begin a write session and reset the cursor to zero
    ///
    /// # Panics
    ///
    /// Panics if the buffer is already mapped.
    ///
    /// # Errors
    ///
    /// Returns the device's error when the mapping fails.
    pub fn map(&mut self, device: &mut impl GraphicsDevice) -> RenderResult<()> {
        assert!(self.mapping.is_none(), "The buffer is already mapped");

        self.mapping = Some(device.map_buffer(self.buffer)?);
        self.head = 0;
        Ok(())
    }

    /// End the write session
    ///
    /// The cursor keeps marking the end of the written data until the next
    /// [`StagingBuffer::map`].
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not mapped.
    pub fn unmap(&mut self, device: &mut impl GraphicsDevice) {
        assert!(self.mapping.take().is_some(), "The buffer must be mapped first");
        device.unmap_buffer(self.buffer);
    }

    /// Advance the cursor to the next multiple of `alignment`
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two or the aligned cursor
    /// falls outside the buffer.
    pub fn align_cursor(&mut self, alignment: usize) {
        assert!(is_power_of_two(alignment), "The alignment must be a power of 2");

        let aligned = align(self.head, alignment).filter(|&aligned| aligned <= self.capacity);
        let Some(aligned) = aligned else {
            panic!(
                "Aligning {} to {} moves the cursor past the capacity of {} bytes",
                self.head, alignment, self.capacity
            );
        };
        self.head = aligned;
    }

    /// Align the cursor, copy `bytes` and advance past them
    ///
    /// Returns the offset the bytes were written at.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not mapped, if `alignment` is not a power of
    /// two, or if the write would run past the capacity.
    pub fn write(&mut self, bytes: &[u8], alignment: usize) -> usize {
        assert!(self.mapping.is_some(), "The buffer must be mapped first");
        self.align_cursor(alignment);

        let offset = self.head;
        let end = offset + bytes.len();
        assert!(
            end <= self.capacity,
            "Writing {} bytes at {} overflows the staging buffer of {} bytes",
            bytes.len(),
            offset,
            self.capacity
        );

        if let Some(mapping) = self.mapping.as_mut() {
            mapping.write(offset, bytes);
        }
        self.head = end;
        offset
    }

    /// Write a `uint`
    pub fn push_u32(&mut self, value: u32) -> usize {
        self.write(bytemuck::bytes_of(&value), SCALAR_ALIGNMENT)
    }

    /// Write a `float`
    pub fn push_f32(&mut self, value: f32) -> usize {
        self.write(bytemuck::bytes_of(&value), SCALAR_ALIGNMENT)
    }

    /// Write a `vec3` (12 bytes at 16-byte alignment)
    pub fn push_vec3(&mut self, value: &Vec3) -> usize {
        self.write(bytemuck::cast_slice(value.as_slice()), VEC4_ALIGNMENT)
    }

    /// Write a `vec4`
    pub fn push_vec4(&mut self, value: &Vec4) -> usize {
        self.write(bytemuck::cast_slice(value.as_slice()), VEC4_ALIGNMENT)
    }

    /// Write a column-major `mat4`
    pub fn push_mat4(&mut self, value: &Mat4) -> usize {
        self.write(bytemuck::cast_slice(value.as_slice()), VEC4_ALIGNMENT)
    }

    /// Region from `offset` up to the current cursor
    pub fn region_since(&self, offset: usize) -> FrameRegion {
        FrameRegion {
            offset,
            size: self.head.saturating_sub(offset),
        }
    }

    /// Current cursor position
    pub fn head(&self) -> usize {
        self.head
    }

    /// Total size in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether a write session is open
    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    /// The underlying buffer object
    pub fn handle(&self) -> BufferHandle {
        self.buffer
    }

    /// Kind the buffer was created as
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Usage hint the buffer was created with
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Release the buffer object, closing an open write session first
    pub fn destroy(mut self, device: &mut impl GraphicsDevice) {
        if self.mapping.take().is_some() {
            device.unmap_buffer(self.buffer);
        }
        device.destroy_buffer(self.buffer);
        self.released = true;
    }
}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("Staging buffer {:?} dropped without destroy()", self.buffer);
        }
    }
}
