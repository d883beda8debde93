//! Full-screen quad used by the post-process passes

use crate::render::device::{
    BufferHandle, BufferKind, BufferUsage, GraphicsDevice, VertexArrayDesc, VertexArrayHandle,
    VertexAttribute,
};
use crate::render::RenderResult;

/// Two triangles covering clip space, `x, y, u, v` per vertex
#[rustfmt::skip]
pub const QUAD_VERTICES: [f32; 24] = [
    -1.0,  1.0,  0.0, 1.0,
    -1.0, -1.0,  0.0, 0.0,
     1.0, -1.0,  1.0, 0.0,

    -1.0,  1.0,  0.0, 1.0,
     1.0, -1.0,  1.0, 0.0,
     1.0,  1.0,  1.0, 1.0,
];

const VERTEX_COUNT: u32 = 6;
const STRIDE: usize = 4 * std::mem::size_of::<f32>();

/// Static vertex buffer and vertex array of the screen quad
#[derive(Debug)]
pub struct FullscreenQuad {
    vertex_buffer: BufferHandle,
    vertex_array: VertexArrayHandle,
}

impl FullscreenQuad {
    /// Upload the quad; position at location 0, texture coordinates at location 1
    ///
    /// # Errors
    ///
    /// Returns the device error when the buffer or vertex array cannot be created.
    pub fn new(device: &mut impl GraphicsDevice) -> RenderResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(&QUAD_VERTICES);
        let vertex_buffer = device.create_buffer(BufferKind::Vertex, BufferUsage::Static, bytes.len(), Some(bytes))?;

        let desc = VertexArrayDesc {
            vertex_buffer,
            index_buffer: None,
            stride: STRIDE,
            attributes: vec![
                VertexAttribute { location: 0, components: 2, offset: 0 },
                VertexAttribute { location: 1, components: 2, offset: 2 * std::mem::size_of::<f32>() },
            ],
        };
        let vertex_array = match device.create_vertex_array(&desc) {
            Ok(vertex_array) => vertex_array,
            Err(e) => {
                device.destroy_buffer(vertex_buffer);
                return Err(e);
            }
        };

        Ok(Self { vertex_buffer, vertex_array })
    }

    /// Draw the quad with whatever program is current
    pub fn draw(&self, device: &mut impl GraphicsDevice) {
        device.bind_vertex_array(Some(self.vertex_array));
        device.draw_arrays(0, VERTEX_COUNT);
        device.bind_vertex_array(None);
    }

    /// Release the buffer and vertex array
    pub fn destroy(self, device: &mut impl GraphicsDevice) {
        device.destroy_vertex_array(self.vertex_array);
        device.destroy_buffer(self.vertex_buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::{Command, HeadlessDevice};

    #[test]
    fn quad_covers_clip_space() {
        let xs = QUAD_VERTICES.chunks_exact(4).map(|v| v[0]);
        let ys = QUAD_VERTICES.chunks_exact(4).map(|v| v[1]);

        assert_eq!(xs.clone().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(xs.fold(f32::MIN, f32::max), 1.0);
        assert_eq!(ys.clone().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(ys.fold(f32::MIN, f32::max), 1.0);
    }

    #[test]
    fn draw_issues_six_vertices() {
        let mut device = HeadlessDevice::new();
        let quad = FullscreenQuad::new(&mut device).unwrap();
        let program = device.create_program("QUAD", "void main() {}", "void main() {}").unwrap();
        device.use_program(Some(program));
        device.take_commands();

        quad.draw(&mut device);

        let commands = device.take_commands();
        assert!(commands.contains(&Command::DrawArrays { first: 0, count: 6 }));
        assert_eq!(commands.last(), Some(&Command::BindVertexArray(None)));
        assert!(device.validation_errors().is_empty());

        quad.destroy(&mut device);
        device.destroy_program(program);
        assert_eq!(device.live_object_count(), 0);
    }
}
