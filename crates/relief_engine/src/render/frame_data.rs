//! Per-frame shader parameters
//!
//! Two kinds of records are appended to the staging buffer every frame.
//!
//! The global block, bound at binding 0 for every geometry draw:
//!
//! ```text
//! layout(binding = 0, std140) uniform GlobalParams {
//!     vec3 viewPos;
//!     uint lightCount;
//!     Light lights[];   // type, color, direction, position, intensity
//! };
//! ```
//!
//! And one local block per entity, bound at binding 1 for that entity's
//! draws. Its start is aligned to the device's uniform buffer offset
//! alignment so the range can be bound on its own:
//!
//! ```text
//! layout(binding = 1, std140) uniform LocalParams {
//!     mat4 world;
//!     mat4 modelViewProjection;
//!     mat4 view;
//! };
//! ```

use crate::foundation::math::{Mat4, Vec3};
use crate::render::staging::{FrameRegion, StagingBuffer, VEC4_ALIGNMENT};
use crate::scene::{Entity, Light};

/// Uniform block binding of the global parameters
pub const GLOBAL_PARAMS_BINDING: u32 = 0;

/// Uniform block binding of the per-entity parameters
pub const LOCAL_PARAMS_BINDING: u32 = 1;

/// Append the global block: camera position, the number of enabled lights
/// and one record per enabled light
///
/// # Panics
///
/// Panics if the staging buffer is unmapped or too small.
pub fn write_global_params<'a>(
    staging: &mut StagingBuffer,
    camera_position: &Vec3,
    lights: impl IntoIterator<Item = &'a Light>,
) -> FrameRegion {
    let enabled: Vec<&Light> = lights.into_iter().filter(|light| light.enabled).collect();
    let light_count = u32::try_from(enabled.len()).unwrap_or(u32::MAX);

    let offset = staging.push_vec3(camera_position);
    staging.push_u32(light_count);

    for light in enabled {
        staging.align_cursor(VEC4_ALIGNMENT);
        staging.push_u32(light.light_type.index());
        staging.push_vec3(&light.color);
        staging.push_vec3(&light.direction);
        staging.push_vec3(&light.position);
        staging.push_vec3(&light.intensity);
    }

    let region = staging.region_since(offset);
    log::trace!("Global params: {} lights in {:?}", light_count, region);
    region
}

/// Append one local block per entity and record its region on the entity
///
/// # Panics
///
/// Panics if the staging buffer is unmapped or too small, or if
/// `alignment` is not a power of two.
pub fn write_entity_params(
    staging: &mut StagingBuffer,
    entities: &mut [Entity],
    view: &Mat4,
    view_projection: &Mat4,
    alignment: usize,
) {
    for entity in entities {
        staging.align_cursor(alignment);
        let offset = staging.head();

        let world = entity.transform_matrix();
        staging.push_mat4(&world);
        staging.push_mat4(&(view_projection * world));
        staging.push_mat4(view);

        entity.local_params = staging.region_since(offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ModelId;
    use crate::render::backends::HeadlessDevice;
    use crate::render::device::{BufferKind, BufferUsage};

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn read_f32(bytes: &[u8], offset: usize) -> f32 {
        f32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn two_lights() -> Vec<Light> {
        vec![
            Light::directional(Vec3::new(-10.0, 5.0, 0.0), Vec3::new(-1.0, 1.0, 1.0), Vec3::repeat(0.65)),
            Light::point(Vec3::new(9.0, 0.0, 2.0), Vec3::new(0.0, 0.0, 1.0)).with_intensity(2.0),
        ]
    }

    #[test]
    fn global_block_follows_std140() {
        let mut device = HeadlessDevice::new();
        let mut staging = StagingBuffer::new(&mut device, BufferKind::Uniform, BufferUsage::Stream, 1024).unwrap();

        staging.map(&mut device).unwrap();
        let region = write_global_params(&mut staging, &Vec3::new(1.0, 2.0, 3.0), &two_lights());
        staging.unmap(&mut device);

        assert_eq!(region, FrameRegion { offset: 0, size: 172 });

        let bytes = device.buffer_contents(staging.handle()).unwrap();
        assert_eq!(read_f32(bytes, 8), 3.0);
        assert_eq!(read_u32(bytes, 12), 2);
        // First light record
        assert_eq!(read_u32(bytes, 16), 0);
        assert_eq!(read_f32(bytes, 32), 0.65);
        assert_eq!(read_f32(bytes, 48), -1.0);
        // Second light record starts on the next 16-byte boundary after 92
        assert_eq!(read_u32(bytes, 96), 1);
        assert_eq!(read_f32(bytes, 160), 2.0);

        staging.destroy(&mut device);
    }

    #[test]
    fn disabled_lights_are_not_written() {
        let mut device = HeadlessDevice::new();
        let mut staging = StagingBuffer::new(&mut device, BufferKind::Uniform, BufferUsage::Stream, 1024).unwrap();
        let mut lights = two_lights();
        lights[0].enabled = false;

        staging.map(&mut device).unwrap();
        let region = write_global_params(&mut staging, &Vec3::zeros(), &lights);
        staging.unmap(&mut device);

        let bytes = device.buffer_contents(staging.handle()).unwrap();
        assert_eq!(read_u32(bytes, 12), 1);
        assert_eq!(read_u32(bytes, 16), 1);
        assert_eq!(region.size, 92);

        staging.destroy(&mut device);
    }

    #[test]
    fn entity_blocks_start_on_the_offset_alignment() {
        let mut device = HeadlessDevice::new();
        let mut staging = StagingBuffer::new(&mut device, BufferKind::Uniform, BufferUsage::Stream, 2048).unwrap();
        let mut entities = vec![
            Entity::new(ModelId(0), Vec3::new(9.0, 0.0, 0.0)),
            Entity::new(ModelId(0), Vec3::new(-9.0, 0.0, 0.0)),
        ];
        let view = Mat4::new_translation(&Vec3::new(0.0, 0.0, -5.0));
        let view_projection = Mat4::new_scaling(2.0) * view;

        staging.map(&mut device).unwrap();
        let global = write_global_params(&mut staging, &Vec3::zeros(), &two_lights());
        write_entity_params(&mut staging, &mut entities, &view, &view_projection, 256);
        staging.unmap(&mut device);

        let first = entities[0].local_params;
        let second = entities[1].local_params;
        assert_eq!(first, FrameRegion { offset: 256, size: 192 });
        assert!(first.offset >= global.end());
        assert_eq!(second.offset % 256, 0);
        assert!(second.offset >= first.end());

        // World translation x sits in column 3 of the first matrix
        let bytes = device.buffer_contents(staging.handle()).unwrap();
        assert_eq!(read_f32(bytes, first.offset + 48), 9.0);
        assert_eq!(read_f32(bytes, second.offset + 48), -9.0);
        // MVP translation x is scaled by the projection
        assert_eq!(read_f32(bytes, first.offset + 64 + 48), 18.0);

        staging.destroy(&mut device);
    }
}
