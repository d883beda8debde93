//! Built-in meshes
//!
//! Generated geometry for shapes the demo scene needs without an asset file:
//! the relief plane, a cube and a sphere used as point-light indicator.
//! Every primitive carries texture coordinates and a tangent frame.

use std::f32::consts::PI;

use crate::assets::mesh::Submesh;
use crate::assets::obj_loader::build_submesh;

/// Unit plane in the XY plane facing +Z, spanning -1..1
pub fn plane() -> Submesh {
    let positions = [-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0];
    let normals = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let texcoords = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
    let indices = [0, 1, 2, 0, 2, 3];

    assemble(&positions, &normals, &texcoords, &indices)
}

/// Cube spanning -1..1 on every axis with one quad per face
pub fn cube() -> Submesh {
    // (normal, u axis, v axis)
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    let mut positions = Vec::with_capacity(6 * 4 * 3);
    let mut normals = Vec::with_capacity(6 * 4 * 3);
    let mut texcoords = Vec::with_capacity(6 * 4 * 2);
    let mut indices = Vec::with_capacity(6 * 6);

    for (face, (normal, u, v)) in faces.iter().enumerate() {
        let base = (face * 4) as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            for axis in 0..3 {
                positions.push(normal[axis] + u[axis] * su + v[axis] * sv);
            }
            normals.extend_from_slice(normal);
            texcoords.push((su + 1.0) * 0.5);
            texcoords.push((sv + 1.0) * 0.5);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    assemble(&positions, &normals, &texcoords, &indices)
}

/// UV sphere of radius 1
pub fn sphere(sectors: u32, stacks: u32) -> Submesh {
    let sectors = sectors.max(3);
    let stacks = stacks.max(2);

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut texcoords = Vec::new();
    let mut indices = Vec::new();

    for stack in 0..=stacks {
        let v = stack as f32 / stacks as f32;
        let phi = PI * (0.5 - v);
        for sector in 0..=sectors {
            let u = sector as f32 / sectors as f32;
            let theta = 2.0 * PI * u;
            let point = [phi.cos() * theta.cos(), phi.sin(), -phi.cos() * theta.sin()];
            positions.extend_from_slice(&point);
            normals.extend_from_slice(&point);
            texcoords.push(u);
            texcoords.push(1.0 - v);
        }
    }

    let row = sectors + 1;
    for stack in 0..stacks {
        for sector in 0..sectors {
            let top = stack * row + sector;
            let bottom = top + row;
            if stack != 0 {
                indices.extend_from_slice(&[top, bottom, top + 1]);
            }
            if stack != stacks - 1 {
                indices.extend_from_slice(&[top + 1, bottom, bottom + 1]);
            }
        }
    }

    assemble(&positions, &normals, &texcoords, &indices)
}

fn assemble(positions: &[f32], normals: &[f32], texcoords: &[f32], indices: &[u32]) -> Submesh {
    match build_submesh(positions, normals, texcoords, indices) {
        Some(submesh) => submesh,
        None => unreachable!("generated primitive has consistent attribute arrays"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::mesh::TANGENT_LOCATION;
    use approx::assert_relative_eq;

    #[test]
    fn plane_is_two_triangles_with_tangents() {
        let plane = plane();

        assert_eq!(plane.index_count(), 6);
        assert!(plane.layout().attribute(TANGENT_LOCATION).is_some());
    }

    #[test]
    fn cube_has_a_quad_per_face() {
        let cube = cube();
        let floats = cube.layout().floats_per_vertex();

        assert_eq!(cube.vertices().len() / floats, 24);
        assert_eq!(cube.index_count(), 36);
        for vertex in cube.vertices().chunks_exact(floats) {
            let extent = vertex[0].abs().max(vertex[1].abs()).max(vertex[2].abs());
            assert_relative_eq!(extent, 1.0);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_the_unit_sphere() {
        let sphere = sphere(12, 6);
        let floats = sphere.layout().floats_per_vertex();

        for vertex in sphere.vertices().chunks_exact(floats) {
            let length = (vertex[0] * vertex[0] + vertex[1] * vertex[1] + vertex[2] * vertex[2]).sqrt();
            assert_relative_eq!(length, 1.0, epsilon = 1e-5);
        }
        assert_eq!(sphere.index_count(), 12 * (6 - 1) * 2 * 3);
    }
}
