//! OBJ file loader for 3D models
//!
//! Parsing is delegated to `tobj` with GPU load options, so every object of
//! the file arrives triangulated with one index per vertex. Each object
//! becomes one [`Submesh`]. Missing normals are generated by averaging face
//! normals, and a tangent frame is derived whenever texture coordinates are
//! present so relief materials can be drawn on any textured model.

#[cfg(feature = "obj")]
use std::path::Path;

use crate::assets::material::MaterialDesc;
use crate::assets::mesh::{Mesh, Submesh, VertexBufferLayout};
use crate::foundation::math::{Vec2, Vec3};

#[cfg(feature = "obj")]
use crate::assets::AssetError;

/// Geometry and materials read from a model file
#[derive(Debug, Clone)]
pub struct LoadedModel {
    /// Geometry, not yet uploaded
    pub mesh: Mesh,
    /// Materials referenced by the submeshes
    pub materials: Vec<MaterialDesc>,
    /// Index into `materials` for every submesh
    pub submesh_materials: Vec<usize>,
}

impl LoadedModel {
    /// Model of in-memory submeshes sharing one default material
    pub fn from_submeshes(submeshes: Vec<Submesh>) -> Self {
        let submesh_materials = vec![0; submeshes.len()];
        Self {
            mesh: Mesh::new(submeshes),
            materials: vec![MaterialDesc::default()],
            submesh_materials,
        }
    }
}

/// Model importer
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file together with its MTL library
    ///
    /// Texture paths of the materials are resolved relative to the directory
    /// holding the model. A missing or broken material library is not fatal;
    /// the model then uses a single default material.
    #[cfg(feature = "obj")]
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<LoadedModel, AssetError> {
        let path = path.as_ref();
        log::debug!("Loading model from: {:?}", path);

        let (models, materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load model {}: {}", path.display(), e)))?;

        let directory = path.parent().unwrap_or_else(|| Path::new(""));
        let mut materials: Vec<MaterialDesc> = match materials {
            Ok(materials) => materials
                .iter()
                .map(|material| convert_material(material, directory))
                .collect(),
            Err(e) => {
                log::warn!("No material library for {}: {}", path.display(), e);
                Vec::new()
            }
        };

        let loaded = assemble(&models, &mut materials)?;
        log::info!(
            "Loaded model {:?} with {} submeshes and {} materials",
            path,
            loaded.0.len(),
            materials.len()
        );

        Ok(LoadedModel {
            mesh: Mesh::new(loaded.0),
            materials,
            submesh_materials: loaded.1,
        })
    }
}

#[cfg(feature = "obj")]
fn assemble(
    models: &[tobj::Model],
    materials: &mut Vec<MaterialDesc>,
) -> Result<(Vec<Submesh>, Vec<usize>), AssetError> {
    let mut submeshes = Vec::with_capacity(models.len());
    let mut submesh_materials = Vec::with_capacity(models.len());
    let mut fallback = None;

    for model in models {
        let mesh = &model.mesh;
        if mesh.indices.is_empty() {
            log::debug!("Skipping object {} without faces", model.name);
            continue;
        }

        let submesh = build_submesh(&mesh.positions, &mesh.normals, &mesh.texcoords, &mesh.indices)
            .ok_or_else(|| AssetError::InvalidData(format!("object {} has malformed vertex data", model.name)))?;

        let material = match mesh.material_id.filter(|id| *id < materials.len()) {
            Some(id) => id,
            None => *fallback.get_or_insert_with(|| {
                materials.push(MaterialDesc::default());
                materials.len() - 1
            }),
        };

        submeshes.push(submesh);
        submesh_materials.push(material);
    }

    if submeshes.is_empty() {
        return Err(AssetError::InvalidData("model has no faces".to_string()));
    }

    Ok((submeshes, submesh_materials))
}

#[cfg(feature = "obj")]
fn convert_material(material: &tobj::Material, directory: &Path) -> MaterialDesc {
    let resolve = |name: Option<&String>| {
        name.filter(|name| !name.is_empty())
            .map(|name| directory.join(name.replace('\\', "/")))
    };
    let unknown = |key: &str| material.unknown_param.get(key);

    let emissive = unknown("Ke")
        .and_then(|value| parse_vec3(value))
        .unwrap_or_else(Vec3::zeros);
    let albedo = material
        .diffuse
        .map(|[r, g, b]| Vec3::new(r, g, b))
        .unwrap_or_else(|| Vec3::new(1.0, 1.0, 1.0));

    MaterialDesc {
        name: material.name.clone(),
        albedo,
        emissive,
        smoothness: MaterialDesc::smoothness_from_shininess(material.shininess.unwrap_or(0.0)),
        albedo_map: resolve(material.diffuse_texture.as_ref()),
        emissive_map: resolve(unknown("map_Ke")),
        specular_map: resolve(material.specular_texture.as_ref()),
        normal_map: resolve(material.normal_texture.as_ref()),
        bump_map: resolve(unknown("map_disp").or_else(|| unknown("disp"))),
    }
}

fn parse_vec3(value: &str) -> Option<Vec3> {
    let mut parts = value.split_whitespace().map(str::parse::<f32>);
    let x = parts.next()?.ok()?;
    let y = parts.next()?.ok()?;
    let z = parts.next()?.ok()?;
    Some(Vec3::new(x, y, z))
}

/// Interleave flat attribute arrays into a submesh
///
/// `normals` may be empty, in which case smooth normals are generated.
/// `texcoords` may be empty, which drops the texture coordinate and
/// tangent attributes from the layout. Returns `None` when the arrays
/// disagree on the vertex count or an index is out of range.
pub fn build_submesh(positions: &[f32], normals: &[f32], texcoords: &[f32], indices: &[u32]) -> Option<Submesh> {
    if positions.len() % 3 != 0 {
        return None;
    }
    let vertex_count = positions.len() / 3;
    if indices.len() % 3 != 0 || indices.iter().any(|&index| index as usize >= vertex_count) {
        return None;
    }

    let positions: Vec<Vec3> = positions.chunks_exact(3).map(|p| Vec3::new(p[0], p[1], p[2])).collect();

    let normals: Vec<Vec3> = if normals.is_empty() {
        generate_normals(&positions, indices)
    } else if normals.len() == positions.len() * 3 {
        normals.chunks_exact(3).map(|n| Vec3::new(n[0], n[1], n[2])).collect()
    } else {
        return None;
    };

    let texcoords: Vec<Vec2> = if texcoords.is_empty() {
        Vec::new()
    } else if texcoords.len() == vertex_count * 2 {
        texcoords.chunks_exact(2).map(|t| Vec2::new(t[0], t[1])).collect()
    } else {
        return None;
    };

    let has_texcoords = !texcoords.is_empty();
    let tangent_space = has_texcoords.then(|| compute_tangent_space(&positions, &normals, &texcoords, indices));

    let layout = VertexBufferLayout::standard(has_texcoords, has_texcoords);
    let mut vertices = Vec::with_capacity(vertex_count * layout.floats_per_vertex());
    for i in 0..vertex_count {
        vertices.extend_from_slice(positions[i].as_slice());
        vertices.extend_from_slice(normals[i].as_slice());
        if has_texcoords {
            vertices.extend_from_slice(texcoords[i].as_slice());
        }
        if let Some((tangents, bitangents)) = &tangent_space {
            vertices.extend_from_slice(tangents[i].as_slice());
            vertices.extend_from_slice(bitangents[i].as_slice());
        }
    }

    Some(Submesh::new(layout, vertices, indices.to_vec()))
}

/// Area-weighted vertex normals of an indexed triangle list
pub fn generate_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::zeros(); positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        let face = (positions[b] - positions[a]).cross(&(positions[c] - positions[a]));
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    normals
        .into_iter()
        .map(|normal| normal.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y))
        .collect()
}

/// Per-vertex tangents and bitangents following the texture coordinate gradients
pub fn compute_tangent_space(
    positions: &[Vec3],
    normals: &[Vec3],
    texcoords: &[Vec2],
    indices: &[u32],
) -> (Vec<Vec3>, Vec<Vec3>) {
    let mut tangents = vec![Vec3::zeros(); positions.len()];
    let mut bitangents = vec![Vec3::zeros(); positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        let edge1 = positions[b] - positions[a];
        let edge2 = positions[c] - positions[a];
        let duv1 = texcoords[b] - texcoords[a];
        let duv2 = texcoords[c] - texcoords[a];

        let determinant = duv1.x * duv2.y - duv2.x * duv1.y;
        if determinant.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / determinant;
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;
        let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * r;

        for vertex in [a, b, c] {
            tangents[vertex] += tangent;
            bitangents[vertex] += bitangent;
        }
    }

    for i in 0..positions.len() {
        let normal = normals[i];
        // Gram-Schmidt against the shading normal
        let tangent = tangents[i] - normal * normal.dot(&tangents[i]);
        tangents[i] = tangent.try_normalize(f32::EPSILON).unwrap_or_else(|| any_perpendicular(normal));

        let bitangent = bitangents[i].try_normalize(f32::EPSILON);
        bitangents[i] = match bitangent {
            Some(bitangent) if normal.cross(&tangents[i]).dot(&bitangent) < 0.0 => -normal.cross(&tangents[i]),
            _ => normal.cross(&tangents[i]),
        };
    }

    (tangents, bitangents)
}

fn any_perpendicular(normal: Vec3) -> Vec3 {
    let axis = if normal.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    normal.cross(&axis).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::mesh::{BITANGENT_LOCATION, TANGENT_LOCATION, TEXCOORD_LOCATION};
    use approx::assert_relative_eq;

    // Unit quad in the XY plane facing +Z
    const QUAD_POSITIONS: [f32; 12] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
    const QUAD_TEXCOORDS: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
    const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

    #[test]
    fn generated_normals_face_the_winding() {
        let submesh = build_submesh(&QUAD_POSITIONS, &[], &[], &QUAD_INDICES).unwrap();
        let vertices = submesh.vertices();

        assert_eq!(submesh.layout().floats_per_vertex(), 6);
        assert_relative_eq!(vertices[3], 0.0);
        assert_relative_eq!(vertices[4], 0.0);
        assert_relative_eq!(vertices[5], 1.0);
    }

    #[test]
    fn texcoords_add_tangent_space() {
        let submesh = build_submesh(&QUAD_POSITIONS, &[], &QUAD_TEXCOORDS, &QUAD_INDICES).unwrap();
        let layout = submesh.layout();

        assert!(layout.attribute(TEXCOORD_LOCATION).is_some());
        assert!(layout.attribute(TANGENT_LOCATION).is_some());
        assert!(layout.attribute(BITANGENT_LOCATION).is_some());

        let vertex = &submesh.vertices()[..layout.floats_per_vertex()];
        assert_relative_eq!(Vec3::new(vertex[8], vertex[9], vertex[10]), Vec3::x(), epsilon = 1e-6);
        assert_relative_eq!(Vec3::new(vertex[11], vertex[12], vertex[13]), Vec3::y(), epsilon = 1e-6);
    }

    #[test]
    fn mismatched_arrays_are_rejected() {
        assert!(build_submesh(&QUAD_POSITIONS, &[0.0, 0.0, 1.0], &[], &QUAD_INDICES).is_none());
        assert!(build_submesh(&QUAD_POSITIONS, &[], &[], &[0, 1, 7]).is_none());
        assert!(build_submesh(&QUAD_POSITIONS[..11], &[], &[], &[]).is_none());
    }

    #[test]
    fn emissive_color_parses_from_text() {
        assert_eq!(parse_vec3("0.5 1 0"), Some(Vec3::new(0.5, 1.0, 0.0)));
        assert_eq!(parse_vec3("0.5 x 0"), None);
    }

    #[cfg(feature = "obj")]
    #[test]
    fn missing_model_file_fails() {
        let result = ObjLoader::load_obj("missing/model.obj");
        assert!(matches!(result, Err(AssetError::LoadFailed(_))));
    }
}
