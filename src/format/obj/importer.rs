use std::collections::HashMap;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3, Vec4};
use indexmap::IndexMap;

use crate::conversion::{Asset, Geometry, Importer, PropMaterial, PropMesh, Vertex};

use super::internal::{parse_mtl, Face, FaceVertex, Mtl, Obj};

#[derive(Default)]
pub struct ObjImporter {}

impl Importer for ObjImporter {
    fn import(&self, asset: &Asset, mesh: &mut PropMesh) -> Result<()> {
        let text = std::str::from_utf8(&asset.bytes)
            .context("The .obj asset is not valid UTF-8 text")?;
        let obj = Obj::parse(text);

        // Load the material library next to the model, when referenced.
        let mut library = IndexMap::new();
        if let Some(lib) = &obj.mtl_lib {
            let path = asset.parent_dir().join(lib);
            if path.exists() {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read the material library {:?}", path))?;
                library = parse_mtl(&text);
            }
        }

        // Split faces by material group, preserving declaration order.
        let mut grouped: IndexMap<&str, Vec<&Face>> = IndexMap::new();
        for face in &obj.faces {
            grouped.entry(face.group.as_str()).or_default().push(face);
        }

        for (group, faces) in &grouped {
            mesh.materials
                .push(convert_material(group, library.get(*group), asset));
            mesh.geometries
                .push(convert_geometry(&obj, faces, mesh.materials.len() - 1));
        }

        mesh.name = asset.name().to_owned();
        Ok(())
    }

    fn extensions(&self) -> &[&str] {
        &["obj"]
    }
}

fn convert_material(group: &str, mtl: Option<&Mtl>, asset: &Asset) -> PropMaterial {
    let resolve = |file: &Option<String>| {
        file.as_ref().map(|file| asset.parent_dir().join(file))
    };
    match mtl {
        Some(mtl) => PropMaterial {
            name: group.to_owned(),
            diffuse_texture: resolve(&mtl.diffuse_map),
            normal_texture: resolve(&mtl.normal_map),
            specular_texture: resolve(&mtl.specular_map),
            diffuse_color: Vec4::from(mtl.diffuse_color),
            shader_name: String::from("default.sps"),
        },
        None => PropMaterial {
            name: group.to_owned(),
            ..Default::default()
        },
    }
}

/// Builds a unique vertex list and index buffer from the face references.
/// Distinct position/texcoord/normal combinations become distinct vertices.
fn convert_geometry(obj: &Obj, faces: &[&Face], material_index: usize) -> Geometry {
    let mut geometry = Geometry {
        material_index,
        vertices: Vec::new(),
        indices: Vec::new(),
    };
    let mut seen: HashMap<FaceVertex, u32> = HashMap::new();

    for face in faces {
        for vertex in &face.verts {
            let index = *seen.entry(*vertex).or_insert_with(|| {
                geometry.vertices.push(convert_vertex(obj, vertex));
                geometry.vertices.len() as u32 - 1
            });
            geometry.indices.push(index);
        }
    }
    geometry
}

fn convert_vertex(obj: &Obj, vertex: &FaceVertex) -> Vertex {
    let position = obj
        .positions
        .get(vertex.position)
        .copied()
        .unwrap_or_default();
    let normal = vertex
        .normal
        .and_then(|i| obj.normals.get(i))
        .copied()
        .unwrap_or_default();
    let tex_coord = vertex
        .tex_coord
        .and_then(|i| obj.tex_coords.get(i))
        .copied()
        .unwrap_or_default();

    Vertex {
        position: Vec3::from(position),
        normal: Vec3::from(normal),
        // Flip V for the drawable pipeline.
        tex_coord: Some(Vec2::new(tex_coord[0], 1.0 - tex_coord[1])),
        tangent: None,
        color: None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::conversion::normalize::normalize;

    use super::*;

    fn import(text: &str) -> PropMesh {
        let mut mesh = PropMesh::default();
        ObjImporter {}
            .import(&Asset::new(text.as_bytes().to_vec(), "model.obj"), &mut mesh)
            .unwrap();
        mesh
    }

    #[test]
    fn single_triangle_end_to_end() {
        let mut mesh = import("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        normalize(&mut mesh);

        assert_eq!(1, mesh.geometries.len());
        assert_eq!("default", mesh.materials[0].name);
        let geometry = &mesh.geometries[0];
        assert_eq!(3, geometry.vertices.len());
        assert_eq!(vec![0, 1, 2], geometry.indices);
        for vertex in &geometry.vertices {
            assert_eq!(Vec3::new(0.0, 0.0, 1.0), vertex.normal);
        }
        assert_eq!(Vec3::ZERO, mesh.bounding_box.min);
        assert_eq!(Vec3::new(1.0, 1.0, 0.0), mesh.bounding_box.max);
        assert_eq!(Vec3::new(0.5, 0.5, 0.0), mesh.bounding_sphere.center);
        assert!((mesh.bounding_sphere.radius - 0.707).abs() < 1e-3);
    }

    #[test]
    fn splits_geometries_by_group() {
        let mesh = import(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\n\
             usemtl a\nf 1 2 3\n\
             usemtl b\nf 1 2 4\nf 2 3 4\n",
        );

        assert_eq!(2, mesh.geometries.len());
        assert_eq!(vec!["a", "b"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>(),
            mesh.materials.iter().map(|m| m.name.clone()).collect::<Vec<_>>());
        assert_eq!(3, mesh.geometries[0].vertices.len());
        // Shared references are deduplicated within a group.
        assert_eq!(4, mesh.geometries[1].vertices.len());
        assert_eq!(6, mesh.geometries[1].indices.len());
    }

    #[test]
    fn reuses_vertices_with_same_references() {
        let mesh = import(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
             f 1 2 3\nf 2 4 3\n",
        );
        let geometry = &mesh.geometries[0];
        assert_eq!(4, geometry.vertices.len());
        assert_eq!(vec![0, 1, 2, 1, 3, 2], geometry.indices);
    }

    #[test]
    fn flips_texture_v() {
        let mesh = import(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             vt 0.25 0.25\nvt 1 1\nvt 0 0\n\
             f 1/1 2/2 3/3\n",
        );
        let vertices = &mesh.geometries[0].vertices;
        assert_eq!(Some(Vec2::new(0.25, 0.75)), vertices[0].tex_coord);
        assert_eq!(Some(Vec2::new(1.0, 0.0)), vertices[1].tex_coord);
        assert_eq!(Some(Vec2::new(0.0, 1.0)), vertices[2].tex_coord);
    }
}
