use std::path::PathBuf;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3, Vec4};
use tracing::warn;

use crate::conversion::{Asset, Geometry, Importer, PropMaterial, PropMesh, Vertex};
use crate::document::{Document, MaterialTexture, PropertyId};
use crate::io::{binary, reader, GltfIo, ReadOptions, ResourceMap};

#[derive(Default)]
pub struct GltfImporter {}

impl Importer for GltfImporter {
    fn import(&self, asset: &Asset, mesh: &mut PropMesh) -> Result<()> {
        let doc = read_document(asset).context("Failed to read the glTF asset")?;

        let materials = doc.list_materials();
        for (index, &material) in materials.iter().enumerate() {
            mesh.materials
                .push(convert_material(&doc, material, index, asset)?);
        }
        if mesh.materials.is_empty() {
            mesh.materials.push(PropMaterial::default());
        }

        for doc_mesh in doc.list_meshes() {
            for primitive in doc.mesh_primitives(doc_mesh) {
                if let Some(geometry) = convert_primitive(&doc, primitive, &materials) {
                    mesh.geometries.push(geometry);
                }
            }
        }

        mesh.name = asset.name().to_owned();
        Ok(())
    }

    fn extensions(&self) -> &[&str] {
        &["gltf", "glb"]
    }
}

/// Reads the document, resolving sidecar resources next to the asset when
/// the input is JSON text rather than a binary container.
fn read_document(asset: &Asset) -> Result<Document> {
    let options = ReadOptions::default();
    let mut resources = ResourceMap::new();
    if !binary::is_binary(&asset.bytes) {
        let root: gltf::json::Root = serde_json::from_slice(&asset.bytes)?;
        for uri in reader::external_uris(&root) {
            match std::fs::read(asset.parent_dir().join(&uri)) {
                Ok(bytes) => {
                    resources.insert(uri, bytes);
                }
                Err(_) => warn!(uri = uri.as_str(), "sidecar resource not found"),
            }
        }
    }
    Ok(GltfIo::read_slice(&asset.bytes, resources, &options)?)
}

/// Converts one document material, extracting embedded textures to files
/// next to the source model so the texture pipeline can pick them up.
fn convert_material(
    doc: &Document,
    material: PropertyId,
    index: usize,
    asset: &Asset,
) -> Result<PropMaterial> {
    let data = doc.material(material);
    let name = match doc.name(material) {
        "" => format!("material_{}", index),
        name => name.to_owned(),
    };

    let diffuse_texture = extract_texture(doc, material, MaterialTexture::BaseColor, index, asset)
        .context("Failed to extract the base color texture")?;
    let normal_texture = extract_texture(doc, material, MaterialTexture::Normal, index, asset)
        .context("Failed to extract the normal texture")?;

    Ok(PropMaterial {
        name,
        diffuse_texture,
        shader_name: if normal_texture.is_some() {
            String::from("normal.sps")
        } else {
            String::from("default.sps")
        },
        normal_texture,
        specular_texture: None,
        diffuse_color: Vec4::from(data.base_color_factor),
    })
}

fn extract_texture(
    doc: &Document,
    material: PropertyId,
    slot: MaterialTexture,
    index: usize,
    asset: &Asset,
) -> Result<Option<PathBuf>> {
    let texture = match doc.material_texture(material, slot) {
        Some(texture) => texture,
        None => return Ok(None),
    };
    let data = doc.texture(texture);
    let image = match &data.image {
        Some(image) => image,
        None => return Ok(None),
    };

    let suffix = match slot {
        MaterialTexture::Normal => "norm",
        _ => "diff",
    };
    let name = match doc.name(texture) {
        "" => format!("texture_{}_{}", index, suffix),
        name => name.to_owned(),
    };
    let extension = match data.mime_type.as_deref() {
        Some("image/png") => "png",
        _ => "jpg",
    };
    let path = asset.parent_dir().join(format!("{}.{}", name, extension));
    std::fs::write(&path, image)
        .with_context(|| format!("Failed to write the texture image {:?}", path))?;
    Ok(Some(path))
}

/// Converts one primitive into a sub-geometry, reading the POSITION,
/// NORMAL, and TEXCOORD_0 attributes plus the index buffer. A primitive
/// without positions contributes nothing.
fn convert_primitive(
    doc: &Document,
    primitive: PropertyId,
    materials: &[PropertyId],
) -> Option<Geometry> {
    let positions = doc.primitive_attribute(primitive, "POSITION")?;
    let normals = doc.primitive_attribute(primitive, "NORMAL");
    let uvs = doc.primitive_attribute(primitive, "TEXCOORD_0");

    let count = doc.accessor(positions).count();
    let mut vertices = Vec::with_capacity(count);
    let mut element = [0.0f64; 4];
    for i in 0..count {
        doc.accessor(positions).element(i, &mut element);
        let mut vertex = Vertex::new(Vec3::new(
            element[0] as f32,
            element[1] as f32,
            element[2] as f32,
        ));
        if let Some(normals) = normals {
            doc.accessor(normals).element(i, &mut element);
            vertex.normal = Vec3::new(element[0] as f32, element[1] as f32, element[2] as f32);
        }
        vertex.tex_coord = Some(match uvs {
            Some(uvs) => {
                doc.accessor(uvs).element(i, &mut element);
                // Flip V for the drawable pipeline.
                Vec2::new(element[0] as f32, 1.0 - element[1] as f32)
            }
            None => Vec2::ZERO,
        });
        vertices.push(vertex);
    }

    let indices = match doc.primitive_indices(primitive) {
        Some(accessor) => {
            let data = doc.accessor(accessor);
            let mut indices = Vec::with_capacity(data.count());
            let mut element = [0.0f64];
            for i in 0..data.count() {
                data.element(i, &mut element);
                indices.push(element[0] as u32);
            }
            indices
        }
        None => (0..count as u32).collect(),
    };

    let material_index = doc
        .primitive_material(primitive)
        .and_then(|material| materials.iter().position(|&m| m == material))
        .unwrap_or(0);

    Some(Geometry {
        material_index,
        vertices,
        indices,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::document::{ElementType, ScalarArray};
    use crate::io::WriteOptions;

    use super::*;

    fn triangle_glb() -> Vec<u8> {
        let mut doc = Document::new();
        let buffer = doc.create_buffer("");

        let positions = doc.create_accessor("");
        doc.accessor_mut(positions).element_type = ElementType::Vec3;
        doc.accessor_mut(positions).array = Some(ScalarArray::F32(vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        ]));
        doc.set_accessor_buffer(positions, Some(buffer)).unwrap();

        let indices = doc.create_accessor("");
        doc.accessor_mut(indices).array = Some(ScalarArray::U16(vec![0, 1, 2]));
        doc.set_accessor_buffer(indices, Some(buffer)).unwrap();

        let primitive = doc.create_primitive();
        doc.set_primitive_attribute(primitive, "POSITION", Some(positions))
            .unwrap();
        doc.set_primitive_indices(primitive, Some(indices)).unwrap();
        let mesh = doc.create_mesh("triangle");
        doc.mesh_add_primitive(mesh, primitive).unwrap();

        GltfIo::write_binary(&doc, &WriteOptions::binary()).unwrap()
    }

    #[test]
    fn imports_binary_container_geometry() {
        let mut mesh = PropMesh::default();
        GltfImporter {}
            .import(&Asset::new(triangle_glb(), "prop.glb"), &mut mesh)
            .unwrap();

        assert_eq!("prop", mesh.name);
        assert_eq!(1, mesh.geometries.len());
        assert_eq!(1, mesh.materials.len());
        let geometry = &mesh.geometries[0];
        assert_eq!(3, geometry.vertices.len());
        assert_eq!(vec![0, 1, 2], geometry.indices);
        assert_eq!(Vec3::new(1.0, 0.0, 0.0), geometry.vertices[1].position);
        // No UVs in the source: defaulted here, never touched by normalize.
        assert_eq!(Some(Vec2::ZERO), geometry.vertices[0].tex_coord);
    }
}
