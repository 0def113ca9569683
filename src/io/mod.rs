//! glTF input/output: JSON (with sidecar resources) and single-file binary
//! container forms of the document model.

pub mod binary;
pub mod reader;
pub mod writer;

use std::path::Path;

use gltf::json;
use indexmap::IndexMap;
use tracing::warn;

use crate::document::Document;
use crate::error::{Error, Result};

/// Reserved resource key for the single buffer carried inside a binary
/// container. Never serialized as a URI.
pub(crate) const GLB_BUFFER_URI: &str = "@glb.bin";

/// Named binary resources travelling with a JSON document: buffer payloads
/// and image files, keyed by URI.
pub type ResourceMap = IndexMap<String, Vec<u8>>;

/// A document in interchange form: parsed JSON plus its resource map.
pub struct JsonDocument {
    pub json: json::Root,
    pub resources: ResourceMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Single-file binary container (GLB).
    Binary,
    /// JSON with sidecar resource files.
    Sidecar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexLayout {
    Interleaved,
    Separate,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// When set, unresolvable image resources abort the read instead of
    /// leaving the texture in a null-image state.
    pub strict: bool,
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub format: Format,
    pub vertex_layout: VertexLayout,
    /// Base name for generated resource file names.
    pub basename: String,
}

impl WriteOptions {
    pub fn binary() -> Self {
        Self {
            format: Format::Binary,
            vertex_layout: VertexLayout::Interleaved,
            basename: "model".to_owned(),
        }
    }

    pub fn sidecar(basename: &str) -> Self {
        Self {
            format: Format::Sidecar,
            vertex_layout: VertexLayout::Interleaved,
            basename: basename.to_owned(),
        }
    }
}

/// Entry points tying together the reader, writer, and container codec.
pub struct GltfIo;

impl GltfIo {
    /// Reads a document from raw bytes, auto-detecting the binary container
    /// against raw JSON text. Sidecar resources must already be resolved
    /// into `resources`.
    pub fn read_slice(
        bytes: &[u8],
        mut resources: ResourceMap,
        options: &ReadOptions,
    ) -> Result<Document> {
        if binary::is_binary(bytes) {
            let (json_bytes, bin) = binary::decode(bytes)?;
            let root: json::Root = serde_json::from_slice(&json_bytes)?;
            if let Some(bin) = bin {
                resources.insert(GLB_BUFFER_URI.to_owned(), bin);
            }
            reader::read(&root, &resources, options)
        } else {
            let root: json::Root = serde_json::from_slice(bytes)?;
            reader::read(&root, &resources, options)
        }
    }

    /// Reads a document from disk, fetching sidecar resources relative to
    /// the file's directory.
    pub fn read_path(path: &Path, options: &ReadOptions) -> Result<Document> {
        let bytes = std::fs::read(path)?;
        let mut resources = ResourceMap::new();
        if !binary::is_binary(&bytes) {
            let root: json::Root = serde_json::from_slice(&bytes)?;
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            for uri in reader::external_uris(&root) {
                match std::fs::read(dir.join(&uri)) {
                    Ok(data) => {
                        resources.insert(uri, data);
                    }
                    Err(_) if options.strict => return Err(Error::MissingResource(uri)),
                    Err(_) => warn!(uri = uri.as_str(), "sidecar resource not found"),
                }
            }
        }
        Self::read_slice(&bytes, resources, options)
    }

    /// Writes a document to interchange form.
    pub fn write(doc: &Document, options: &WriteOptions) -> Result<JsonDocument> {
        writer::write(doc, options)
    }

    /// Writes a document as a single binary container.
    pub fn write_binary(doc: &Document, options: &WriteOptions) -> Result<Vec<u8>> {
        let mut options = options.clone();
        options.format = Format::Binary;
        let out = writer::write(doc, &options)?;
        let json_string = json::serialize::to_string(&out.json)?;
        let bin = out.resources.get(GLB_BUFFER_URI).map(|b| b.as_slice());
        binary::encode(json_string.as_bytes(), bin)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::document::{
        ElementType, Interpolation, MaterialTexture, Projection, ScalarArray, TargetPath,
        WrapMode,
    };

    /// A document exercising every entity kind the writer emits.
    fn sample_document() -> Document {
        let mut doc = Document::new();
        let buffer = doc.create_buffer("buffer");

        let positions = doc.create_accessor("positions");
        doc.accessor_mut(positions).element_type = ElementType::Vec3;
        doc.accessor_mut(positions).array = Some(ScalarArray::F32(vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        ]));
        doc.set_accessor_buffer(positions, Some(buffer)).unwrap();

        let uvs = doc.create_accessor("uvs");
        doc.accessor_mut(uvs).element_type = ElementType::Vec2;
        doc.accessor_mut(uvs).array =
            Some(ScalarArray::F32(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]));
        doc.set_accessor_buffer(uvs, Some(buffer)).unwrap();

        let indices = doc.create_accessor("indices");
        doc.accessor_mut(indices).array = Some(ScalarArray::U16(vec![0, 1, 2]));
        doc.set_accessor_buffer(indices, Some(buffer)).unwrap();

        let texture = doc.create_texture("diffuse");
        doc.texture_mut(texture).mime_type = Some("image/png".to_owned());
        doc.texture_mut(texture).image = Some(vec![137, 80, 78, 71, 13, 10, 26, 10]);

        let material = doc.create_material("mat");
        doc.material_mut(material).base_color_factor = [0.5, 0.25, 1.0, 1.0];
        doc.set_material_texture(material, MaterialTexture::BaseColor, Some(texture))
            .unwrap();
        let info = doc.material_texture_info(material, MaterialTexture::BaseColor);
        doc.texture_info_mut(info).wrap_s = WrapMode::ClampToEdge;

        let primitive = doc.create_primitive();
        doc.set_primitive_attribute(primitive, "POSITION", Some(positions))
            .unwrap();
        doc.set_primitive_attribute(primitive, "TEXCOORD_0", Some(uvs))
            .unwrap();
        doc.set_primitive_indices(primitive, Some(indices)).unwrap();
        doc.set_primitive_material(primitive, Some(material)).unwrap();

        let mesh = doc.create_mesh("mesh");
        doc.mesh_add_primitive(mesh, primitive).unwrap();

        let camera = doc.create_camera("camera");
        doc.camera_mut(camera).projection = Projection::Perspective {
            znear: 0.01,
            zfar: Some(100.0),
            yfov: 1.0,
            aspect: Some(1.5),
        };

        let parent = doc.create_node("parent");
        let child = doc.create_node("child");
        doc.node_mut(child).translation = Vec3::new(0.0, 1.0, 0.0);
        doc.set_node_mesh(child, Some(mesh)).unwrap();
        doc.set_node_camera(parent, Some(camera)).unwrap();
        doc.add_child(parent, child).unwrap();

        let times = doc.create_accessor("times");
        doc.accessor_mut(times).array = Some(ScalarArray::F32(vec![0.0, 1.0]));
        doc.set_accessor_buffer(times, Some(buffer)).unwrap();
        let values = doc.create_accessor("values");
        doc.accessor_mut(values).element_type = ElementType::Vec3;
        doc.accessor_mut(values).array =
            Some(ScalarArray::F32(vec![0.0, 0.0, 0.0, 0.0, 2.0, 0.0]));
        doc.set_accessor_buffer(values, Some(buffer)).unwrap();

        let animation = doc.create_animation("bob");
        let sampler = doc.create_animation_sampler();
        doc.sampler_mut(sampler).interpolation = Interpolation::Linear;
        doc.set_sampler_input(sampler, Some(times)).unwrap();
        doc.set_sampler_output(sampler, Some(values)).unwrap();
        doc.animation_add_sampler(animation, sampler).unwrap();
        let channel = doc.create_animation_channel();
        doc.channel_mut(channel).target_path = Some(TargetPath::Translation);
        doc.set_channel_sampler(channel, Some(sampler)).unwrap();
        doc.set_channel_target_node(channel, Some(child)).unwrap();
        doc.animation_add_channel(animation, channel).unwrap();

        let scene = doc.create_scene("scene");
        doc.scene_add_child(scene, parent).unwrap();
        doc.set_default_scene(Some(scene)).unwrap();
        doc
    }

    fn round_trip(doc: &Document, format: Format, layout: VertexLayout) -> Document {
        let options = WriteOptions {
            format,
            vertex_layout: layout,
            basename: "sample".to_owned(),
        };
        match format {
            Format::Binary => {
                let bytes = GltfIo::write_binary(doc, &options).unwrap();
                GltfIo::read_slice(&bytes, ResourceMap::new(), &ReadOptions::default()).unwrap()
            }
            Format::Sidecar => {
                let out = GltfIo::write(doc, &options).unwrap();
                let bytes = json::serialize::to_string(&out.json).unwrap().into_bytes();
                GltfIo::read_slice(&bytes, out.resources, &ReadOptions::default()).unwrap()
            }
        }
    }

    #[test]
    fn round_trip_all_permutations() {
        let doc = sample_document();
        for format in [Format::Binary, Format::Sidecar] {
            for layout in [VertexLayout::Interleaved, VertexLayout::Separate] {
                let back = round_trip(&doc, format, layout);
                assert!(
                    doc.equals(&back),
                    "round trip changed the document ({:?}, {:?})",
                    format,
                    layout
                );
            }
        }
    }

    #[test]
    fn round_trip_preserves_vertex_data() {
        let doc = sample_document();
        let back = round_trip(&doc, Format::Binary, VertexLayout::Interleaved);

        let mesh = back.list_meshes()[0];
        let primitive = back.mesh_primitives(mesh)[0];
        let positions = back.primitive_attribute(primitive, "POSITION").unwrap();
        assert_eq!(
            Some(ScalarArray::F32(vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0
            ])),
            back.accessor(positions).array
        );
        let indices = back.primitive_indices(primitive).unwrap();
        assert_eq!(
            Some(ScalarArray::U16(vec![0, 1, 2])),
            back.accessor(indices).array
        );
    }

    #[test]
    fn position_accessors_carry_bounds() {
        let doc = sample_document();
        let out = GltfIo::write(&doc, &WriteOptions::binary()).unwrap();
        let positions = out
            .json
            .accessors
            .iter()
            .find(|a| a.name.as_deref() == Some("positions"))
            .unwrap();
        assert_eq!(
            Some(serde_json::json!([0.0, 0.0, 0.0])),
            positions.min.clone()
        );
        assert_eq!(
            Some(serde_json::json!([1.0, 1.0, 0.0])),
            positions.max.clone()
        );
        // The animation input also carries bounds; the output does not.
        let times = out
            .json
            .accessors
            .iter()
            .find(|a| a.name.as_deref() == Some("times"))
            .unwrap();
        assert!(times.min.is_some());
        let values = out
            .json
            .accessors
            .iter()
            .find(|a| a.name.as_deref() == Some("values"))
            .unwrap();
        assert!(values.min.is_none());
    }

    #[test]
    fn binary_rejects_multiple_buffers() {
        let mut doc = Document::new();
        doc.create_buffer("a");
        doc.create_buffer("b");
        let result = GltfIo::write_binary(&doc, &WriteOptions::binary());
        assert!(matches!(result, Err(Error::MultipleBuffers(2))));
    }

    #[test]
    fn sparse_accessor_round_trip() {
        let mut doc = Document::new();
        let buffer = doc.create_buffer("buffer");
        let accessor = doc.create_accessor("displacement");
        let mut dense = vec![0.0f32; 300];
        dense[30] = 1.5;
        dense[31] = -2.5;
        dense[270] = 4.0;
        doc.accessor_mut(accessor).element_type = ElementType::Vec3;
        doc.accessor_mut(accessor).array = Some(ScalarArray::F32(dense.clone()));
        doc.accessor_mut(accessor).sparse = true;
        doc.set_accessor_buffer(accessor, Some(buffer)).unwrap();

        let out = GltfIo::write(&doc, &WriteOptions::binary()).unwrap();
        let def = &out.json.accessors[0];
        let sparse = def.sparse.as_ref().expect("sparse encoding");
        // Elements 10 and 90 are non-zero; indices fit in one byte.
        assert_eq!(2, sparse.count);

        let back = round_trip(&doc, Format::Binary, VertexLayout::Interleaved);
        let accessor = back.list_accessors()[0];
        assert!(back.accessor(accessor).sparse);
        assert_eq!(
            Some(ScalarArray::F32(dense)),
            back.accessor(accessor).array
        );
    }

    #[test]
    fn zero_filled_sparse_read() {
        // A non-sparse accessor with no buffer view reads as all zeros.
        let mut root = json::Root::default();
        root.asset.version = "2.0".to_owned();
        root.accessors.push(json::Accessor {
            buffer_view: None,
            byte_offset: 0,
            count: 5,
            component_type: json::validation::Checked::Valid(
                json::accessor::GenericComponentType(json::accessor::ComponentType::U16),
            ),
            extensions: None,
            extras: Default::default(),
            type_: json::validation::Checked::Valid(json::accessor::Type::Scalar),
            min: None,
            max: None,
            name: None,
            normalized: false,
            sparse: None,
        });
        let bytes = json::serialize::to_string(&root).unwrap().into_bytes();
        let doc = GltfIo::read_slice(&bytes, ResourceMap::new(), &ReadOptions::default()).unwrap();
        let accessor = doc.list_accessors()[0];
        assert_eq!(Some(ScalarArray::U16(vec![0; 5])), doc.accessor(accessor).array);
    }
}
