//! Converts a [`Document`] back into glTF JSON plus a binary resource map,
//! packing accessors into buffer views by usage.

use byteorder::{ByteOrder, LittleEndian};
use glam::Vec3;
use gltf::json::{self, validation::Checked};
use indexmap::IndexMap;
use tracing::warn;

use crate::document::{
    AccessorData, AccessorUsage, AlphaMode, ComponentType, Document, Interpolation, MagFilter,
    MaterialTexture, MinFilter, PrimitiveMode, Projection, PropertyId, ScalarArray, TargetPath,
    WrapMode,
};
use crate::error::{Error, Result};
use crate::io::{Format, JsonDocument, ResourceMap, VertexLayout, WriteOptions, GLB_BUFFER_URI};

/// How usage-compatible accessors are grouped for buffer-view packing.
/// Vertex attributes are grouped per owning primitive so they can be
/// co-located (interleaved); the rest share one group per usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GroupKey {
    Vertex(PropertyId),
    Index,
    InverseBindMatrices,
    Sparse,
    Other,
}

pub fn write(doc: &Document, options: &WriteOptions) -> Result<JsonDocument> {
    let mut json = json::Root::default();
    let root_data = doc.root_data(doc.root());
    json.asset = json::Asset {
        copyright: None,
        extensions: None,
        extras: Default::default(),
        generator: Some(root_data.generator.clone().unwrap_or_else(|| {
            format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        })),
        min_version: None,
        version: "2.0".to_owned(),
    };
    json.extensions_used = root_data.extensions_used.clone();
    json.extensions_required = root_data.extensions_required.clone();

    let mut resources = ResourceMap::new();

    let buffers = doc.list_buffers();
    let accessors = doc.list_accessors();
    let textures = doc.list_textures();

    if options.format == Format::Binary && buffers.len() > 1 {
        return Err(Error::MultipleBuffers(buffers.len()));
    }
    let needs_buffer = !accessors.is_empty()
        || (options.format == Format::Binary && !textures.is_empty());
    if needs_buffer && buffers.is_empty() {
        return Err(Error::Malformed(
            "buffer required for document resources, but none was found".into(),
        ));
    }

    // Accessors that need min/max bounds: POSITION vertex attributes and
    // animation-sampler inputs, identified by their inbound edge names.
    let needs_bounds = |accessor: PropertyId| {
        doc.graph().incoming_edges(accessor).into_iter().any(|id| {
            doc.graph()
                .edge(id)
                .map(|edge| edge.name == "POSITION" || edge.name == "input")
                .unwrap_or(false)
        })
    };

    // Resolve each accessor's usage from its typed edge attributes; sparse
    // accessors always pack into the sparse group.
    let mut usages: IndexMap<PropertyId, GroupKey> = IndexMap::new();
    for &accessor in &accessors {
        usages.insert(accessor, group_of(doc, accessor)?);
    }

    // Group accessors per buffer; an accessor without an explicit buffer
    // reference falls back to the first buffer.
    let mut accessor_index: IndexMap<PropertyId, usize> = IndexMap::new();
    let mut image_views: Vec<(usize, Vec<u8>)> = Vec::new();
    let mut buffer_lengths = vec![0usize; buffers.len()];

    // Images are emitted first; in container mode their bytes are appended
    // to the single buffer after the accessor views.
    let texture_index: IndexMap<PropertyId, usize> = textures
        .iter()
        .enumerate()
        .map(|(i, &t)| (t, i))
        .collect();
    for (index, &texture) in textures.iter().enumerate() {
        let data = doc.texture(texture);
        let mut image_def = json::Image {
            buffer_view: None,
            mime_type: data.mime_type.clone().map(json::image::MimeType),
            name: name_of(doc, texture),
            uri: None,
            extensions: None,
            extras: extras_of(doc, texture)?,
        };
        match &data.image {
            Some(bytes) => match options.format {
                Format::Binary => {
                    image_views.push((index, bytes.clone()));
                }
                Format::Sidecar => {
                    let uri = format!(
                        "{}_{}.{}",
                        options.basename,
                        index,
                        extension_of(data.mime_type.as_deref())
                    );
                    resources.insert(uri.clone(), bytes.clone());
                    image_def.uri = Some(uri);
                }
            },
            None => warn!(index, "texture has no image and will not be re-exportable"),
        }
        json.images.push(image_def);
    }

    for (buffer_position, &buffer) in buffers.iter().enumerate() {
        let mut data: Vec<u8> = Vec::new();

        let mut groups: IndexMap<GroupKey, Vec<PropertyId>> = IndexMap::new();
        for &accessor in &accessors {
            if accessor_index.contains_key(&accessor) {
                continue;
            }
            let owner = doc.accessor_buffer(accessor);
            let assigned = owner.unwrap_or(buffers[0]);
            if assigned != buffer {
                continue;
            }
            groups.entry(usages[&accessor]).or_default().push(accessor);
        }

        for (key, group) in &groups {
            match key {
                GroupKey::Vertex(_) if options.vertex_layout == VertexLayout::Interleaved => {
                    interleave_accessors(
                        doc,
                        group,
                        buffer_position,
                        &mut data,
                        &mut json,
                        &mut accessor_index,
                        &needs_bounds,
                    )?;
                }
                GroupKey::Vertex(_) => {
                    // Each vertex attribute gets its own tightly-packed view.
                    for &accessor in group {
                        concat_accessors(
                            doc,
                            &[accessor],
                            buffer_position,
                            Some(json::buffer::Target::ArrayBuffer),
                            &mut data,
                            &mut json,
                            &mut accessor_index,
                            &needs_bounds,
                        )?;
                    }
                }
                GroupKey::Index => {
                    concat_accessors(
                        doc,
                        group,
                        buffer_position,
                        Some(json::buffer::Target::ElementArrayBuffer),
                        &mut data,
                        &mut json,
                        &mut accessor_index,
                        &needs_bounds,
                    )?;
                }
                GroupKey::Sparse => {
                    concat_sparse_accessors(
                        doc,
                        group,
                        buffer_position,
                        &mut data,
                        &mut json,
                        &mut accessor_index,
                        &needs_bounds,
                    )?;
                }
                GroupKey::InverseBindMatrices | GroupKey::Other => {
                    concat_accessors(
                        doc,
                        group,
                        buffer_position,
                        None,
                        &mut data,
                        &mut json,
                        &mut accessor_index,
                        &needs_bounds,
                    )?;
                }
            }
        }

        // In container mode the image bytes live in this (single) buffer.
        if options.format == Format::Binary {
            for (image, bytes) in image_views.drain(..) {
                pad_to_4(&mut data, 0);
                json.buffer_views.push(json::buffer::View {
                    buffer: json::Index::new(buffer_position as u32),
                    byte_length: bytes.len() as u32,
                    byte_offset: Some(data.len() as u32),
                    byte_stride: None,
                    name: None,
                    target: None,
                    extensions: None,
                    extras: Default::default(),
                });
                json.images[image].buffer_view =
                    Some(json::Index::new(json.buffer_views.len() as u32 - 1));
                data.extend_from_slice(&bytes);
            }
        }

        buffer_lengths[buffer_position] = data.len();
        let uri = match options.format {
            Format::Binary => {
                resources.insert(GLB_BUFFER_URI.to_owned(), data);
                None
            }
            Format::Sidecar => {
                let uri = doc
                    .buffer(buffer)
                    .uri
                    .clone()
                    .unwrap_or_else(|| match buffer_position {
                        0 => format!("{}.bin", options.basename),
                        n => format!("{}_{}.bin", options.basename, n),
                    });
                resources.insert(uri.clone(), data);
                Some(uri)
            }
        };
        json.buffers.push(json::Buffer {
            byte_length: buffer_lengths[buffer_position] as u32,
            uri,
            name: name_of(doc, buffer),
            extensions: None,
            extras: extras_of(doc, buffer)?,
        });
    }

    // Materials, with deduplicated sampler and texture definitions.
    let mut sampler_cache: IndexMap<SamplerKey, usize> = IndexMap::new();
    let mut texture_cache: IndexMap<(usize, usize), usize> = IndexMap::new();
    let materials = doc.list_materials();
    let material_index: IndexMap<PropertyId, usize> = materials
        .iter()
        .enumerate()
        .map(|(i, &m)| (m, i))
        .collect();
    for &material in &materials {
        let def = write_material(
            doc,
            material,
            &texture_index,
            &mut sampler_cache,
            &mut texture_cache,
            &mut json,
        )?;
        json.materials.push(def);
    }

    // Meshes.
    let meshes = doc.list_meshes();
    let mesh_index: IndexMap<PropertyId, usize> =
        meshes.iter().enumerate().map(|(i, &m)| (m, i)).collect();
    for &mesh in &meshes {
        let def = write_mesh(doc, mesh, &accessor_index, &material_index)?;
        json.meshes.push(def);
    }

    // Cameras.
    let cameras = doc.list_cameras();
    let camera_index: IndexMap<PropertyId, usize> =
        cameras.iter().enumerate().map(|(i, &c)| (c, i)).collect();
    for &camera in &cameras {
        json.cameras.push(write_camera(doc, camera)?);
    }

    // Nodes and skins reference each other; indices are list positions.
    let nodes = doc.list_nodes();
    let node_index: IndexMap<PropertyId, usize> =
        nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let skins = doc.list_skins();
    let skin_index: IndexMap<PropertyId, usize> =
        skins.iter().enumerate().map(|(i, &s)| (s, i)).collect();

    for &node in &nodes {
        let data = doc.node(node);
        let children: Vec<json::Index<json::Node>> = doc
            .node_children(node)
            .iter()
            .map(|child| json::Index::new(node_index[child] as u32))
            .collect();
        json.nodes.push(json::Node {
            camera: doc
                .node_camera(node)
                .map(|c| json::Index::new(camera_index[&c] as u32)),
            children: (!children.is_empty()).then(|| children),
            matrix: None,
            mesh: doc
                .node_mesh(node)
                .map(|m| json::Index::new(mesh_index[&m] as u32)),
            rotation: (data.rotation != glam::Quat::IDENTITY).then(|| {
                json::scene::UnitQuaternion(glam::Vec4::from(data.rotation).to_array())
            }),
            scale: (data.scale != Vec3::ONE).then(|| data.scale.to_array()),
            translation: (data.translation != Vec3::ZERO).then(|| data.translation.to_array()),
            skin: doc
                .node_skin(node)
                .map(|s| json::Index::new(skin_index[&s] as u32)),
            weights: (!data.weights.is_empty()).then(|| data.weights.clone()),
            name: name_of(doc, node),
            extensions: None,
            extras: extras_of(doc, node)?,
        });
    }

    for &skin in &skins {
        json.skins.push(json::Skin {
            inverse_bind_matrices: doc
                .skin_inverse_bind_matrices(skin)
                .map(|a| json::Index::new(accessor_index[&a] as u32)),
            joints: doc
                .skin_joints(skin)
                .iter()
                .map(|j| json::Index::new(node_index[j] as u32))
                .collect(),
            skeleton: doc
                .skin_skeleton(skin)
                .map(|n| json::Index::new(node_index[&n] as u32)),
            name: name_of(doc, skin),
            extensions: None,
            extras: extras_of(doc, skin)?,
        });
    }

    // Animations; sampler indices are local to each animation.
    for &animation in &doc.list_animations() {
        json.animations
            .push(write_animation(doc, animation, &accessor_index, &node_index)?);
    }

    // Scenes and the default scene.
    let scenes = doc.list_scenes();
    let scene_index: IndexMap<PropertyId, usize> =
        scenes.iter().enumerate().map(|(i, &s)| (s, i)).collect();
    for &scene in &scenes {
        json.scenes.push(json::Scene {
            nodes: doc
                .scene_children(scene)
                .iter()
                .map(|n| json::Index::new(node_index[n] as u32))
                .collect(),
            name: name_of(doc, scene),
            extensions: None,
            extras: extras_of(doc, scene)?,
        });
    }
    json.scene = doc
        .default_scene()
        .map(|s| json::Index::new(scene_index[&s] as u32));

    Ok(JsonDocument { json, resources })
}

/// Usage group of one accessor. Conflicting usages are a contract violation.
fn group_of(doc: &Document, accessor: PropertyId) -> Result<GroupKey> {
    if doc.accessor(accessor).sparse {
        return Ok(GroupKey::Sparse);
    }
    let mut resolved: Option<(AccessorUsage, PropertyId)> = None;
    for id in doc.graph().incoming_edges(accessor) {
        let edge = match doc.graph().edge(id) {
            Some(edge) => edge,
            None => continue,
        };
        let usage = match edge.attrs.usage {
            Some(usage) => usage,
            None => continue,
        };
        match resolved {
            Some((existing, _)) if existing != usage => {
                return Err(Error::UsageConflict(existing, usage));
            }
            Some(_) => {}
            None => resolved = Some((usage, edge.owner)),
        }
    }
    Ok(match resolved {
        Some((AccessorUsage::VertexAttribute, owner)) => GroupKey::Vertex(owner),
        Some((AccessorUsage::Index, _)) => GroupKey::Index,
        Some((AccessorUsage::InverseBindMatrices, _)) => GroupKey::InverseBindMatrices,
        Some((AccessorUsage::Sparse, _)) | Some((AccessorUsage::Other, _)) | None => {
            GroupKey::Other
        }
    })
}

fn create_accessor_def(
    doc: &Document,
    accessor: PropertyId,
    needs_bounds: bool,
) -> Result<json::Accessor> {
    let data = doc.accessor(accessor);
    let (min, max) = if needs_bounds {
        match data.min_max() {
            // Bounds are emitted with 32-bit float precision.
            Some((min, max)) => (
                Some(json_bounds(&min)),
                Some(json_bounds(&max)),
            ),
            None => (None, None),
        }
    } else {
        (None, None)
    };
    Ok(json::Accessor {
        buffer_view: None,
        byte_offset: 0,
        count: data.count() as u32,
        component_type: Checked::Valid(json::accessor::GenericComponentType(component_type_json(
            data.component_type(),
        ))),
        extensions: None,
        extras: extras_of(doc, accessor)?,
        type_: Checked::Valid(element_type_json(data)),
        min,
        max,
        name: name_of(doc, accessor),
        normalized: data.normalized,
        sparse: None,
    })
}

fn json_bounds(values: &[f64]) -> serde_json::Value {
    values
        .iter()
        .map(|&v| v as f32)
        .collect::<Vec<f32>>()
        .into()
}

/// Concatenates a group of accessors into one tightly-packed buffer view,
/// each accessor padded to a 4-byte boundary.
#[allow(clippy::too_many_arguments)]
fn concat_accessors(
    doc: &Document,
    group: &[PropertyId],
    buffer_position: usize,
    target: Option<json::buffer::Target>,
    data: &mut Vec<u8>,
    json: &mut json::Root,
    accessor_index: &mut IndexMap<PropertyId, usize>,
    needs_bounds: &dyn Fn(PropertyId) -> bool,
) -> Result<()> {
    pad_to_4(data, 0);
    let view_index = json.buffer_views.len();
    let view_offset = data.len();
    let mut view_length = 0usize;

    for &accessor in group {
        let mut def = create_accessor_def(doc, accessor, needs_bounds(accessor))?;
        def.buffer_view = Some(json::Index::new(view_index as u32));
        def.byte_offset = view_length as u32;
        let mut bytes = array_bytes(doc.accessor(accessor).array.as_ref());
        pad_to_4(&mut bytes, 0);
        view_length += bytes.len();
        data.extend_from_slice(&bytes);
        accessor_index.insert(accessor, json.accessors.len());
        json.accessors.push(def);
    }

    json.buffer_views.push(json::buffer::View {
        buffer: json::Index::new(buffer_position as u32),
        byte_length: view_length as u32,
        byte_offset: Some(view_offset as u32),
        byte_stride: None,
        name: None,
        target: target.map(Checked::Valid),
        extensions: None,
        extras: Default::default(),
    });
    Ok(())
}

/// Lays a vertex-attribute group out fully interleaved: a single stride is
/// the sum of each attribute's padded element size, written one attribute at
/// a time per vertex.
#[allow(clippy::too_many_arguments)]
fn interleave_accessors(
    doc: &Document,
    group: &[PropertyId],
    buffer_position: usize,
    data: &mut Vec<u8>,
    json: &mut json::Root,
    accessor_index: &mut IndexMap<PropertyId, usize>,
    needs_bounds: &dyn Fn(PropertyId) -> bool,
) -> Result<()> {
    pad_to_4(data, 0);
    let view_index = json.buffer_views.len();
    let view_offset = data.len();
    let vertex_count = doc.accessor(group[0]).count();

    let mut byte_stride = 0usize;
    for &accessor in group {
        let mut def = create_accessor_def(doc, accessor, needs_bounds(accessor))?;
        def.buffer_view = Some(json::Index::new(view_index as u32));
        def.byte_offset = byte_stride as u32;
        let acc = doc.accessor(accessor);
        byte_stride += padded_4(acc.element_size() * acc.component_type().byte_size());
        accessor_index.insert(accessor, json.accessors.len());
        json.accessors.push(def);
    }

    let byte_length = vertex_count * byte_stride;
    let mut interleaved = vec![0u8; byte_length];
    for i in 0..vertex_count {
        let mut vertex_offset = 0usize;
        for &accessor in group {
            let acc = doc.accessor(accessor);
            let array = match acc.array.as_ref() {
                Some(array) => array,
                None => continue,
            };
            let element_size = acc.element_size();
            let component = acc.component_type().byte_size();
            for j in 0..element_size {
                let at = i * byte_stride + vertex_offset + j * component;
                write_component(&mut interleaved[at..], array, i * element_size + j);
            }
            vertex_offset += padded_4(element_size * component);
        }
    }
    data.extend_from_slice(&interleaved);

    json.buffer_views.push(json::buffer::View {
        buffer: json::Index::new(buffer_position as u32),
        byte_length: byte_length as u32,
        byte_offset: Some(view_offset as u32),
        byte_stride: Some(byte_stride as u32),
        name: None,
        target: Some(Checked::Valid(json::buffer::Target::ArrayBuffer)),
        extensions: None,
        extras: Default::default(),
    });
    Ok(())
}

/// Sparse packing: only elements differing from an all-zero base are kept,
/// as (index, value) pairs in two shared buffer views. The index width is
/// the smallest unsigned type covering the maximum referenced index.
#[allow(clippy::too_many_arguments)]
fn concat_sparse_accessors(
    doc: &Document,
    group: &[PropertyId],
    buffer_position: usize,
    data: &mut Vec<u8>,
    json: &mut json::Root,
    accessor_index: &mut IndexMap<PropertyId, usize>,
    needs_bounds: &dyn Fn(PropertyId) -> bool,
) -> Result<()> {
    struct SparseEntry {
        def_index: usize,
        indices: Vec<usize>,
        values: ScalarArray,
        indices_offset: usize,
        values_offset: usize,
    }

    let mut entries: Vec<SparseEntry> = Vec::new();
    let mut max_index: Option<usize> = None;
    let mut oversized = false;

    for &accessor in group {
        let def = create_accessor_def(doc, accessor, needs_bounds(accessor))?;
        accessor_index.insert(accessor, json.accessors.len());
        json.accessors.push(def);

        let acc = doc.accessor(accessor);
        let array = match acc.array.as_ref() {
            Some(array) => array,
            None => continue,
        };
        let element_size = acc.element_size();
        let count = acc.count();
        let mut indices = Vec::new();
        let mut values = Vec::new();
        for i in 0..count {
            let mut non_zero = false;
            for j in 0..element_size {
                if array.get(i * element_size + j) != 0.0 {
                    non_zero = true;
                    break;
                }
            }
            if !non_zero {
                continue;
            }
            indices.push(i);
            for j in 0..element_size {
                values.push(array.get(i * element_size + j));
            }
        }
        if indices.is_empty() {
            continue;
        }
        if indices.len() > count / 2 {
            oversized = true;
        }
        max_index = Some(max_index.map_or(indices[indices.len() - 1], |m| {
            m.max(indices[indices.len() - 1])
        }));

        let mut value_array = zero_like(acc.component_type(), values.len());
        for (k, &value) in values.iter().enumerate() {
            value_array.set(k, value);
        }
        entries.push(SparseEntry {
            def_index: json.accessors.len() - 1,
            indices,
            values: value_array,
            indices_offset: 0,
            values_offset: 0,
        });
    }

    let max_index = match max_index {
        Some(max) => max,
        // Every accessor in the group was all-zero; no views are needed.
        None => return Ok(()),
    };
    if oversized {
        warn!("sparse accessors with >50% non-zero elements may increase file size");
    }

    let index_type = if max_index < 255 {
        ComponentType::U8
    } else if max_index < 65535 {
        ComponentType::U16
    } else {
        ComponentType::U32
    };

    // Indices view.
    pad_to_4(data, 0);
    let indices_view_offset = data.len();
    let mut indices_view_length = 0usize;
    for entry in &mut entries {
        entry.indices_offset = indices_view_length;
        let mut index_array = zero_like(index_type, entry.indices.len());
        for (k, &index) in entry.indices.iter().enumerate() {
            index_array.set(k, index as f64);
        }
        let mut bytes = array_bytes(Some(&index_array));
        pad_to_4(&mut bytes, 0);
        indices_view_length += bytes.len();
        data.extend_from_slice(&bytes);
    }
    json.buffer_views.push(json::buffer::View {
        buffer: json::Index::new(buffer_position as u32),
        byte_length: indices_view_length as u32,
        byte_offset: Some(indices_view_offset as u32),
        byte_stride: None,
        name: None,
        target: None,
        extensions: None,
        extras: Default::default(),
    });
    let indices_view = json.buffer_views.len() - 1;

    // Values view.
    let values_view_offset = data.len();
    let mut values_view_length = 0usize;
    for entry in &mut entries {
        entry.values_offset = values_view_length;
        let mut bytes = array_bytes(Some(&entry.values));
        pad_to_4(&mut bytes, 0);
        values_view_length += bytes.len();
        data.extend_from_slice(&bytes);
    }
    json.buffer_views.push(json::buffer::View {
        buffer: json::Index::new(buffer_position as u32),
        byte_length: values_view_length as u32,
        byte_offset: Some(values_view_offset as u32),
        byte_stride: None,
        name: None,
        target: None,
        extensions: None,
        extras: Default::default(),
    });
    let values_view = json.buffer_views.len() - 1;

    for entry in &entries {
        json.accessors[entry.def_index].sparse = Some(json::accessor::sparse::Sparse {
            count: entry.indices.len() as u32,
            indices: json::accessor::sparse::Indices {
                buffer_view: json::Index::new(indices_view as u32),
                byte_offset: entry.indices_offset as u32,
                component_type: Checked::Valid(json::accessor::IndexComponentType(
                    component_type_json(index_type),
                )),
                extensions: None,
                extras: Default::default(),
            },
            values: json::accessor::sparse::Values {
                buffer_view: json::Index::new(values_view as u32),
                byte_offset: entry.values_offset as u32,
                extensions: None,
                extras: Default::default(),
            },
            extensions: None,
            extras: Default::default(),
        });
    }
    Ok(())
}

type SamplerKey = (Option<MagFilter>, Option<MinFilter>, WrapMode, WrapMode);

fn write_material(
    doc: &Document,
    material: PropertyId,
    texture_index: &IndexMap<PropertyId, usize>,
    sampler_cache: &mut IndexMap<SamplerKey, usize>,
    texture_cache: &mut IndexMap<(usize, usize), usize>,
    json: &mut json::Root,
) -> Result<json::Material> {
    let data = doc.material(material);
    let mut def = json::Material {
        alpha_cutoff: Some(json::material::AlphaCutoff(data.alpha_cutoff)),
        alpha_mode: Checked::Valid(match data.alpha_mode {
            AlphaMode::Opaque => json::material::AlphaMode::Opaque,
            AlphaMode::Mask => json::material::AlphaMode::Mask,
            AlphaMode::Blend => json::material::AlphaMode::Blend,
        }),
        double_sided: data.double_sided,
        name: name_of(doc, material),
        pbr_metallic_roughness: json::material::PbrMetallicRoughness {
            base_color_factor: json::material::PbrBaseColorFactor(data.base_color_factor),
            base_color_texture: None,
            metallic_factor: json::material::StrengthFactor(data.metallic_factor),
            roughness_factor: json::material::StrengthFactor(data.roughness_factor),
            metallic_roughness_texture: None,
            extensions: None,
            extras: Default::default(),
        },
        normal_texture: None,
        occlusion_texture: None,
        emissive_texture: None,
        emissive_factor: json::material::EmissiveFactor(data.emissive_factor),
        extensions: None,
        extras: extras_of(doc, material)?,
    };

    let mut slot_def = |doc: &Document,
                        slot: MaterialTexture,
                        json: &mut json::Root|
     -> Result<Option<(u32, u32)>> {
        let texture = match doc.material_texture(material, slot) {
            Some(texture) => texture,
            None => return Ok(None),
        };
        let info = doc.material_texture_info(material, slot);
        let info_data = doc.texture_info(info);
        let key: SamplerKey = (
            info_data.mag_filter,
            info_data.min_filter,
            info_data.wrap_s,
            info_data.wrap_t,
        );
        let sampler = *sampler_cache.entry(key).or_insert_with(|| {
            json.samplers.push(json::texture::Sampler {
                mag_filter: info_data.mag_filter.map(|f| {
                    Checked::Valid(match f {
                        MagFilter::Nearest => json::texture::MagFilter::Nearest,
                        MagFilter::Linear => json::texture::MagFilter::Linear,
                    })
                }),
                min_filter: info_data.min_filter.map(|f| Checked::Valid(min_filter_json(f))),
                wrap_s: Checked::Valid(wrap_json(info_data.wrap_s)),
                wrap_t: Checked::Valid(wrap_json(info_data.wrap_t)),
                name: None,
                extensions: None,
                extras: Default::default(),
            });
            json.samplers.len() - 1
        });
        let image = texture_index[&texture];
        let texture_def = *texture_cache.entry((image, sampler)).or_insert_with(|| {
            json.textures.push(json::Texture {
                sampler: Some(json::Index::new(sampler as u32)),
                source: json::Index::new(image as u32),
                name: None,
                extensions: None,
                extras: Default::default(),
            });
            json.textures.len() - 1
        });
        Ok(Some((texture_def as u32, info_data.tex_coord)))
    };

    if let Some((index, tex_coord)) = slot_def(doc, MaterialTexture::BaseColor, json)? {
        def.pbr_metallic_roughness.base_color_texture = Some(texture_info(index, tex_coord));
    }
    if let Some((index, tex_coord)) = slot_def(doc, MaterialTexture::MetallicRoughness, json)? {
        def.pbr_metallic_roughness.metallic_roughness_texture =
            Some(texture_info(index, tex_coord));
    }
    if let Some((index, tex_coord)) = slot_def(doc, MaterialTexture::Normal, json)? {
        def.normal_texture = Some(json::material::NormalTexture {
            index: json::Index::new(index),
            scale: data.normal_scale,
            tex_coord,
            extensions: None,
            extras: Default::default(),
        });
    }
    if let Some((index, tex_coord)) = slot_def(doc, MaterialTexture::Occlusion, json)? {
        def.occlusion_texture = Some(json::material::OcclusionTexture {
            index: json::Index::new(index),
            strength: json::material::StrengthFactor(data.occlusion_strength),
            tex_coord,
            extensions: None,
            extras: Default::default(),
        });
    }
    if let Some((index, tex_coord)) = slot_def(doc, MaterialTexture::Emissive, json)? {
        def.emissive_texture = Some(texture_info(index, tex_coord));
    }
    Ok(def)
}

fn texture_info(index: u32, tex_coord: u32) -> json::texture::Info {
    json::texture::Info {
        index: json::Index::new(index),
        tex_coord,
        extensions: None,
        extras: Default::default(),
    }
}

fn write_mesh(
    doc: &Document,
    mesh: PropertyId,
    accessor_index: &IndexMap<PropertyId, usize>,
    material_index: &IndexMap<PropertyId, usize>,
) -> Result<json::Mesh> {
    let data = doc.mesh(mesh);
    let mut primitives = Vec::new();
    for primitive in doc.mesh_primitives(mesh) {
        let mut attributes = std::collections::HashMap::new();
        for (semantic, accessor) in doc.primitive_attributes(primitive) {
            let semantic = match parse_semantic(&semantic) {
                Some(semantic) => semantic,
                None => {
                    warn!(semantic = semantic.as_str(), "skipping unknown attribute");
                    continue;
                }
            };
            attributes.insert(
                Checked::Valid(semantic),
                json::Index::new(accessor_index[&accessor] as u32),
            );
        }

        let targets: Vec<json::mesh::MorphTarget> = doc
            .primitive_targets(primitive)
            .iter()
            .map(|&target| {
                let mut def = json::mesh::MorphTarget {
                    positions: None,
                    normals: None,
                    tangents: None,
                };
                for (semantic, accessor) in doc.target_attributes(target) {
                    let index = Some(json::Index::new(accessor_index[&accessor] as u32));
                    match semantic.as_str() {
                        "POSITION" => def.positions = index,
                        "NORMAL" => def.normals = index,
                        "TANGENT" => def.tangents = index,
                        other => warn!(semantic = other, "skipping unknown morph attribute"),
                    }
                }
                def
            })
            .collect();

        primitives.push(json::mesh::Primitive {
            attributes,
            extensions: None,
            extras: Default::default(),
            indices: doc
                .primitive_indices(primitive)
                .map(|a| json::Index::new(accessor_index[&a] as u32)),
            material: doc
                .primitive_material(primitive)
                .map(|m| json::Index::new(material_index[&m] as u32)),
            mode: Checked::Valid(mode_json(doc.primitive(primitive).mode)),
            targets: (!targets.is_empty()).then(|| targets),
        });
    }
    Ok(json::Mesh {
        extensions: None,
        extras: extras_of(doc, mesh)?,
        name: name_of(doc, mesh),
        primitives,
        weights: (!data.weights.is_empty()).then(|| data.weights.clone()),
    })
}

fn write_camera(doc: &Document, camera: PropertyId) -> Result<json::Camera> {
    let (type_, perspective, orthographic) = match doc.camera(camera).projection {
        Projection::Perspective {
            znear,
            zfar,
            yfov,
            aspect,
        } => (
            json::camera::Type::Perspective,
            Some(json::camera::Perspective {
                aspect_ratio: aspect,
                yfov,
                zfar,
                znear,
                extensions: None,
                extras: Default::default(),
            }),
            None,
        ),
        Projection::Orthographic {
            znear,
            zfar,
            xmag,
            ymag,
        } => (
            json::camera::Type::Orthographic,
            None,
            Some(json::camera::Orthographic {
                xmag,
                ymag,
                zfar,
                znear,
                extensions: None,
                extras: Default::default(),
            }),
        ),
    };
    Ok(json::Camera {
        name: name_of(doc, camera),
        orthographic,
        perspective,
        type_: Checked::Valid(type_),
        extensions: None,
        extras: extras_of(doc, camera)?,
    })
}

fn write_animation(
    doc: &Document,
    animation: PropertyId,
    accessor_index: &IndexMap<PropertyId, usize>,
    node_index: &IndexMap<PropertyId, usize>,
) -> Result<json::Animation> {
    let samplers = doc.animation_samplers(animation);
    let sampler_index: IndexMap<PropertyId, usize> = samplers
        .iter()
        .enumerate()
        .map(|(i, &s)| (s, i))
        .collect();

    let mut sampler_defs = Vec::new();
    for &sampler in &samplers {
        let data = doc.sampler(sampler);
        let input = doc.sampler_input(sampler).ok_or_else(|| {
            Error::Malformed("animation sampler has no input accessor".into())
        })?;
        let output = doc.sampler_output(sampler).ok_or_else(|| {
            Error::Malformed("animation sampler has no output accessor".into())
        })?;
        sampler_defs.push(json::animation::Sampler {
            extensions: None,
            extras: Default::default(),
            input: json::Index::new(accessor_index[&input] as u32),
            interpolation: Checked::Valid(match data.interpolation {
                Interpolation::Linear => gltf::animation::Interpolation::Linear,
                Interpolation::Step => gltf::animation::Interpolation::Step,
                Interpolation::CubicSpline => gltf::animation::Interpolation::CubicSpline,
            }),
            output: json::Index::new(accessor_index[&output] as u32),
        });
    }

    let mut channel_defs = Vec::new();
    for channel in doc.animation_channels(animation) {
        let sampler = doc.channel_sampler(channel);
        let target_node = doc.channel_target_node(channel);
        let path = doc.channel(channel).target_path;
        let (sampler, target_node, path) = match (sampler, target_node, path) {
            (Some(s), Some(n), Some(p)) => (s, n, p),
            _ => {
                warn!("skipping animation channel with unset sampler or target");
                continue;
            }
        };
        channel_defs.push(json::animation::Channel {
            sampler: json::Index::new(sampler_index[&sampler] as u32),
            target: json::animation::Target {
                extensions: None,
                extras: Default::default(),
                node: json::Index::new(node_index[&target_node] as u32),
                path: Checked::Valid(match path {
                    TargetPath::Translation => gltf::animation::Property::Translation,
                    TargetPath::Rotation => gltf::animation::Property::Rotation,
                    TargetPath::Scale => gltf::animation::Property::Scale,
                    TargetPath::Weights => gltf::animation::Property::MorphTargetWeights,
                }),
            },
            extensions: None,
            extras: Default::default(),
        });
    }

    Ok(json::Animation {
        extensions: None,
        extras: extras_of(doc, animation)?,
        channels: channel_defs,
        name: name_of(doc, animation),
        samplers: sampler_defs,
    })
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

fn name_of(doc: &Document, id: PropertyId) -> Option<String> {
    let name = doc.name(id);
    (!name.is_empty()).then(|| name.to_owned())
}

fn extras_of(doc: &Document, id: PropertyId) -> Result<json::Extras> {
    match doc.extras(id) {
        Some(value) => {
            let raw = serde_json::value::RawValue::from_string(serde_json::to_string(value)?)?;
            Ok(Some(raw))
        }
        None => Ok(None),
    }
}

fn padded_4(len: usize) -> usize {
    (len + 3) & !3
}

fn pad_to_4(data: &mut Vec<u8>, fill: u8) {
    while data.len() % 4 != 0 {
        data.push(fill);
    }
}

fn zero_like(component_type: ComponentType, len: usize) -> ScalarArray {
    match component_type {
        ComponentType::I8 => ScalarArray::I8(vec![0; len]),
        ComponentType::U8 => ScalarArray::U8(vec![0; len]),
        ComponentType::I16 => ScalarArray::I16(vec![0; len]),
        ComponentType::U16 => ScalarArray::U16(vec![0; len]),
        ComponentType::U32 => ScalarArray::U32(vec![0; len]),
        ComponentType::F32 => ScalarArray::F32(vec![0.0; len]),
    }
}

fn array_bytes(array: Option<&ScalarArray>) -> Vec<u8> {
    let array = match array {
        Some(array) => array,
        None => return Vec::new(),
    };
    match array {
        ScalarArray::I8(v) => v.iter().map(|&x| x as u8).collect(),
        ScalarArray::U8(v) => v.clone(),
        ScalarArray::I16(v) => {
            let mut out = vec![0u8; v.len() * 2];
            LittleEndian::write_i16_into(v, &mut out);
            out
        }
        ScalarArray::U16(v) => {
            let mut out = vec![0u8; v.len() * 2];
            LittleEndian::write_u16_into(v, &mut out);
            out
        }
        ScalarArray::U32(v) => {
            let mut out = vec![0u8; v.len() * 4];
            LittleEndian::write_u32_into(v, &mut out);
            out
        }
        ScalarArray::F32(v) => {
            let mut out = vec![0u8; v.len() * 4];
            LittleEndian::write_f32_into(v, &mut out);
            out
        }
    }
}

fn write_component(dst: &mut [u8], array: &ScalarArray, index: usize) {
    match array {
        ScalarArray::I8(v) => dst[0] = v[index] as u8,
        ScalarArray::U8(v) => dst[0] = v[index],
        ScalarArray::I16(v) => LittleEndian::write_i16(dst, v[index]),
        ScalarArray::U16(v) => LittleEndian::write_u16(dst, v[index]),
        ScalarArray::U32(v) => LittleEndian::write_u32(dst, v[index]),
        ScalarArray::F32(v) => LittleEndian::write_f32(dst, v[index]),
    }
}

fn component_type_json(component_type: ComponentType) -> json::accessor::ComponentType {
    match component_type {
        ComponentType::I8 => json::accessor::ComponentType::I8,
        ComponentType::U8 => json::accessor::ComponentType::U8,
        ComponentType::I16 => json::accessor::ComponentType::I16,
        ComponentType::U16 => json::accessor::ComponentType::U16,
        ComponentType::U32 => json::accessor::ComponentType::U32,
        ComponentType::F32 => json::accessor::ComponentType::F32,
    }
}

fn element_type_json(data: &AccessorData) -> json::accessor::Type {
    match data.element_type {
        crate::document::ElementType::Scalar => json::accessor::Type::Scalar,
        crate::document::ElementType::Vec2 => json::accessor::Type::Vec2,
        crate::document::ElementType::Vec3 => json::accessor::Type::Vec3,
        crate::document::ElementType::Vec4 => json::accessor::Type::Vec4,
        crate::document::ElementType::Mat2 => json::accessor::Type::Mat2,
        crate::document::ElementType::Mat3 => json::accessor::Type::Mat3,
        crate::document::ElementType::Mat4 => json::accessor::Type::Mat4,
    }
}

fn mode_json(mode: PrimitiveMode) -> json::mesh::Mode {
    match mode {
        PrimitiveMode::Points => json::mesh::Mode::Points,
        PrimitiveMode::Lines => json::mesh::Mode::Lines,
        PrimitiveMode::LineLoop => json::mesh::Mode::LineLoop,
        PrimitiveMode::LineStrip => json::mesh::Mode::LineStrip,
        PrimitiveMode::Triangles => json::mesh::Mode::Triangles,
        PrimitiveMode::TriangleStrip => json::mesh::Mode::TriangleStrip,
        PrimitiveMode::TriangleFan => json::mesh::Mode::TriangleFan,
    }
}

fn min_filter_json(filter: MinFilter) -> json::texture::MinFilter {
    match filter {
        MinFilter::Nearest => json::texture::MinFilter::Nearest,
        MinFilter::Linear => json::texture::MinFilter::Linear,
        MinFilter::NearestMipmapNearest => json::texture::MinFilter::NearestMipmapNearest,
        MinFilter::LinearMipmapNearest => json::texture::MinFilter::LinearMipmapNearest,
        MinFilter::NearestMipmapLinear => json::texture::MinFilter::NearestMipmapLinear,
        MinFilter::LinearMipmapLinear => json::texture::MinFilter::LinearMipmapLinear,
    }
}

fn wrap_json(wrap: WrapMode) -> json::texture::WrappingMode {
    match wrap {
        WrapMode::ClampToEdge => json::texture::WrappingMode::ClampToEdge,
        WrapMode::MirroredRepeat => json::texture::WrappingMode::MirroredRepeat,
        WrapMode::Repeat => json::texture::WrappingMode::Repeat,
    }
}

fn parse_semantic(semantic: &str) -> Option<json::mesh::Semantic> {
    use json::mesh::Semantic;
    let parse_set = |name: &str| name.parse::<u32>().ok();
    Some(match semantic {
        "POSITION" => Semantic::Positions,
        "NORMAL" => Semantic::Normals,
        "TANGENT" => Semantic::Tangents,
        _ => {
            if let Some(rest) = semantic.strip_prefix("COLOR_") {
                Semantic::Colors(parse_set(rest)?)
            } else if let Some(rest) = semantic.strip_prefix("TEXCOORD_") {
                Semantic::TexCoords(parse_set(rest)?)
            } else if let Some(rest) = semantic.strip_prefix("JOINTS_") {
                Semantic::Joints(parse_set(rest)?)
            } else if let Some(rest) = semantic.strip_prefix("WEIGHTS_") {
                Semantic::Weights(parse_set(rest)?)
            } else if let Some(rest) = semantic.strip_prefix('_') {
                Semantic::Extras(rest.to_owned())
            } else {
                return None;
            }
        }
    })
}

fn extension_of(mime: Option<&str>) -> &'static str {
    match mime {
        Some("image/png") => "png",
        Some("image/jpeg") => "jpg",
        _ => "bin",
    }
}
