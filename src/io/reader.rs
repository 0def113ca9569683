//! Converts a parsed glTF JSON description plus a binary resource map into
//! the in-memory [`Document`] graph.

use byteorder::{ByteOrder, LittleEndian};
use gltf::json::{self, validation::Checked};
use tracing::warn;

use crate::document::{
    AlphaMode, ComponentType, Document, ElementType, Interpolation, MagFilter, MaterialTexture,
    MinFilter, PrimitiveMode, Projection, PropertyId, ScalarArray, TargetPath, WrapMode,
};
use crate::error::{Error, Result};
use crate::io::{ReadOptions, ResourceMap, GLB_BUFFER_URI};

const SUPPORTED_VERSION: &str = "2.0";

/// Reads a document, in strict dependency order: buffers, buffer views,
/// accessors (sparse deferred), textures, materials, meshes, cameras, nodes
/// (two passes, since a child may be declared before its parent), skins,
/// animations, scenes.
pub fn read(root: &json::Root, resources: &ResourceMap, options: &ReadOptions) -> Result<Document> {
    if root.asset.version != SUPPORTED_VERSION {
        return Err(Error::UnsupportedVersion(root.asset.version.clone()));
    }
    // No extensions are registered for I/O.
    if let Some(required) = root.extensions_required.first() {
        return Err(Error::MissingRequiredExtension(required.clone()));
    }
    for used in &root.extensions_used {
        warn!(extension = used.as_str(), "extension is used but not registered");
    }

    let mut doc = Document::new();
    {
        let data = doc.root_data_mut(doc.root());
        data.extensions_used = root.extensions_used.clone();
        data.extensions_required = root.extensions_required.clone();
    }

    // Buffers.
    let mut buffers = Vec::new();
    let mut buffer_bytes = Vec::new();
    for def in &root.buffers {
        let id = doc.create_buffer(def.name.as_deref().unwrap_or(""));
        apply_extras(&mut doc, id, &def.extras);
        if let Some(uri) = &def.uri {
            if !uri.starts_with("data:") && uri != GLB_BUFFER_URI {
                doc.buffer_mut(id).uri = Some(uri.clone());
            }
        }
        buffer_bytes.push(resolve_buffer(def, resources)?);
        buffers.push(id);
    }

    // Buffer views become plain byte windows.
    let mut views = Vec::new();
    for def in &root.buffer_views {
        let bytes = &buffer_bytes[def.buffer.value()];
        let offset = def.byte_offset.unwrap_or(0) as usize;
        let length = def.byte_length as usize;
        if offset + length > bytes.len() {
            return Err(Error::Malformed("buffer view out of bounds".into()));
        }
        views.push(bytes[offset..offset + length].to_vec());
    }

    // Accessors; sparse overlays and zero-filled stores are resolved last.
    let mut accessors = Vec::new();
    for def in &root.accessors {
        let id = read_accessor(&mut doc, def, root, &views, &buffers)?;
        accessors.push(id);
    }

    // Textures, one per image.
    let mut textures = Vec::new();
    for def in &root.images {
        let id = read_image(&mut doc, def, &views, resources, options)?;
        textures.push(id);
    }

    // Materials.
    let mut materials = Vec::new();
    for def in &root.materials {
        let id = read_material(&mut doc, def, root, &textures)?;
        materials.push(id);
    }

    // Meshes.
    let mut meshes = Vec::new();
    for def in &root.meshes {
        let id = read_mesh(&mut doc, def, &accessors, &materials)?;
        meshes.push(id);
    }

    // Cameras.
    let mut cameras = Vec::new();
    for def in &root.cameras {
        let id = read_camera(&mut doc, def)?;
        cameras.push(id);
    }

    // Nodes, first pass: local transforms only.
    let mut nodes = Vec::new();
    for def in &root.nodes {
        let id = doc.create_node(def.name.as_deref().unwrap_or(""));
        apply_extras(&mut doc, id, &def.extras);
        {
            let data = doc.node_mut(id);
            if let Some(matrix) = def.matrix {
                let (translation, rotation, scale) =
                    crate::document::math::decompose(glam::Mat4::from_cols_array(&matrix));
                data.translation = translation;
                data.rotation = rotation;
                data.scale = scale;
            } else {
                if let Some(t) = def.translation {
                    data.translation = t.into();
                }
                if let Some(r) = def.rotation {
                    data.rotation = glam::Quat::from_xyzw(r.0[0], r.0[1], r.0[2], r.0[3]);
                }
                if let Some(s) = def.scale {
                    data.scale = s.into();
                }
            }
            if let Some(weights) = &def.weights {
                data.weights = weights.clone();
            }
        }
        nodes.push(id);
    }

    // Nodes, second pass: hierarchy and attachments.
    for (def, &id) in root.nodes.iter().zip(&nodes) {
        if let Some(children) = &def.children {
            for child in children {
                doc.add_child(id, nodes[child.value()])?;
            }
        }
        if let Some(mesh) = def.mesh {
            doc.set_node_mesh(id, Some(meshes[mesh.value()]))?;
        }
        if let Some(camera) = def.camera {
            doc.set_node_camera(id, Some(cameras[camera.value()]))?;
        }
    }

    // Skins, then node skin attachments (a skin may reference any node).
    let mut skins = Vec::new();
    for def in &root.skins {
        let id = doc.create_skin(def.name.as_deref().unwrap_or(""));
        apply_extras(&mut doc, id, &def.extras);
        if let Some(ibm) = def.inverse_bind_matrices {
            doc.set_skin_inverse_bind_matrices(id, Some(accessors[ibm.value()]))?;
        }
        if let Some(skeleton) = def.skeleton {
            doc.set_skin_skeleton(id, Some(nodes[skeleton.value()]))?;
        }
        for joint in &def.joints {
            doc.skin_add_joint(id, nodes[joint.value()])?;
        }
        skins.push(id);
    }
    for (def, &id) in root.nodes.iter().zip(&nodes) {
        if let Some(skin) = def.skin {
            doc.set_node_skin(id, Some(skins[skin.value()]))?;
        }
    }

    // Animations.
    for def in &root.animations {
        read_animation(&mut doc, def, &accessors, &nodes)?;
    }

    // Scenes and the default scene.
    let mut scenes = Vec::new();
    for def in &root.scenes {
        let id = doc.create_scene(def.name.as_deref().unwrap_or(""));
        apply_extras(&mut doc, id, &def.extras);
        for node in &def.nodes {
            doc.scene_add_child(id, nodes[node.value()])?;
        }
        scenes.push(id);
    }
    if let Some(scene) = root.scene {
        doc.set_default_scene(Some(scenes[scene.value()]))?;
    }

    Ok(doc)
}

/// URIs of external resources this JSON refers to, for the caller to fetch
/// before reading. Data URIs and the container placeholder are internal.
pub fn external_uris(root: &json::Root) -> Vec<String> {
    let mut uris = Vec::new();
    for buffer in &root.buffers {
        if let Some(uri) = &buffer.uri {
            if !uri.starts_with("data:") && uri != GLB_BUFFER_URI {
                uris.push(uri.clone());
            }
        }
    }
    for image in &root.images {
        if let Some(uri) = &image.uri {
            if !uri.starts_with("data:") {
                uris.push(uri.clone());
            }
        }
    }
    uris
}

fn resolve_buffer(def: &json::Buffer, resources: &ResourceMap) -> Result<Vec<u8>> {
    let bytes = match &def.uri {
        Some(uri) if uri.starts_with("data:") => DataUri::parse(uri)
            .ok_or_else(|| Error::Malformed(format!("invalid data URI in buffer {:?}", def.name)))?
            .decode()?,
        Some(uri) => resources
            .get(uri)
            .cloned()
            .ok_or_else(|| Error::MissingResource(uri.clone()))?,
        // No URI: the single buffer carried by the binary container.
        None => resources
            .get(GLB_BUFFER_URI)
            .cloned()
            .ok_or_else(|| Error::MissingResource(GLB_BUFFER_URI.to_owned()))?,
    };
    // The container chunk may carry up to 3 bytes of alignment padding.
    let declared = def.byte_length as usize;
    if declared > bytes.len() {
        return Err(Error::Malformed("buffer shorter than declared length".into()));
    }
    Ok(bytes[..declared].to_vec())
}

fn read_accessor(
    doc: &mut Document,
    def: &json::Accessor,
    root: &json::Root,
    views: &[Vec<u8>],
    buffers: &[PropertyId],
) -> Result<PropertyId> {
    let id = doc.create_accessor(def.name.as_deref().unwrap_or(""));
    apply_extras(doc, id, &def.extras);

    let element_type = element_type_of(&def.type_)?;
    let component_type = component_type_of(&def.component_type)?;
    let count = def.count as usize;
    let element_size = element_type.size();

    let mut array = match def.buffer_view {
        Some(view_index) => {
            let view_def = &root.buffer_views[view_index.value()];
            let bytes = &views[view_index.value()];
            let natural = element_size * component_type.byte_size();
            let stride = view_def.byte_stride.map(|s| s as usize).unwrap_or(natural);
            // An accessor interleaved with others in the same view is
            // de-interleaved into a contiguous array, one element at a time.
            read_array(
                bytes,
                def.byte_offset as usize,
                count,
                element_size,
                stride,
                component_type,
            )?
        }
        // A fully absent backing store implies zero-filled data.
        None => zero_array(component_type, count * element_size),
    };

    if let Some(sparse) = &def.sparse {
        apply_sparse(&mut array, element_size, sparse, views)?;
    }

    {
        let data = doc.accessor_mut(id);
        data.element_type = element_type;
        data.normalized = def.normalized;
        data.sparse = def.sparse.is_some();
        data.array = Some(array);
    }

    let buffer = def
        .buffer_view
        .map(|view| root.buffer_views[view.value()].buffer.value())
        .map(|index| buffers[index]);
    doc.set_accessor_buffer(id, buffer)?;
    Ok(id)
}

fn apply_sparse(
    array: &mut ScalarArray,
    element_size: usize,
    sparse: &json::accessor::sparse::Sparse,
    views: &[Vec<u8>],
) -> Result<()> {
    let count = sparse.count as usize;
    let index_type = match &sparse.indices.component_type {
        Checked::Valid(ty) => component_type_json(ty.0)?,
        Checked::Invalid => {
            return Err(Error::Malformed("invalid sparse index component type".into()))
        }
    };
    let index_bytes = &views[sparse.indices.buffer_view.value()];
    let indices = read_array(
        index_bytes,
        sparse.indices.byte_offset as usize,
        count,
        1,
        index_type.byte_size(),
        index_type,
    )?;

    let value_bytes = &views[sparse.values.buffer_view.value()];
    let component_type = array.component_type();
    let natural = element_size * component_type.byte_size();
    let values = read_array(
        value_bytes,
        sparse.values.byte_offset as usize,
        count,
        element_size,
        natural,
        component_type,
    )?;

    let total = array.len() / element_size;
    for k in 0..count {
        let index = indices.get(k) as usize;
        if index >= total {
            return Err(Error::Malformed("sparse index out of bounds".into()));
        }
        for j in 0..element_size {
            array.set(index * element_size + j, values.get(k * element_size + j));
        }
    }
    Ok(())
}

fn read_image(
    doc: &mut Document,
    def: &json::Image,
    views: &[Vec<u8>],
    resources: &ResourceMap,
    options: &ReadOptions,
) -> Result<PropertyId> {
    let id = doc.create_texture(def.name.as_deref().unwrap_or(""));
    apply_extras(doc, id, &def.extras);

    let mut mime = def.mime_type.as_ref().map(|m| m.0.clone());
    let image = if let Some(view) = def.buffer_view {
        Some(views[view.value()].clone())
    } else if let Some(uri) = &def.uri {
        if uri.starts_with("data:") {
            let data = DataUri::parse(uri)
                .ok_or_else(|| Error::Malformed("invalid data URI in image".into()))?;
            if mime.is_none() {
                mime = Some(data.mime_type.to_owned());
            }
            Some(data.decode()?)
        } else {
            if mime.is_none() {
                mime = mime_from_extension(uri);
            }
            match resources.get(uri) {
                Some(bytes) => Some(bytes.clone()),
                None if options.strict => return Err(Error::MissingResource(uri.clone())),
                None => {
                    // The texture stays in a null-image state: inspectable,
                    // but not re-exportable without repair.
                    warn!(uri = uri.as_str(), "image resource not found");
                    None
                }
            }
        }
    } else {
        None
    };

    let data = doc.texture_mut(id);
    data.mime_type = mime;
    data.image = image;
    Ok(id)
}

fn read_material(
    doc: &mut Document,
    def: &json::Material,
    root: &json::Root,
    textures: &[PropertyId],
) -> Result<PropertyId> {
    let id = doc.create_material(def.name.as_deref().unwrap_or(""));
    apply_extras(doc, id, &def.extras);
    {
        let data = doc.material_mut(id);
        data.double_sided = def.double_sided;
        data.alpha_cutoff = def.alpha_cutoff.unwrap_or_default().0;
        data.alpha_mode = match def.alpha_mode {
            Checked::Valid(json::material::AlphaMode::Mask) => AlphaMode::Mask,
            Checked::Valid(json::material::AlphaMode::Blend) => AlphaMode::Blend,
            _ => AlphaMode::Opaque,
        };
        data.base_color_factor = def.pbr_metallic_roughness.base_color_factor.0;
        data.metallic_factor = def.pbr_metallic_roughness.metallic_factor.0;
        data.roughness_factor = def.pbr_metallic_roughness.roughness_factor.0;
        data.emissive_factor = def.emissive_factor.0;
        if let Some(normal) = &def.normal_texture {
            data.normal_scale = normal.scale;
        }
        if let Some(occlusion) = &def.occlusion_texture {
            data.occlusion_strength = occlusion.strength.0;
        }
    }

    if let Some(info) = &def.pbr_metallic_roughness.base_color_texture {
        wire_texture(doc, id, MaterialTexture::BaseColor, info.index.value(), info.tex_coord, root, textures)?;
    }
    if let Some(info) = &def.pbr_metallic_roughness.metallic_roughness_texture {
        wire_texture(doc, id, MaterialTexture::MetallicRoughness, info.index.value(), info.tex_coord, root, textures)?;
    }
    if let Some(info) = &def.normal_texture {
        wire_texture(doc, id, MaterialTexture::Normal, info.index.value(), info.tex_coord, root, textures)?;
    }
    if let Some(info) = &def.occlusion_texture {
        wire_texture(doc, id, MaterialTexture::Occlusion, info.index.value(), info.tex_coord, root, textures)?;
    }
    if let Some(info) = &def.emissive_texture {
        wire_texture(doc, id, MaterialTexture::Emissive, info.index.value(), info.tex_coord, root, textures)?;
    }
    Ok(id)
}

/// Wires one material texture slot: the texture reference plus the slot's
/// own coordinate-set, filter, and wrap settings.
fn wire_texture(
    doc: &mut Document,
    material: PropertyId,
    slot: MaterialTexture,
    texture_index: usize,
    tex_coord: u32,
    root: &json::Root,
    textures: &[PropertyId],
) -> Result<()> {
    let texture_def = &root.textures[texture_index];
    let texture = textures[texture_def.source.value()];
    doc.set_material_texture(material, slot, Some(texture))?;

    let info = doc.material_texture_info(material, slot);
    let data = doc.texture_info_mut(info);
    data.tex_coord = tex_coord;
    if let Some(sampler) = texture_def.sampler {
        let sampler_def = &root.samplers[sampler.value()];
        data.mag_filter = sampler_def.mag_filter.and_then(|f| match f {
            Checked::Valid(json::texture::MagFilter::Nearest) => Some(MagFilter::Nearest),
            Checked::Valid(json::texture::MagFilter::Linear) => Some(MagFilter::Linear),
            Checked::Invalid => None,
        });
        data.min_filter = sampler_def.min_filter.and_then(|f| match f {
            Checked::Valid(filter) => Some(min_filter_of(filter)),
            Checked::Invalid => None,
        });
        data.wrap_s = wrap_of(&sampler_def.wrap_s);
        data.wrap_t = wrap_of(&sampler_def.wrap_t);
    }
    Ok(())
}

fn read_mesh(
    doc: &mut Document,
    def: &json::Mesh,
    accessors: &[PropertyId],
    materials: &[PropertyId],
) -> Result<PropertyId> {
    let id = doc.create_mesh(def.name.as_deref().unwrap_or(""));
    apply_extras(doc, id, &def.extras);
    if let Some(weights) = &def.weights {
        doc.mesh_mut(id).weights = weights.clone();
    }

    for primitive_def in &def.primitives {
        let primitive = doc.create_primitive();
        doc.primitive_mut(primitive).mode = match primitive_def.mode {
            Checked::Valid(mode) => mode_of(mode),
            Checked::Invalid => PrimitiveMode::Triangles,
        };
        for (semantic, accessor) in &primitive_def.attributes {
            if let Checked::Valid(semantic) = semantic {
                doc.set_primitive_attribute(
                    primitive,
                    &semantic_name(semantic),
                    Some(accessors[accessor.value()]),
                )?;
            }
        }
        if let Some(indices) = primitive_def.indices {
            doc.set_primitive_indices(primitive, Some(accessors[indices.value()]))?;
        }
        if let Some(material) = primitive_def.material {
            doc.set_primitive_material(primitive, Some(materials[material.value()]))?;
        }
        if let Some(targets) = &primitive_def.targets {
            for target_def in targets {
                let target = doc.create_morph_target("");
                if let Some(positions) = target_def.positions {
                    doc.set_target_attribute(target, "POSITION", Some(accessors[positions.value()]))?;
                }
                if let Some(normals) = target_def.normals {
                    doc.set_target_attribute(target, "NORMAL", Some(accessors[normals.value()]))?;
                }
                if let Some(tangents) = target_def.tangents {
                    doc.set_target_attribute(target, "TANGENT", Some(accessors[tangents.value()]))?;
                }
                doc.primitive_add_target(primitive, target)?;
            }
        }
        doc.mesh_add_primitive(id, primitive)?;
    }
    Ok(id)
}

fn read_camera(doc: &mut Document, def: &json::Camera) -> Result<PropertyId> {
    let id = doc.create_camera(def.name.as_deref().unwrap_or(""));
    apply_extras(doc, id, &def.extras);
    let projection = match def.type_ {
        Checked::Valid(json::camera::Type::Perspective) => {
            let p = def
                .perspective
                .as_ref()
                .ok_or_else(|| Error::Malformed("perspective camera without projection".into()))?;
            Projection::Perspective {
                znear: p.znear,
                zfar: p.zfar,
                yfov: p.yfov,
                aspect: p.aspect_ratio,
            }
        }
        Checked::Valid(json::camera::Type::Orthographic) => {
            let o = def
                .orthographic
                .as_ref()
                .ok_or_else(|| Error::Malformed("orthographic camera without projection".into()))?;
            Projection::Orthographic {
                znear: o.znear,
                zfar: o.zfar,
                xmag: o.xmag,
                ymag: o.ymag,
            }
        }
        Checked::Invalid => return Err(Error::Malformed("unknown camera type".into())),
    };
    doc.camera_mut(id).projection = projection;
    Ok(id)
}

fn read_animation(
    doc: &mut Document,
    def: &json::Animation,
    accessors: &[PropertyId],
    nodes: &[PropertyId],
) -> Result<PropertyId> {
    let id = doc.create_animation(def.name.as_deref().unwrap_or(""));
    apply_extras(doc, id, &def.extras);

    let mut samplers = Vec::new();
    for sampler_def in &def.samplers {
        let sampler = doc.create_animation_sampler();
        doc.sampler_mut(sampler).interpolation = match sampler_def.interpolation {
            Checked::Valid(gltf::animation::Interpolation::Step) => Interpolation::Step,
            Checked::Valid(gltf::animation::Interpolation::CubicSpline) => {
                Interpolation::CubicSpline
            }
            _ => Interpolation::Linear,
        };
        doc.set_sampler_input(sampler, Some(accessors[sampler_def.input.value()]))?;
        doc.set_sampler_output(sampler, Some(accessors[sampler_def.output.value()]))?;
        doc.animation_add_sampler(id, sampler)?;
        samplers.push(sampler);
    }

    for channel_def in &def.channels {
        let channel = doc.create_animation_channel();
        doc.channel_mut(channel).target_path = match channel_def.target.path {
            Checked::Valid(gltf::animation::Property::Translation) => Some(TargetPath::Translation),
            Checked::Valid(gltf::animation::Property::Rotation) => Some(TargetPath::Rotation),
            Checked::Valid(gltf::animation::Property::Scale) => Some(TargetPath::Scale),
            Checked::Valid(gltf::animation::Property::MorphTargetWeights) => {
                Some(TargetPath::Weights)
            }
            Checked::Invalid => None,
        };
        doc.set_channel_sampler(channel, Some(samplers[channel_def.sampler.value()]))?;
        doc.set_channel_target_node(channel, Some(nodes[channel_def.target.node.value()]))?;
        doc.animation_add_channel(id, channel)?;
    }
    Ok(id)
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

fn apply_extras(doc: &mut Document, id: PropertyId, extras: &json::Extras) {
    if let Some(raw) = extras {
        if let Ok(value) = serde_json::from_str(raw.get()) {
            doc.set_extras(id, Some(value));
        }
    }
}

fn element_type_of(checked: &Checked<json::accessor::Type>) -> Result<ElementType> {
    match checked {
        Checked::Valid(ty) => Ok(match ty {
            json::accessor::Type::Scalar => ElementType::Scalar,
            json::accessor::Type::Vec2 => ElementType::Vec2,
            json::accessor::Type::Vec3 => ElementType::Vec3,
            json::accessor::Type::Vec4 => ElementType::Vec4,
            json::accessor::Type::Mat2 => ElementType::Mat2,
            json::accessor::Type::Mat3 => ElementType::Mat3,
            json::accessor::Type::Mat4 => ElementType::Mat4,
        }),
        Checked::Invalid => Err(Error::Malformed("unknown accessor element type".into())),
    }
}

fn component_type_of(
    checked: &Checked<json::accessor::GenericComponentType>,
) -> Result<ComponentType> {
    match checked {
        Checked::Valid(ty) => component_type_json(ty.0),
        Checked::Invalid => Err(Error::Malformed("unknown accessor component type".into())),
    }
}

fn component_type_json(ty: json::accessor::ComponentType) -> Result<ComponentType> {
    Ok(match ty {
        json::accessor::ComponentType::I8 => ComponentType::I8,
        json::accessor::ComponentType::U8 => ComponentType::U8,
        json::accessor::ComponentType::I16 => ComponentType::I16,
        json::accessor::ComponentType::U16 => ComponentType::U16,
        json::accessor::ComponentType::U32 => ComponentType::U32,
        json::accessor::ComponentType::F32 => ComponentType::F32,
    })
}

fn mode_of(mode: json::mesh::Mode) -> PrimitiveMode {
    match mode {
        json::mesh::Mode::Points => PrimitiveMode::Points,
        json::mesh::Mode::Lines => PrimitiveMode::Lines,
        json::mesh::Mode::LineLoop => PrimitiveMode::LineLoop,
        json::mesh::Mode::LineStrip => PrimitiveMode::LineStrip,
        json::mesh::Mode::Triangles => PrimitiveMode::Triangles,
        json::mesh::Mode::TriangleStrip => PrimitiveMode::TriangleStrip,
        json::mesh::Mode::TriangleFan => PrimitiveMode::TriangleFan,
    }
}

fn min_filter_of(filter: json::texture::MinFilter) -> MinFilter {
    match filter {
        json::texture::MinFilter::Nearest => MinFilter::Nearest,
        json::texture::MinFilter::Linear => MinFilter::Linear,
        json::texture::MinFilter::NearestMipmapNearest => MinFilter::NearestMipmapNearest,
        json::texture::MinFilter::LinearMipmapNearest => MinFilter::LinearMipmapNearest,
        json::texture::MinFilter::NearestMipmapLinear => MinFilter::NearestMipmapLinear,
        json::texture::MinFilter::LinearMipmapLinear => MinFilter::LinearMipmapLinear,
    }
}

fn wrap_of(checked: &Checked<json::texture::WrappingMode>) -> WrapMode {
    match checked {
        Checked::Valid(json::texture::WrappingMode::ClampToEdge) => WrapMode::ClampToEdge,
        Checked::Valid(json::texture::WrappingMode::MirroredRepeat) => WrapMode::MirroredRepeat,
        _ => WrapMode::Repeat,
    }
}

fn semantic_name(semantic: &json::mesh::Semantic) -> String {
    use json::mesh::Semantic;
    match semantic {
        Semantic::Positions => "POSITION".to_owned(),
        Semantic::Normals => "NORMAL".to_owned(),
        Semantic::Tangents => "TANGENT".to_owned(),
        Semantic::Colors(n) => format!("COLOR_{}", n),
        Semantic::TexCoords(n) => format!("TEXCOORD_{}", n),
        Semantic::Joints(n) => format!("JOINTS_{}", n),
        Semantic::Weights(n) => format!("WEIGHTS_{}", n),
        Semantic::Extras(name) => format!("_{}", name),
    }
}

fn mime_from_extension(uri: &str) -> Option<String> {
    let lower = uri.to_ascii_lowercase();
    if lower.ends_with(".png") {
        Some("image/png".to_owned())
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        Some("image/jpeg".to_owned())
    } else {
        None
    }
}

fn zero_array(component_type: ComponentType, len: usize) -> ScalarArray {
    match component_type {
        ComponentType::I8 => ScalarArray::I8(vec![0; len]),
        ComponentType::U8 => ScalarArray::U8(vec![0; len]),
        ComponentType::I16 => ScalarArray::I16(vec![0; len]),
        ComponentType::U16 => ScalarArray::U16(vec![0; len]),
        ComponentType::U32 => ScalarArray::U32(vec![0; len]),
        ComponentType::F32 => ScalarArray::F32(vec![0.0; len]),
    }
}

/// Reads `count` elements of `element_size` components each, starting at
/// `offset`, with `stride` bytes between element starts. A stride wider
/// than the natural element size de-interleaves shared vertex buffers.
fn read_array(
    bytes: &[u8],
    offset: usize,
    count: usize,
    element_size: usize,
    stride: usize,
    component_type: ComponentType,
) -> Result<ScalarArray> {
    let component = component_type.byte_size();
    if count > 0 {
        let last = offset + (count - 1) * stride + element_size * component;
        if last > bytes.len() {
            return Err(Error::Malformed("accessor data out of bounds".into()));
        }
    }

    macro_rules! gather {
        ($variant:ident, $read:expr) => {{
            let mut out = Vec::with_capacity(count * element_size);
            for i in 0..count {
                for j in 0..element_size {
                    let at = offset + i * stride + j * component;
                    out.push($read(&bytes[at..at + component]));
                }
            }
            ScalarArray::$variant(out)
        }};
    }

    Ok(match component_type {
        ComponentType::I8 => gather!(I8, |b: &[u8]| b[0] as i8),
        ComponentType::U8 => gather!(U8, |b: &[u8]| b[0]),
        ComponentType::I16 => gather!(I16, LittleEndian::read_i16),
        ComponentType::U16 => gather!(U16, LittleEndian::read_u16),
        ComponentType::U32 => gather!(U32, LittleEndian::read_u32),
        ComponentType::F32 => gather!(F32, LittleEndian::read_f32),
    })
}

/// Inline base64 resource, e.g. `data:application/octet-stream;base64,...`.
struct DataUri<'a> {
    mime_type: &'a str,
    base64: bool,
    data: &'a str,
}

impl<'a> DataUri<'a> {
    fn parse(uri: &'a str) -> Option<DataUri<'a>> {
        let uri = uri.strip_prefix("data:")?;
        let (mime_type, data) = uri.split_once(',')?;
        let (mime_type, base64) = match mime_type.strip_suffix(";base64") {
            Some(mime_type) => (mime_type, true),
            None => (mime_type, false),
        };
        Some(DataUri {
            mime_type,
            base64,
            data,
        })
    }

    fn decode(&self) -> Result<Vec<u8>> {
        if self.base64 {
            base64::decode(self.data).map_err(|e| Error::Malformed(e.to_string()))
        } else {
            Ok(self.data.as_bytes().to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn rejects_unsupported_version() {
        let mut root = json::Root::default();
        root.asset.version = "1.0".to_owned();
        let result = read(&root, &ResourceMap::new(), &ReadOptions::default());
        assert!(matches!(result, Err(Error::UnsupportedVersion(v)) if v == "1.0"));
    }

    #[test]
    fn rejects_required_extensions() {
        let mut root = json::Root::default();
        root.extensions_required = vec!["KHR_draco_mesh_compression".to_owned()];
        let result = read(&root, &ResourceMap::new(), &ReadOptions::default());
        assert!(matches!(result, Err(Error::MissingRequiredExtension(_))));
    }

    #[test]
    fn deinterleaves_strided_views() {
        // Two vec2 f32 attributes interleaved with a 16-byte stride.
        let mut bytes = Vec::new();
        for i in 0..3u32 {
            for value in [i as f32, i as f32 + 0.5, 100.0 + i as f32, 200.0 + i as f32] {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        let first = read_array(&bytes, 0, 3, 2, 16, ComponentType::F32).unwrap();
        let second = read_array(&bytes, 8, 3, 2, 16, ComponentType::F32).unwrap();
        assert_eq!(
            ScalarArray::F32(vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5]),
            first
        );
        assert_eq!(
            ScalarArray::F32(vec![100.0, 200.0, 101.0, 201.0, 102.0, 202.0]),
            second
        );
    }

    #[test]
    fn zero_filled_accessor_without_view() {
        let mut root = json::Root::default();
        root.asset.version = "2.0".to_owned();
        root.accessors.push(json::Accessor {
            buffer_view: None,
            byte_offset: 0,
            count: 4,
            component_type: Checked::Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::F32,
            )),
            extensions: None,
            extras: Default::default(),
            type_: Checked::Valid(json::accessor::Type::Vec3),
            min: None,
            max: None,
            name: None,
            normalized: false,
            sparse: None,
        });

        let doc = read(&root, &ResourceMap::new(), &ReadOptions::default()).unwrap();
        let accessor = doc.list_accessors()[0];
        assert_eq!(4, doc.accessor(accessor).count());
        assert_eq!(
            Some(ScalarArray::F32(vec![0.0; 12])),
            doc.accessor(accessor).array
        );
    }
}
