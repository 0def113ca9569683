//! In-memory document model for one 3D asset: a typed property graph with
//! bidirectional reference bookkeeping.
//!
//! All entities are created through [`Document`] factory methods, which
//! allocate them on the document's single graph and register top-level kinds
//! into the root collections. Entities are destroyed with
//! [`Document::dispose`]; a merely detached entity keeps its own subtree and
//! stays reusable.

pub mod accessor;
pub mod math;
pub mod property;

use glam::Mat4;
use indexmap::IndexMap;

pub use accessor::{
    decode_normalized, encode_normalized, AccessorData, ComponentType, ElementType, ScalarArray,
};
pub use property::{
    AccessorUsage, AlphaMode, AnimationChannelData, AnimationData, AnimationSamplerData,
    BufferData, CameraData, EdgeAttrs, Interpolation, MagFilter, MaterialData, MeshData,
    MinFilter, MorphTargetData, NodeData, PrimitiveData, PrimitiveMode, Projection, Property,
    PropertyData, PropertyKind, RootData, SceneData, SkinData, TargetPath, TextureData,
    TextureInfoData, WrapMode,
};

use crate::error::Result;
use crate::graph::{EdgeId, EventKind, Graph};
use property::{Ref, RefList, RefMap, RefSet, Slot};

/// Handle to a property of a [`Document`].
pub type PropertyId = crate::graph::NodeId;

/// Texture slots of a material. Each slot owns a nested texture-info record
/// carrying texture-coordinate-set, filter, and wrap settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialTexture {
    BaseColor,
    MetallicRoughness,
    Normal,
    Occlusion,
    Emissive,
}

pub struct Document {
    graph: Graph<EdgeAttrs>,
    props: IndexMap<PropertyId, Property>,
    root: PropertyId,
}

macro_rules! typed_data {
    ($get:ident, $get_mut:ident, $variant:ident, $ty:ty) => {
        pub fn $get(&self, id: PropertyId) -> &$ty {
            match &self.prop(id).data {
                PropertyData::$variant(data) => data,
                _ => panic!(concat!("property is not a ", stringify!($variant))),
            }
        }

        pub fn $get_mut(&mut self, id: PropertyId) -> &mut $ty {
            self.graph.touch(id);
            match &mut self.prop_mut(id).data {
                PropertyData::$variant(data) => data,
                _ => panic!(concat!("property is not a ", stringify!($variant))),
            }
        }
    };
}

impl Document {
    pub fn new() -> Self {
        let mut graph = Graph::new();
        let root = graph.add_node();
        let mut props = IndexMap::new();
        props.insert(root, Property::new(PropertyData::Root(RootData::default())));
        graph.take_events();
        Self { graph, props, root }
    }

    pub fn root(&self) -> PropertyId {
        self.root
    }

    pub fn graph(&self) -> &Graph<EdgeAttrs> {
        &self.graph
    }

    fn prop(&self, id: PropertyId) -> &Property {
        match self.props.get(&id) {
            Some(prop) => prop,
            None => panic!("property was disposed"),
        }
    }

    fn prop_mut(&mut self, id: PropertyId) -> &mut Property {
        match self.props.get_mut(&id) {
            Some(prop) => prop,
            None => panic!("property was disposed"),
        }
    }

    pub fn contains(&self, id: PropertyId) -> bool {
        self.props.contains_key(&id)
    }

    pub fn kind(&self, id: PropertyId) -> PropertyKind {
        self.prop(id).kind()
    }

    pub fn name(&self, id: PropertyId) -> &str {
        &self.prop(id).name
    }

    pub fn set_name(&mut self, id: PropertyId, name: impl Into<String>) {
        self.prop_mut(id).name = name.into();
        self.graph.touch(id);
    }

    pub fn extras(&self, id: PropertyId) -> Option<&serde_json::Value> {
        self.prop(id).extras.as_ref()
    }

    pub fn set_extras(&mut self, id: PropertyId, extras: Option<serde_json::Value>) {
        self.prop_mut(id).extras = extras;
        self.graph.touch(id);
    }

    typed_data!(root_data, root_data_mut, Root, RootData);
    typed_data!(scene, scene_mut, Scene, SceneData);
    typed_data!(node, node_mut, Node, NodeData);
    typed_data!(mesh, mesh_mut, Mesh, MeshData);
    typed_data!(primitive, primitive_mut, Primitive, PrimitiveData);
    typed_data!(morph_target, morph_target_mut, MorphTarget, MorphTargetData);
    typed_data!(material, material_mut, Material, MaterialData);
    typed_data!(texture_info, texture_info_mut, TextureInfo, TextureInfoData);
    typed_data!(texture, texture_mut, Texture, TextureData);
    typed_data!(accessor, accessor_mut, Accessor, AccessorData);
    typed_data!(buffer, buffer_mut, Buffer, BufferData);
    typed_data!(camera, camera_mut, Camera, CameraData);
    typed_data!(skin, skin_mut, Skin, SkinData);
    typed_data!(animation, animation_mut, Animation, AnimationData);
    typed_data!(channel, channel_mut, AnimationChannel, AnimationChannelData);
    typed_data!(sampler, sampler_mut, AnimationSampler, AnimationSamplerData);

    // ------------------------------------------------------------------
    // Factories
    // ------------------------------------------------------------------

    fn create(&mut self, data: PropertyData, name: &str) -> PropertyId {
        let id = self.graph.add_node();
        let mut prop = Property::new(data);
        prop.name = name.to_owned();
        self.props.insert(id, prop);
        self.route_created();
        id
    }

    pub fn create_scene(&mut self, name: &str) -> PropertyId {
        self.create(PropertyData::Scene(SceneData::default()), name)
    }

    pub fn create_node(&mut self, name: &str) -> PropertyId {
        self.create(PropertyData::Node(NodeData::default()), name)
    }

    pub fn create_mesh(&mut self, name: &str) -> PropertyId {
        self.create(PropertyData::Mesh(MeshData::default()), name)
    }

    pub fn create_primitive(&mut self) -> PropertyId {
        self.create(PropertyData::Primitive(PrimitiveData::default()), "")
    }

    pub fn create_morph_target(&mut self, name: &str) -> PropertyId {
        self.create(PropertyData::MorphTarget(MorphTargetData::default()), name)
    }

    pub fn create_material(&mut self, name: &str) -> PropertyId {
        let id = self.create(PropertyData::Material(MaterialData::default()), name);
        for slot in [
            MaterialTexture::BaseColor,
            MaterialTexture::MetallicRoughness,
            MaterialTexture::Normal,
            MaterialTexture::Occlusion,
            MaterialTexture::Emissive,
        ] {
            let info = self.create(PropertyData::TextureInfo(TextureInfoData::default()), "");
            let edge = self
                .graph
                .connect(material_slot_name(slot), id, info, EdgeAttrs::owned())
                .expect("material and texture info share one graph");
            material_slot_mut(self.material_data_raw(id), slot).0 = Some(edge);
        }
        id
    }

    fn material_data_raw(&mut self, id: PropertyId) -> &mut MaterialData {
        match &mut self.prop_mut(id).data {
            PropertyData::Material(data) => data,
            _ => panic!("property is not a Material"),
        }
    }

    pub fn create_texture(&mut self, name: &str) -> PropertyId {
        self.create(PropertyData::Texture(TextureData::default()), name)
    }

    pub fn create_accessor(&mut self, name: &str) -> PropertyId {
        self.create(PropertyData::Accessor(AccessorData::default()), name)
    }

    pub fn create_buffer(&mut self, name: &str) -> PropertyId {
        self.create(PropertyData::Buffer(BufferData::default()), name)
    }

    pub fn create_camera(&mut self, name: &str) -> PropertyId {
        self.create(PropertyData::Camera(CameraData::default()), name)
    }

    pub fn create_skin(&mut self, name: &str) -> PropertyId {
        self.create(PropertyData::Skin(SkinData::default()), name)
    }

    pub fn create_animation(&mut self, name: &str) -> PropertyId {
        self.create(PropertyData::Animation(AnimationData::default()), name)
    }

    pub fn create_animation_channel(&mut self) -> PropertyId {
        self.create(
            PropertyData::AnimationChannel(AnimationChannelData::default()),
            "",
        )
    }

    pub fn create_animation_sampler(&mut self) -> PropertyId {
        self.create(
            PropertyData::AnimationSampler(AnimationSamplerData::default()),
            "",
        )
    }

    /// Routes freshly created top-level properties into the root collections
    /// by draining the graph's node-created events.
    fn route_created(&mut self) {
        for event in self.graph.take_events() {
            if event.kind != EventKind::Created || event.node == self.root {
                continue;
            }
            let kind = match self.props.get(&event.node) {
                Some(prop) => prop.kind(),
                None => continue,
            };
            type SetSlot = fn(&mut PropertyData) -> &mut RefSet;
            let slot: Option<(&'static str, SetSlot)> = match kind {
                PropertyKind::Scene => Some(("scenes", |d| root_sets(d, 0))),
                PropertyKind::Node => Some(("nodes", |d| root_sets(d, 1))),
                PropertyKind::Mesh => Some(("meshes", |d| root_sets(d, 2))),
                PropertyKind::Material => Some(("materials", |d| root_sets(d, 3))),
                PropertyKind::Texture => Some(("textures", |d| root_sets(d, 4))),
                PropertyKind::Animation => Some(("animations", |d| root_sets(d, 5))),
                PropertyKind::Accessor => Some(("accessors", |d| root_sets(d, 6))),
                PropertyKind::Buffer => Some(("buffers", |d| root_sets(d, 7))),
                PropertyKind::Camera => Some(("cameras", |d| root_sets(d, 8))),
                PropertyKind::Skin => Some(("skins", |d| root_sets(d, 9))),
                _ => None,
            };
            if let Some((name, get)) = slot {
                let root = self.root;
                let _ = self.add_ref_set(root, name, event.node, EdgeAttrs::NONE, get);
            }
        }
    }

    // ------------------------------------------------------------------
    // Slot plumbing
    // ------------------------------------------------------------------

    fn set_ref(
        &mut self,
        owner: PropertyId,
        name: &str,
        child: Option<PropertyId>,
        attrs: EdgeAttrs,
        get: fn(&mut PropertyData) -> &mut Ref,
    ) -> Result<()> {
        if let Some(old) = get(&mut self.prop_mut(owner).data).0.take() {
            self.graph.disconnect(old);
        }
        if let Some(child) = child {
            let edge = self.graph.connect(name, owner, child, attrs)?;
            get(&mut self.prop_mut(owner).data).0 = Some(edge);
        }
        self.graph.touch(owner);
        Ok(())
    }

    fn push_ref_list(
        &mut self,
        owner: PropertyId,
        name: &str,
        child: PropertyId,
        attrs: EdgeAttrs,
        get: fn(&mut PropertyData) -> &mut RefList,
    ) -> Result<EdgeId> {
        let edge = self.graph.connect(name, owner, child, attrs)?;
        get(&mut self.prop_mut(owner).data).0.push(edge);
        self.graph.touch(owner);
        Ok(edge)
    }

    fn remove_ref_list(
        &mut self,
        owner: PropertyId,
        child: PropertyId,
        get: fn(&mut PropertyData) -> &mut RefList,
    ) {
        let edges = get(&mut self.prop_mut(owner).data).0.clone();
        for edge in edges {
            if self.graph.target_of(edge) == Some(child) {
                self.graph.disconnect(edge);
                get(&mut self.prop_mut(owner).data).unlink(edge);
            }
        }
        self.graph.touch(owner);
    }

    /// Adds to an unordered reference set; re-adding an already referenced
    /// child replaces its edge, transferring the new attributes.
    fn add_ref_set(
        &mut self,
        owner: PropertyId,
        name: &str,
        child: PropertyId,
        attrs: EdgeAttrs,
        get: fn(&mut PropertyData) -> &mut RefSet,
    ) -> Result<EdgeId> {
        let edges = get(&mut self.prop_mut(owner).data).0.clone();
        for edge in edges {
            if self.graph.target_of(edge) == Some(child) {
                self.graph.disconnect(edge);
                get(&mut self.prop_mut(owner).data).unlink(edge);
            }
        }
        let edge = self.graph.connect(name, owner, child, attrs)?;
        get(&mut self.prop_mut(owner).data).0.push(edge);
        self.graph.touch(owner);
        Ok(edge)
    }

    fn remove_ref_set(
        &mut self,
        owner: PropertyId,
        child: PropertyId,
        get: fn(&mut PropertyData) -> &mut RefSet,
    ) {
        let edges = get(&mut self.prop_mut(owner).data).0.clone();
        for edge in edges {
            if self.graph.target_of(edge) == Some(child) {
                self.graph.disconnect(edge);
                get(&mut self.prop_mut(owner).data).unlink(edge);
            }
        }
        self.graph.touch(owner);
    }

    fn set_ref_map(
        &mut self,
        owner: PropertyId,
        key: &str,
        child: Option<PropertyId>,
        attrs: EdgeAttrs,
        get: fn(&mut PropertyData) -> &mut RefMap,
    ) -> Result<()> {
        if let Some(old) = get(&mut self.prop_mut(owner).data).0.shift_remove(key) {
            self.graph.disconnect(old);
        }
        if let Some(child) = child {
            let edge = self.graph.connect(key, owner, child, attrs)?;
            get(&mut self.prop_mut(owner).data)
                .0
                .insert(key.to_owned(), edge);
        }
        self.graph.touch(owner);
        Ok(())
    }

    fn target(&self, slot: &Ref) -> Option<PropertyId> {
        slot.0.and_then(|edge| self.graph.target_of(edge))
    }

    fn list_targets(&self, edges: &[EdgeId]) -> Vec<PropertyId> {
        edges
            .iter()
            .filter_map(|&edge| self.graph.target_of(edge))
            .collect()
    }

    // ------------------------------------------------------------------
    // Root collections
    // ------------------------------------------------------------------

    pub fn list_scenes(&self) -> Vec<PropertyId> {
        self.list_targets(&self.root_data(self.root).scenes.0)
    }

    pub fn list_nodes(&self) -> Vec<PropertyId> {
        self.list_targets(&self.root_data(self.root).nodes.0)
    }

    pub fn list_meshes(&self) -> Vec<PropertyId> {
        self.list_targets(&self.root_data(self.root).meshes.0)
    }

    pub fn list_materials(&self) -> Vec<PropertyId> {
        self.list_targets(&self.root_data(self.root).materials.0)
    }

    pub fn list_textures(&self) -> Vec<PropertyId> {
        self.list_targets(&self.root_data(self.root).textures.0)
    }

    pub fn list_animations(&self) -> Vec<PropertyId> {
        self.list_targets(&self.root_data(self.root).animations.0)
    }

    pub fn list_accessors(&self) -> Vec<PropertyId> {
        self.list_targets(&self.root_data(self.root).accessors.0)
    }

    pub fn list_buffers(&self) -> Vec<PropertyId> {
        self.list_targets(&self.root_data(self.root).buffers.0)
    }

    pub fn list_cameras(&self) -> Vec<PropertyId> {
        self.list_targets(&self.root_data(self.root).cameras.0)
    }

    pub fn list_skins(&self) -> Vec<PropertyId> {
        self.list_targets(&self.root_data(self.root).skins.0)
    }

    pub fn default_scene(&self) -> Option<PropertyId> {
        self.target(&self.root_data(self.root).default_scene)
    }

    pub fn set_default_scene(&mut self, scene: Option<PropertyId>) -> Result<()> {
        let root = self.root;
        self.set_ref(root, "scene", scene, EdgeAttrs::NONE, |d| match d {
            PropertyData::Root(r) => &mut r.default_scene,
            _ => unreachable!(),
        })
    }

    // ------------------------------------------------------------------
    // Scene tree
    // ------------------------------------------------------------------

    pub fn scene_children(&self, scene: PropertyId) -> Vec<PropertyId> {
        self.list_targets(&self.scene(scene).children.0)
    }

    /// Adds a root node to a scene. The node is detached from any node
    /// parent first: a node is never simultaneously the child of a node and
    /// a direct child of a scene.
    pub fn scene_add_child(&mut self, scene: PropertyId, node: PropertyId) -> Result<()> {
        self.detach_from_parents(node, PropertyKind::Node);
        self.add_ref_set(scene, "children", node, EdgeAttrs::NONE, |d| match d {
            PropertyData::Scene(s) => &mut s.children,
            _ => unreachable!(),
        })?;
        Ok(())
    }

    pub fn scene_remove_child(&mut self, scene: PropertyId, node: PropertyId) {
        self.remove_ref_set(scene, node, |d| match d {
            PropertyData::Scene(s) => &mut s.children,
            _ => unreachable!(),
        });
    }

    pub fn node_children(&self, node: PropertyId) -> Vec<PropertyId> {
        self.list_targets(&self.node(node).children.0)
    }

    /// The node's single node parent, if any.
    pub fn node_parent(&self, node: PropertyId) -> Option<PropertyId> {
        self.graph.incoming_edges(node).into_iter().find_map(|id| {
            let edge = self.graph.edge(id)?;
            let owner = self.props.get(&edge.owner)?;
            (edge.name == "children" && owner.kind() == PropertyKind::Node).then(|| edge.owner)
        })
    }

    /// Attaches a child node, automatically detaching it from any prior node
    /// parent and from any scene it was a direct child of.
    pub fn add_child(&mut self, parent: PropertyId, child: PropertyId) -> Result<()> {
        self.detach_from_parents(child, PropertyKind::Node);
        self.detach_from_parents(child, PropertyKind::Scene);
        self.push_ref_list(parent, "children", child, EdgeAttrs::NONE, |d| match d {
            PropertyData::Node(n) => &mut n.children,
            _ => unreachable!(),
        })?;
        Ok(())
    }

    pub fn remove_child(&mut self, parent: PropertyId, child: PropertyId) {
        self.remove_ref_list(parent, child, |d| match d {
            PropertyData::Node(n) => &mut n.children,
            _ => unreachable!(),
        });
    }

    /// Severs inbound `children` edges owned by properties of `owner_kind`.
    fn detach_from_parents(&mut self, node: PropertyId, owner_kind: PropertyKind) {
        let severed: Vec<(EdgeId, PropertyId)> = self
            .graph
            .incoming_edges(node)
            .into_iter()
            .filter_map(|id| {
                let edge = self.graph.edge(id)?;
                let owner = self.props.get(&edge.owner)?;
                (edge.name == "children" && owner.kind() == owner_kind)
                    .then(|| (id, edge.owner))
            })
            .collect();
        for (edge, owner) in severed {
            self.graph.disconnect(edge);
            self.prop_mut(owner).data.unlink(edge);
        }
    }

    pub fn set_node_mesh(&mut self, node: PropertyId, mesh: Option<PropertyId>) -> Result<()> {
        self.set_ref(node, "mesh", mesh, EdgeAttrs::NONE, |d| match d {
            PropertyData::Node(n) => &mut n.mesh,
            _ => unreachable!(),
        })
    }

    pub fn node_mesh(&self, node: PropertyId) -> Option<PropertyId> {
        self.target(&self.node(node).mesh)
    }

    pub fn set_node_camera(&mut self, node: PropertyId, camera: Option<PropertyId>) -> Result<()> {
        self.set_ref(node, "camera", camera, EdgeAttrs::NONE, |d| match d {
            PropertyData::Node(n) => &mut n.camera,
            _ => unreachable!(),
        })
    }

    pub fn node_camera(&self, node: PropertyId) -> Option<PropertyId> {
        self.target(&self.node(node).camera)
    }

    pub fn set_node_skin(&mut self, node: PropertyId, skin: Option<PropertyId>) -> Result<()> {
        self.set_ref(node, "skin", skin, EdgeAttrs::NONE, |d| match d {
            PropertyData::Node(n) => &mut n.skin,
            _ => unreachable!(),
        })
    }

    pub fn node_skin(&self, node: PropertyId) -> Option<PropertyId> {
        self.target(&self.node(node).skin)
    }

    pub fn local_matrix(&self, node: PropertyId) -> Mat4 {
        let data = self.node(node);
        math::compose(data.translation, data.rotation, data.scale)
    }

    /// World transform, composed down the node-parent chain.
    pub fn world_matrix(&self, node: PropertyId) -> Mat4 {
        let mut matrix = self.local_matrix(node);
        let mut current = node;
        while let Some(parent) = self.node_parent(current) {
            matrix = self.local_matrix(parent) * matrix;
            current = parent;
        }
        matrix
    }

    // ------------------------------------------------------------------
    // Meshes and primitives
    // ------------------------------------------------------------------

    pub fn mesh_add_primitive(&mut self, mesh: PropertyId, primitive: PropertyId) -> Result<()> {
        self.push_ref_list(mesh, "primitives", primitive, EdgeAttrs::NONE, |d| match d {
            PropertyData::Mesh(m) => &mut m.primitives,
            _ => unreachable!(),
        })?;
        Ok(())
    }

    pub fn mesh_primitives(&self, mesh: PropertyId) -> Vec<PropertyId> {
        self.list_targets(&self.mesh(mesh).primitives.0)
    }

    pub fn set_primitive_indices(
        &mut self,
        primitive: PropertyId,
        indices: Option<PropertyId>,
    ) -> Result<()> {
        self.set_ref(
            primitive,
            "indices",
            indices,
            EdgeAttrs::usage(AccessorUsage::Index),
            |d| match d {
                PropertyData::Primitive(p) => &mut p.indices,
                _ => unreachable!(),
            },
        )
    }

    pub fn primitive_indices(&self, primitive: PropertyId) -> Option<PropertyId> {
        self.target(&self.primitive(primitive).indices)
    }

    pub fn set_primitive_attribute(
        &mut self,
        primitive: PropertyId,
        semantic: &str,
        accessor: Option<PropertyId>,
    ) -> Result<()> {
        self.set_ref_map(
            primitive,
            semantic,
            accessor,
            EdgeAttrs::usage(AccessorUsage::VertexAttribute),
            |d| match d {
                PropertyData::Primitive(p) => &mut p.attributes,
                _ => unreachable!(),
            },
        )
    }

    pub fn primitive_attribute(&self, primitive: PropertyId, semantic: &str) -> Option<PropertyId> {
        self.primitive(primitive)
            .attributes
            .edge(semantic)
            .and_then(|edge| self.graph.target_of(edge))
    }

    pub fn primitive_attributes(&self, primitive: PropertyId) -> Vec<(String, PropertyId)> {
        self.primitive(primitive)
            .attributes
            .entries()
            .filter_map(|(key, edge)| {
                self.graph
                    .target_of(edge)
                    .map(|target| (key.to_owned(), target))
            })
            .collect()
    }

    pub fn set_primitive_material(
        &mut self,
        primitive: PropertyId,
        material: Option<PropertyId>,
    ) -> Result<()> {
        self.set_ref(primitive, "material", material, EdgeAttrs::NONE, |d| match d {
            PropertyData::Primitive(p) => &mut p.material,
            _ => unreachable!(),
        })
    }

    pub fn primitive_material(&self, primitive: PropertyId) -> Option<PropertyId> {
        self.target(&self.primitive(primitive).material)
    }

    pub fn primitive_add_target(
        &mut self,
        primitive: PropertyId,
        target: PropertyId,
    ) -> Result<()> {
        self.push_ref_list(primitive, "targets", target, EdgeAttrs::NONE, |d| match d {
            PropertyData::Primitive(p) => &mut p.targets,
            _ => unreachable!(),
        })?;
        Ok(())
    }

    pub fn primitive_targets(&self, primitive: PropertyId) -> Vec<PropertyId> {
        self.list_targets(&self.primitive(primitive).targets.0)
    }

    pub fn set_target_attribute(
        &mut self,
        target: PropertyId,
        semantic: &str,
        accessor: Option<PropertyId>,
    ) -> Result<()> {
        self.set_ref_map(
            target,
            semantic,
            accessor,
            EdgeAttrs::usage(AccessorUsage::VertexAttribute),
            |d| match d {
                PropertyData::MorphTarget(t) => &mut t.attributes,
                _ => unreachable!(),
            },
        )
    }

    pub fn target_attributes(&self, target: PropertyId) -> Vec<(String, PropertyId)> {
        self.morph_target(target)
            .attributes
            .entries()
            .filter_map(|(key, edge)| {
                self.graph
                    .target_of(edge)
                    .map(|target| (key.to_owned(), target))
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Materials and textures
    // ------------------------------------------------------------------

    /// The owned texture-info record for one material slot.
    pub fn material_texture_info(&self, material: PropertyId, slot: MaterialTexture) -> PropertyId {
        let data = self.material(material);
        self.target(material_slot(data, slot))
            .expect("material texture info is created with the material")
    }

    pub fn set_material_texture(
        &mut self,
        material: PropertyId,
        slot: MaterialTexture,
        texture: Option<PropertyId>,
    ) -> Result<()> {
        let info = self.material_texture_info(material, slot);
        self.set_ref(info, "texture", texture, EdgeAttrs::NONE, |d| match d {
            PropertyData::TextureInfo(i) => &mut i.texture,
            _ => unreachable!(),
        })
    }

    pub fn material_texture(&self, material: PropertyId, slot: MaterialTexture) -> Option<PropertyId> {
        let info = self.material_texture_info(material, slot);
        self.target(&self.texture_info(info).texture)
    }

    // ------------------------------------------------------------------
    // Accessors and buffers
    // ------------------------------------------------------------------

    pub fn set_accessor_buffer(
        &mut self,
        accessor: PropertyId,
        buffer: Option<PropertyId>,
    ) -> Result<()> {
        self.set_ref(accessor, "buffer", buffer, EdgeAttrs::NONE, |d| match d {
            PropertyData::Accessor(a) => &mut a.buffer,
            _ => unreachable!(),
        })
    }

    pub fn accessor_buffer(&self, accessor: PropertyId) -> Option<PropertyId> {
        self.target(&self.accessor(accessor).buffer)
    }

    // ------------------------------------------------------------------
    // Skins
    // ------------------------------------------------------------------

    pub fn set_skin_skeleton(&mut self, skin: PropertyId, node: Option<PropertyId>) -> Result<()> {
        self.set_ref(skin, "skeleton", node, EdgeAttrs::NONE, |d| match d {
            PropertyData::Skin(s) => &mut s.skeleton,
            _ => unreachable!(),
        })
    }

    pub fn skin_skeleton(&self, skin: PropertyId) -> Option<PropertyId> {
        self.target(&self.skin(skin).skeleton)
    }

    pub fn set_skin_inverse_bind_matrices(
        &mut self,
        skin: PropertyId,
        accessor: Option<PropertyId>,
    ) -> Result<()> {
        self.set_ref(
            skin,
            "inverseBindMatrices",
            accessor,
            EdgeAttrs::usage(AccessorUsage::InverseBindMatrices),
            |d| match d {
                PropertyData::Skin(s) => &mut s.inverse_bind_matrices,
                _ => unreachable!(),
            },
        )
    }

    pub fn skin_inverse_bind_matrices(&self, skin: PropertyId) -> Option<PropertyId> {
        self.target(&self.skin(skin).inverse_bind_matrices)
    }

    pub fn skin_add_joint(&mut self, skin: PropertyId, joint: PropertyId) -> Result<()> {
        self.push_ref_list(skin, "joints", joint, EdgeAttrs::NONE, |d| match d {
            PropertyData::Skin(s) => &mut s.joints,
            _ => unreachable!(),
        })?;
        Ok(())
    }

    pub fn skin_joints(&self, skin: PropertyId) -> Vec<PropertyId> {
        self.list_targets(&self.skin(skin).joints.0)
    }

    // ------------------------------------------------------------------
    // Animations
    // ------------------------------------------------------------------

    pub fn animation_add_channel(
        &mut self,
        animation: PropertyId,
        channel: PropertyId,
    ) -> Result<()> {
        self.push_ref_list(animation, "channels", channel, EdgeAttrs::NONE, |d| match d {
            PropertyData::Animation(a) => &mut a.channels,
            _ => unreachable!(),
        })?;
        Ok(())
    }

    pub fn animation_channels(&self, animation: PropertyId) -> Vec<PropertyId> {
        self.list_targets(&self.animation(animation).channels.0)
    }

    pub fn animation_add_sampler(
        &mut self,
        animation: PropertyId,
        sampler: PropertyId,
    ) -> Result<()> {
        self.push_ref_list(animation, "samplers", sampler, EdgeAttrs::NONE, |d| match d {
            PropertyData::Animation(a) => &mut a.samplers,
            _ => unreachable!(),
        })?;
        Ok(())
    }

    pub fn animation_samplers(&self, animation: PropertyId) -> Vec<PropertyId> {
        self.list_targets(&self.animation(animation).samplers.0)
    }

    pub fn set_channel_sampler(
        &mut self,
        channel: PropertyId,
        sampler: Option<PropertyId>,
    ) -> Result<()> {
        self.set_ref(channel, "sampler", sampler, EdgeAttrs::NONE, |d| match d {
            PropertyData::AnimationChannel(c) => &mut c.sampler,
            _ => unreachable!(),
        })
    }

    pub fn channel_sampler(&self, channel: PropertyId) -> Option<PropertyId> {
        self.target(&self.channel(channel).sampler)
    }

    pub fn set_channel_target_node(
        &mut self,
        channel: PropertyId,
        node: Option<PropertyId>,
    ) -> Result<()> {
        self.set_ref(channel, "targetNode", node, EdgeAttrs::NONE, |d| match d {
            PropertyData::AnimationChannel(c) => &mut c.target_node,
            _ => unreachable!(),
        })
    }

    pub fn channel_target_node(&self, channel: PropertyId) -> Option<PropertyId> {
        self.target(&self.channel(channel).target_node)
    }

    pub fn set_sampler_input(
        &mut self,
        sampler: PropertyId,
        accessor: Option<PropertyId>,
    ) -> Result<()> {
        self.set_ref(
            sampler,
            "input",
            accessor,
            EdgeAttrs::usage(AccessorUsage::Other),
            |d| match d {
                PropertyData::AnimationSampler(s) => &mut s.input,
                _ => unreachable!(),
            },
        )
    }

    pub fn sampler_input(&self, sampler: PropertyId) -> Option<PropertyId> {
        self.target(&self.sampler(sampler).input)
    }

    pub fn set_sampler_output(
        &mut self,
        sampler: PropertyId,
        accessor: Option<PropertyId>,
    ) -> Result<()> {
        self.set_ref(
            sampler,
            "output",
            accessor,
            EdgeAttrs::usage(AccessorUsage::Other),
            |d| match d {
                PropertyData::AnimationSampler(s) => &mut s.output,
                _ => unreachable!(),
            },
        )
    }

    pub fn sampler_output(&self, sampler: PropertyId) -> Option<PropertyId> {
        self.target(&self.sampler(sampler).output)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Destroys a property, severing inbound and outbound references.
    /// Owned children (a material's texture infos) are disposed with it.
    pub fn dispose(&mut self, id: PropertyId) {
        if id == self.root {
            panic!("the document root cannot be disposed");
        }
        let owned: Vec<PropertyId> = self
            .graph
            .outgoing_edges(id)
            .into_iter()
            .filter_map(|edge| {
                let e = self.graph.edge(edge)?;
                e.attrs.owned.then(|| e.target)
            })
            .collect();
        let severed = self.graph.remove_node(id);
        for (edge, owner) in severed {
            if let Some(prop) = self.props.get_mut(&owner) {
                prop.data.unlink(edge);
            }
        }
        self.props.shift_remove(&id);
        for child in owned {
            if self.props.contains_key(&child) {
                self.dispose(child);
            }
        }
    }

    /// Severs inbound references only, leaving the property reusable as a
    /// subtree. The root collections keep listing it.
    pub fn detach(&mut self, id: PropertyId) {
        let root = self.root;
        let severed = self.graph.disconnect_parents(id, |edge| edge.owner != root);
        for (edge, owner) in severed {
            if let Some(prop) = self.props.get_mut(&owner) {
                prop.data.unlink(edge);
            }
        }
    }

    /// Rewires every reference to `old` so it points at `new` instead,
    /// preserving edge attributes. Used to deduplicate equivalent resources.
    pub fn swap(&mut self, old: PropertyId, new: PropertyId) -> Result<()> {
        for edge in self.graph.incoming_edges(old) {
            self.graph.retarget(edge, new)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Copy and merge
    // ------------------------------------------------------------------

    /// Appends a deep copy of every property of `other` into this document.
    /// Top-level copies register into this document's root collections; all
    /// cross-references are re-linked through the copy map.
    pub fn merge(&mut self, other: &Document) -> Result<()> {
        let mut map: IndexMap<PropertyId, PropertyId> = IndexMap::new();
        let sources: Vec<PropertyId> = other
            .props
            .keys()
            .copied()
            .filter(|&id| id != other.root)
            .collect();
        for src in &sources {
            let prop = other.prop(*src);
            let name = prop.name.clone();
            let extras = prop.extras.clone();
            let dst = self.create(blank_data(prop.kind()), &name);
            self.prop_mut(dst).extras = extras;
            map.insert(*src, dst);
        }
        for src in &sources {
            self.copy_property(map[src], other, *src, &map)?;
        }
        if self.default_scene().is_none() {
            if let Some(scene) = other.default_scene() {
                if let Some(&mapped) = map.get(&scene) {
                    self.set_default_scene(Some(mapped))?;
                }
            }
        }
        Ok(())
    }

    /// Copies literal attributes from `src` (of `other`) onto `dst` and
    /// re-links its reference attributes, translating targets through
    /// `resolve`. References whose targets do not resolve are dropped.
    pub fn copy_property(
        &mut self,
        dst: PropertyId,
        other: &Document,
        src: PropertyId,
        resolve: &IndexMap<PropertyId, PropertyId>,
    ) -> Result<()> {
        let data = other.prop(src).data.clone();
        let mapped = |id: PropertyId| resolve.get(&id).copied();
        match data {
            PropertyData::Root(_) => {}
            PropertyData::Scene(d) => {
                for child in other.list_targets(&d.children.0) {
                    if let Some(child) = mapped(child) {
                        self.scene_add_child(dst, child)?;
                    }
                }
            }
            PropertyData::Node(d) => {
                {
                    let node = self.node_mut(dst);
                    node.translation = d.translation;
                    node.rotation = d.rotation;
                    node.scale = d.scale;
                    node.weights = d.weights.clone();
                }
                for child in other.list_targets(&d.children.0) {
                    if let Some(child) = mapped(child) {
                        self.add_child(dst, child)?;
                    }
                }
                self.set_node_mesh(dst, other.target(&d.mesh).and_then(mapped))?;
                self.set_node_camera(dst, other.target(&d.camera).and_then(mapped))?;
                self.set_node_skin(dst, other.target(&d.skin).and_then(mapped))?;
            }
            PropertyData::Mesh(d) => {
                self.mesh_mut(dst).weights = d.weights.clone();
                for primitive in other.list_targets(&d.primitives.0) {
                    if let Some(primitive) = mapped(primitive) {
                        self.mesh_add_primitive(dst, primitive)?;
                    }
                }
            }
            PropertyData::Primitive(d) => {
                self.primitive_mut(dst).mode = d.mode;
                for (key, edge) in d.attributes.entries() {
                    let accessor = other.graph.target_of(edge).and_then(mapped);
                    self.set_primitive_attribute(dst, key, accessor)?;
                }
                self.set_primitive_indices(dst, other.target(&d.indices).and_then(mapped))?;
                self.set_primitive_material(dst, other.target(&d.material).and_then(mapped))?;
                for target in other.list_targets(&d.targets.0) {
                    if let Some(target) = mapped(target) {
                        self.primitive_add_target(dst, target)?;
                    }
                }
            }
            PropertyData::MorphTarget(d) => {
                for (key, edge) in d.attributes.entries() {
                    let accessor = other.graph.target_of(edge).and_then(mapped);
                    self.set_target_attribute(dst, key, accessor)?;
                }
            }
            PropertyData::Material(d) => {
                {
                    let material = self.material_data_raw(dst);
                    material.double_sided = d.double_sided;
                    material.alpha_mode = d.alpha_mode;
                    material.alpha_cutoff = d.alpha_cutoff;
                    material.base_color_factor = d.base_color_factor;
                    material.emissive_factor = d.emissive_factor;
                    material.metallic_factor = d.metallic_factor;
                    material.roughness_factor = d.roughness_factor;
                    material.normal_scale = d.normal_scale;
                    material.occlusion_strength = d.occlusion_strength;
                }
                // Owned texture-info children are cloned through the map.
                for slot in [
                    MaterialTexture::BaseColor,
                    MaterialTexture::MetallicRoughness,
                    MaterialTexture::Normal,
                    MaterialTexture::Occlusion,
                    MaterialTexture::Emissive,
                ] {
                    let info = other.target(material_slot(&d, slot)).and_then(mapped);
                    if let Some(info) = info {
                        let edge = self.graph.connect(
                            material_slot_name(slot),
                            dst,
                            info,
                            EdgeAttrs::owned(),
                        )?;
                        material_slot_mut(self.material_data_raw(dst), slot).0 = Some(edge);
                    }
                }
            }
            PropertyData::TextureInfo(d) => {
                {
                    let info = self.texture_info_mut(dst);
                    info.tex_coord = d.tex_coord;
                    info.mag_filter = d.mag_filter;
                    info.min_filter = d.min_filter;
                    info.wrap_s = d.wrap_s;
                    info.wrap_t = d.wrap_t;
                }
                let texture = other.target(&d.texture).and_then(mapped);
                self.set_ref(dst, "texture", texture, EdgeAttrs::NONE, |p| match p {
                    PropertyData::TextureInfo(i) => &mut i.texture,
                    _ => unreachable!(),
                })?;
            }
            PropertyData::Texture(d) => {
                *self.texture_mut(dst) = d.clone();
            }
            PropertyData::Accessor(d) => {
                {
                    let accessor = self.accessor_mut(dst);
                    accessor.element_type = d.element_type;
                    accessor.normalized = d.normalized;
                    accessor.sparse = d.sparse;
                    accessor.array = d.array.clone();
                }
                self.set_accessor_buffer(dst, other.target(&d.buffer).and_then(mapped))?;
            }
            PropertyData::Buffer(d) => {
                *self.buffer_mut(dst) = d.clone();
            }
            PropertyData::Camera(d) => {
                self.camera_mut(dst).projection = d.projection;
            }
            PropertyData::Skin(d) => {
                self.set_skin_skeleton(dst, other.target(&d.skeleton).and_then(mapped))?;
                self.set_skin_inverse_bind_matrices(
                    dst,
                    other.target(&d.inverse_bind_matrices).and_then(mapped),
                )?;
                for joint in other.list_targets(&d.joints.0) {
                    if let Some(joint) = mapped(joint) {
                        self.skin_add_joint(dst, joint)?;
                    }
                }
            }
            PropertyData::Animation(d) => {
                for channel in other.list_targets(&d.channels.0) {
                    if let Some(channel) = mapped(channel) {
                        self.animation_add_channel(dst, channel)?;
                    }
                }
                for sampler in other.list_targets(&d.samplers.0) {
                    if let Some(sampler) = mapped(sampler) {
                        self.animation_add_sampler(dst, sampler)?;
                    }
                }
            }
            PropertyData::AnimationChannel(d) => {
                self.channel_mut(dst).target_path = d.target_path;
                self.set_channel_target_node(dst, other.target(&d.target_node).and_then(mapped))?;
                self.set_channel_sampler(dst, other.target(&d.sampler).and_then(mapped))?;
            }
            PropertyData::AnimationSampler(d) => {
                self.sampler_mut(dst).interpolation = d.interpolation;
                self.set_sampler_input(dst, other.target(&d.input).and_then(mapped))?;
                self.set_sampler_output(dst, other.target(&d.output).and_then(mapped))?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structural equality
    // ------------------------------------------------------------------

    /// Deep structural equality of two whole documents.
    pub fn equals(&self, other: &Document) -> bool {
        self.property_equals(self.root, other, other.root)
    }

    /// Deep structural equality: same kind, equal literals, and recursively
    /// equal referenced subtrees (not reference identity).
    pub fn property_equals(&self, a: PropertyId, other: &Document, b: PropertyId) -> bool {
        let pa = self.prop(a);
        let pb = other.prop(b);
        if pa.kind() != pb.kind() || pa.name != pb.name || pa.extras != pb.extras {
            return false;
        }
        if !pa.data.literals_eq(&pb.data) {
            return false;
        }

        let slots_a = pa.data.slots();
        let slots_b = pb.data.slots();
        for (sa, sb) in slots_a.iter().zip(slots_b.iter()) {
            match (sa, sb) {
                (Slot::One(ra), Slot::One(rb)) => {
                    match (self.target(ra), other.target(rb)) {
                        (None, None) => {}
                        (Some(ta), Some(tb)) => {
                            if !self.property_equals(ta, other, tb) {
                                return false;
                            }
                        }
                        _ => return false,
                    }
                }
                (Slot::List(la), Slot::List(lb)) => {
                    let ta = self.list_targets(&la.0);
                    let tb = other.list_targets(&lb.0);
                    if ta.len() != tb.len() {
                        return false;
                    }
                    for (x, y) in ta.iter().zip(tb.iter()) {
                        if !self.property_equals(*x, other, *y) {
                            return false;
                        }
                    }
                }
                (Slot::Set(la), Slot::Set(lb)) => {
                    let ta = self.list_targets(&la.0);
                    let tb = other.list_targets(&lb.0);
                    if ta.len() != tb.len() {
                        return false;
                    }
                    let mut used = vec![false; tb.len()];
                    for x in &ta {
                        let found = tb.iter().enumerate().position(|(i, y)| {
                            !used[i] && self.property_equals(*x, other, *y)
                        });
                        match found {
                            Some(i) => used[i] = true,
                            None => return false,
                        }
                    }
                }
                (Slot::Map(ma), Slot::Map(mb)) => {
                    if ma.0.len() != mb.0.len() {
                        return false;
                    }
                    for (key, &ea) in ma.0.iter() {
                        let ta = self.graph.target_of(ea);
                        let tb = mb.edge(key).and_then(|e| other.graph.target_of(e));
                        match (ta, tb) {
                            (Some(x), Some(y)) => {
                                if !self.property_equals(x, other, y) {
                                    return false;
                                }
                            }
                            _ => return false,
                        }
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn material_slot_name(slot: MaterialTexture) -> &'static str {
    match slot {
        MaterialTexture::BaseColor => "baseColorTextureInfo",
        MaterialTexture::MetallicRoughness => "metallicRoughnessTextureInfo",
        MaterialTexture::Normal => "normalTextureInfo",
        MaterialTexture::Occlusion => "occlusionTextureInfo",
        MaterialTexture::Emissive => "emissiveTextureInfo",
    }
}

fn material_slot(data: &MaterialData, slot: MaterialTexture) -> &Ref {
    match slot {
        MaterialTexture::BaseColor => &data.base_color_info,
        MaterialTexture::MetallicRoughness => &data.metallic_roughness_info,
        MaterialTexture::Normal => &data.normal_info,
        MaterialTexture::Occlusion => &data.occlusion_info,
        MaterialTexture::Emissive => &data.emissive_info,
    }
}

fn material_slot_mut(data: &mut MaterialData, slot: MaterialTexture) -> &mut Ref {
    match slot {
        MaterialTexture::BaseColor => &mut data.base_color_info,
        MaterialTexture::MetallicRoughness => &mut data.metallic_roughness_info,
        MaterialTexture::Normal => &mut data.normal_info,
        MaterialTexture::Occlusion => &mut data.occlusion_info,
        MaterialTexture::Emissive => &mut data.emissive_info,
    }
}

fn blank_data(kind: PropertyKind) -> PropertyData {
    match kind {
        PropertyKind::Root => unreachable!("the root is never copied"),
        PropertyKind::Scene => PropertyData::Scene(SceneData::default()),
        PropertyKind::Node => PropertyData::Node(NodeData::default()),
        PropertyKind::Mesh => PropertyData::Mesh(MeshData::default()),
        PropertyKind::Primitive => PropertyData::Primitive(PrimitiveData::default()),
        PropertyKind::MorphTarget => PropertyData::MorphTarget(MorphTargetData::default()),
        PropertyKind::Material => PropertyData::Material(MaterialData::default()),
        PropertyKind::TextureInfo => PropertyData::TextureInfo(TextureInfoData::default()),
        PropertyKind::Texture => PropertyData::Texture(TextureData::default()),
        PropertyKind::Accessor => PropertyData::Accessor(AccessorData::default()),
        PropertyKind::Buffer => PropertyData::Buffer(BufferData::default()),
        PropertyKind::Camera => PropertyData::Camera(CameraData::default()),
        PropertyKind::Skin => PropertyData::Skin(SkinData::default()),
        PropertyKind::Animation => PropertyData::Animation(AnimationData::default()),
        PropertyKind::AnimationChannel => {
            PropertyData::AnimationChannel(AnimationChannelData::default())
        }
        PropertyKind::AnimationSampler => {
            PropertyData::AnimationSampler(AnimationSamplerData::default())
        }
    }
}

fn root_sets(data: &mut PropertyData, index: usize) -> &mut RefSet {
    let root = match data {
        PropertyData::Root(root) => root,
        _ => unreachable!(),
    };
    match index {
        0 => &mut root.scenes,
        1 => &mut root.nodes,
        2 => &mut root.meshes,
        3 => &mut root.materials,
        4 => &mut root.textures,
        5 => &mut root.animations,
        6 => &mut root.accessors,
        7 => &mut root.buffers,
        8 => &mut root.cameras,
        9 => &mut root.skins,
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn factories_register_into_root() {
        let mut doc = Document::new();
        let scene = doc.create_scene("main");
        let node = doc.create_node("prop");
        let mesh = doc.create_mesh("geometry");

        assert_eq!(vec![scene], doc.list_scenes());
        assert_eq!(vec![node], doc.list_nodes());
        assert_eq!(vec![mesh], doc.list_meshes());
        assert_eq!("main", doc.name(scene));
    }

    #[test]
    fn node_parent_exclusivity() {
        let mut doc = Document::new();
        let scene = doc.create_scene("scene");
        let a = doc.create_node("a");
        let b = doc.create_node("b");
        let child = doc.create_node("child");

        doc.scene_add_child(scene, child).unwrap();
        assert_eq!(vec![child], doc.scene_children(scene));

        doc.add_child(a, child).unwrap();
        assert_eq!(Some(a), doc.node_parent(child));
        assert!(doc.scene_children(scene).is_empty());

        doc.add_child(b, child).unwrap();
        assert_eq!(Some(b), doc.node_parent(child));
        assert!(doc.node_children(a).is_empty());

        doc.scene_add_child(scene, child).unwrap();
        assert_eq!(None, doc.node_parent(child));
        assert_eq!(vec![child], doc.scene_children(scene));
    }

    #[test]
    fn world_matrix_composes_parent_chain() {
        let mut doc = Document::new();
        let parent = doc.create_node("parent");
        let child = doc.create_node("child");
        doc.node_mut(parent).translation = Vec3::new(1.0, 0.0, 0.0);
        doc.node_mut(child).translation = Vec3::new(0.0, 2.0, 0.0);
        doc.add_child(parent, child).unwrap();

        let world = doc.world_matrix(child);
        let origin = world.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn dispose_severs_and_cascades_owned_children() {
        let mut doc = Document::new();
        let material = doc.create_material("mat");
        let texture = doc.create_texture("tex");
        let primitive = doc.create_primitive();
        doc.set_primitive_material(primitive, Some(material)).unwrap();
        doc.set_material_texture(material, MaterialTexture::BaseColor, Some(texture))
            .unwrap();

        let info = doc.material_texture_info(material, MaterialTexture::BaseColor);
        doc.dispose(material);

        assert!(!doc.contains(material));
        assert!(!doc.contains(info));
        assert_eq!(None, doc.primitive_material(primitive));
        // The referenced texture survives.
        assert!(doc.contains(texture));
    }

    #[test]
    fn detach_keeps_subtree() {
        let mut doc = Document::new();
        let parent = doc.create_node("parent");
        let node = doc.create_node("node");
        let child = doc.create_node("child");
        doc.add_child(parent, node).unwrap();
        doc.add_child(node, child).unwrap();

        doc.detach(node);
        assert!(doc.node_children(parent).is_empty());
        assert_eq!(vec![child], doc.node_children(node));
        // Still listed at the root and usable as a subtree.
        assert!(doc.list_nodes().contains(&node));
    }

    #[test]
    fn swap_rewires_references() {
        let mut doc = Document::new();
        let primitive = doc.create_primitive();
        let a = doc.create_accessor("a");
        let b = doc.create_accessor("b");
        doc.set_primitive_indices(primitive, Some(a)).unwrap();

        doc.swap(a, b).unwrap();
        assert_eq!(Some(b), doc.primitive_indices(primitive));
        let edge = doc.primitive(primitive).indices.edge().unwrap();
        assert_eq!(
            Some(AccessorUsage::Index),
            doc.graph().edge(edge).unwrap().attrs.usage
        );
    }

    #[test]
    fn ref_set_replaces_edge_for_existing_child() {
        let mut doc = Document::new();
        let scene = doc.create_scene("scene");
        let node = doc.create_node("node");
        doc.scene_add_child(scene, node).unwrap();
        doc.scene_add_child(scene, node).unwrap();

        assert_eq!(vec![node], doc.scene_children(scene));
        assert_eq!(1, doc.graph().incoming_edges(node).len());
    }

    #[test]
    fn merge_copies_subtrees_across_documents() {
        let mut src = Document::new();
        let scene = src.create_scene("scene");
        let node = src.create_node("node");
        let material = src.create_material("mat");
        let texture = src.create_texture("tex");
        src.texture_mut(texture).image = Some(vec![1, 2, 3]);
        src.set_material_texture(material, MaterialTexture::BaseColor, Some(texture))
            .unwrap();
        src.scene_add_child(scene, node).unwrap();
        src.set_default_scene(Some(scene)).unwrap();

        let mut dst = Document::new();
        dst.merge(&src).unwrap();

        assert!(dst.equals(&src));
        let merged_material = dst.list_materials()[0];
        let merged_texture = dst
            .material_texture(merged_material, MaterialTexture::BaseColor)
            .unwrap();
        assert_eq!(Some(vec![1, 2, 3]), dst.texture(merged_texture).image);
    }

    #[test]
    fn structural_equality_is_deep() {
        let build = || {
            let mut doc = Document::new();
            let scene = doc.create_scene("scene");
            let node = doc.create_node("node");
            let mesh = doc.create_mesh("mesh");
            let primitive = doc.create_primitive();
            let accessor = doc.create_accessor("positions");
            doc.accessor_mut(accessor).element_type = ElementType::Vec3;
            doc.accessor_mut(accessor).array =
                Some(ScalarArray::F32(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]));
            doc.set_primitive_attribute(primitive, "POSITION", Some(accessor))
                .unwrap();
            doc.mesh_add_primitive(mesh, primitive).unwrap();
            doc.set_node_mesh(node, Some(mesh)).unwrap();
            doc.scene_add_child(scene, node).unwrap();
            doc.set_default_scene(Some(scene)).unwrap();
            doc
        };

        let a = build();
        let b = build();
        assert!(a.equals(&b));

        let mut c = build();
        let accessor = c.list_accessors()[0];
        c.accessor_mut(accessor).array =
            Some(ScalarArray::F32(vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0]));
        assert!(!a.equals(&c));
    }
}
