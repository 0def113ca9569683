use glam::{Quat, Vec3};
use indexmap::IndexMap;

use crate::document::accessor::AccessorData;
use crate::graph::EdgeId;

/// Single optional reference to another property, held as an edge id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ref(pub(crate) Option<EdgeId>);

impl Ref {
    pub fn edge(&self) -> Option<EdgeId> {
        self.0
    }

    pub(crate) fn unlink(&mut self, edge: EdgeId) {
        if self.0 == Some(edge) {
            self.0 = None;
        }
    }
}

/// Ordered list of references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefList(pub(crate) Vec<EdgeId>);

impl RefList {
    pub fn edges(&self) -> &[EdgeId] {
        &self.0
    }

    pub(crate) fn unlink(&mut self, edge: EdgeId) {
        self.0.retain(|&e| e != edge);
    }
}

/// Unordered set of references with at most one edge per referenced child.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefSet(pub(crate) Vec<EdgeId>);

impl RefSet {
    pub fn edges(&self) -> &[EdgeId] {
        &self.0
    }

    pub(crate) fn unlink(&mut self, edge: EdgeId) {
        self.0.retain(|&e| e != edge);
    }
}

/// String-keyed map of references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefMap(pub(crate) IndexMap<String, EdgeId>);

impl RefMap {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, EdgeId)> {
        self.0.iter().map(|(k, &e)| (k.as_str(), e))
    }

    pub fn edge(&self, key: &str) -> Option<EdgeId> {
        self.0.get(key).copied()
    }

    pub(crate) fn unlink(&mut self, edge: EdgeId) {
        self.0.retain(|_, &mut e| e != edge);
    }
}

/// How an accessor is consumed by its referencing property. Resolved once at
/// edge-creation time and carried on the edge, so the writer never has to
/// reverse-engineer it from names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorUsage {
    VertexAttribute,
    Index,
    InverseBindMatrices,
    Sparse,
    Other,
}

/// Side metadata carried by every edge.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeAttrs {
    pub usage: Option<AccessorUsage>,
    /// Owned children (a material's nested texture-info records) are created
    /// with their owner, cannot be reassigned, and are disposed with it.
    pub owned: bool,
}

impl EdgeAttrs {
    pub const NONE: EdgeAttrs = EdgeAttrs {
        usage: None,
        owned: false,
    };

    pub fn usage(usage: AccessorUsage) -> Self {
        EdgeAttrs {
            usage: Some(usage),
            owned: false,
        }
    }

    pub fn owned() -> Self {
        EdgeAttrs {
            usage: None,
            owned: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Root,
    Scene,
    Node,
    Mesh,
    Primitive,
    MorphTarget,
    Material,
    TextureInfo,
    Texture,
    Accessor,
    Buffer,
    Camera,
    Skin,
    Animation,
    AnimationChannel,
    AnimationSampler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    Opaque,
    Mask,
    Blend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    ClampToEdge,
    MirroredRepeat,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
    Weights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
    CubicSpline,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        znear: f32,
        zfar: Option<f32>,
        yfov: f32,
        aspect: Option<f32>,
    },
    Orthographic {
        znear: f32,
        zfar: f32,
        xmag: f32,
        ymag: f32,
    },
}

/// Self-updating set of all top-level entity collections. Populated by the
/// document as it drains node-created events from the graph.
#[derive(Debug, Clone, Default)]
pub struct RootData {
    pub generator: Option<String>,
    pub extensions_used: Vec<String>,
    pub extensions_required: Vec<String>,
    pub default_scene: Ref,
    pub scenes: RefSet,
    pub nodes: RefSet,
    pub meshes: RefSet,
    pub materials: RefSet,
    pub textures: RefSet,
    pub animations: RefSet,
    pub accessors: RefSet,
    pub buffers: RefSet,
    pub cameras: RefSet,
    pub skins: RefSet,
}

#[derive(Debug, Clone, Default)]
pub struct SceneData {
    pub children: RefSet,
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub weights: Vec<f32>,
    pub camera: Ref,
    pub mesh: Ref,
    pub skin: Ref,
    pub children: RefList,
}

impl Default for NodeData {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            weights: Vec::new(),
            camera: Ref::default(),
            mesh: Ref::default(),
            skin: Ref::default(),
            children: RefList::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub weights: Vec<f32>,
    pub primitives: RefList,
}

#[derive(Debug, Clone)]
pub struct PrimitiveData {
    pub mode: PrimitiveMode,
    pub attributes: RefMap,
    pub indices: Ref,
    pub material: Ref,
    pub targets: RefList,
}

impl Default for PrimitiveData {
    fn default() -> Self {
        Self {
            mode: PrimitiveMode::Triangles,
            attributes: RefMap::default(),
            indices: Ref::default(),
            material: Ref::default(),
            targets: RefList::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MorphTargetData {
    pub attributes: RefMap,
}

#[derive(Debug, Clone)]
pub struct MaterialData {
    pub double_sided: bool,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub base_color_factor: [f32; 4],
    pub emissive_factor: [f32; 3],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub normal_scale: f32,
    pub occlusion_strength: f32,
    // Owned texture-info children, wired at construction.
    pub base_color_info: Ref,
    pub metallic_roughness_info: Ref,
    pub normal_info: Ref,
    pub occlusion_info: Ref,
    pub emissive_info: Ref,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            double_sided: false,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            emissive_factor: [0.0, 0.0, 0.0],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            normal_scale: 1.0,
            occlusion_strength: 1.0,
            base_color_info: Ref::default(),
            metallic_roughness_info: Ref::default(),
            normal_info: Ref::default(),
            occlusion_info: Ref::default(),
            emissive_info: Ref::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextureInfoData {
    pub tex_coord: u32,
    pub mag_filter: Option<MagFilter>,
    pub min_filter: Option<MinFilter>,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub texture: Ref,
}

impl Default for TextureInfoData {
    fn default() -> Self {
        Self {
            tex_coord: 0,
            mag_filter: None,
            min_filter: None,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            texture: Ref::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextureData {
    pub mime_type: Option<String>,
    /// Encoded image bytes. `None` marks a texture whose image could not be
    /// resolved (non-strict reads leave it in this state).
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct BufferData {
    pub uri: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CameraData {
    pub projection: Projection,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            projection: Projection::Perspective {
                znear: 0.1,
                zfar: None,
                yfov: std::f32::consts::FRAC_PI_2,
                aspect: None,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SkinData {
    pub skeleton: Ref,
    pub inverse_bind_matrices: Ref,
    pub joints: RefList,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationData {
    pub channels: RefList,
    pub samplers: RefList,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationChannelData {
    pub target_path: Option<TargetPath>,
    pub target_node: Ref,
    pub sampler: Ref,
}

#[derive(Debug, Clone)]
pub struct AnimationSamplerData {
    pub interpolation: Interpolation,
    pub input: Ref,
    pub output: Ref,
}

impl Default for AnimationSamplerData {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Linear,
            input: Ref::default(),
            output: Ref::default(),
        }
    }
}

/// Closed union over every concrete entity kind. Reference-kind dispatch is
/// a match over this enum rather than a runtime type test.
#[derive(Debug, Clone)]
pub enum PropertyData {
    Root(RootData),
    Scene(SceneData),
    Node(NodeData),
    Mesh(MeshData),
    Primitive(PrimitiveData),
    MorphTarget(MorphTargetData),
    Material(MaterialData),
    TextureInfo(TextureInfoData),
    Texture(TextureData),
    Accessor(AccessorData),
    Buffer(BufferData),
    Camera(CameraData),
    Skin(SkinData),
    Animation(AnimationData),
    AnimationChannel(AnimationChannelData),
    AnimationSampler(AnimationSamplerData),
}

/// Read-only view of one reference slot, used by deep equality.
pub(crate) enum Slot<'a> {
    One(&'a Ref),
    List(&'a RefList),
    Set(&'a RefSet),
    Map(&'a RefMap),
}

impl PropertyData {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyData::Root(_) => PropertyKind::Root,
            PropertyData::Scene(_) => PropertyKind::Scene,
            PropertyData::Node(_) => PropertyKind::Node,
            PropertyData::Mesh(_) => PropertyKind::Mesh,
            PropertyData::Primitive(_) => PropertyKind::Primitive,
            PropertyData::MorphTarget(_) => PropertyKind::MorphTarget,
            PropertyData::Material(_) => PropertyKind::Material,
            PropertyData::TextureInfo(_) => PropertyKind::TextureInfo,
            PropertyData::Texture(_) => PropertyKind::Texture,
            PropertyData::Accessor(_) => PropertyKind::Accessor,
            PropertyData::Buffer(_) => PropertyKind::Buffer,
            PropertyData::Camera(_) => PropertyKind::Camera,
            PropertyData::Skin(_) => PropertyKind::Skin,
            PropertyData::Animation(_) => PropertyKind::Animation,
            PropertyData::AnimationChannel(_) => PropertyKind::AnimationChannel,
            PropertyData::AnimationSampler(_) => PropertyKind::AnimationSampler,
        }
    }

    /// Enumerates the reference slots of this property in declaration order.
    pub(crate) fn slots(&self) -> Vec<Slot<'_>> {
        match self {
            PropertyData::Root(d) => vec![
                Slot::One(&d.default_scene),
                Slot::Set(&d.scenes),
                Slot::Set(&d.nodes),
                Slot::Set(&d.meshes),
                Slot::Set(&d.materials),
                Slot::Set(&d.textures),
                Slot::Set(&d.animations),
                Slot::Set(&d.accessors),
                Slot::Set(&d.buffers),
                Slot::Set(&d.cameras),
                Slot::Set(&d.skins),
            ],
            PropertyData::Scene(d) => vec![Slot::Set(&d.children)],
            PropertyData::Node(d) => vec![
                Slot::One(&d.camera),
                Slot::One(&d.mesh),
                Slot::One(&d.skin),
                Slot::List(&d.children),
            ],
            PropertyData::Mesh(d) => vec![Slot::List(&d.primitives)],
            PropertyData::Primitive(d) => vec![
                Slot::Map(&d.attributes),
                Slot::One(&d.indices),
                Slot::One(&d.material),
                Slot::List(&d.targets),
            ],
            PropertyData::MorphTarget(d) => vec![Slot::Map(&d.attributes)],
            PropertyData::Material(d) => vec![
                Slot::One(&d.base_color_info),
                Slot::One(&d.metallic_roughness_info),
                Slot::One(&d.normal_info),
                Slot::One(&d.occlusion_info),
                Slot::One(&d.emissive_info),
            ],
            PropertyData::TextureInfo(d) => vec![Slot::One(&d.texture)],
            PropertyData::Texture(_) => Vec::new(),
            PropertyData::Accessor(d) => vec![Slot::One(&d.buffer)],
            PropertyData::Buffer(_) => Vec::new(),
            PropertyData::Camera(_) => Vec::new(),
            PropertyData::Skin(d) => vec![
                Slot::One(&d.skeleton),
                Slot::One(&d.inverse_bind_matrices),
                Slot::List(&d.joints),
            ],
            PropertyData::Animation(d) => {
                vec![Slot::List(&d.channels), Slot::List(&d.samplers)]
            }
            PropertyData::AnimationChannel(d) => {
                vec![Slot::One(&d.target_node), Slot::One(&d.sampler)]
            }
            PropertyData::AnimationSampler(d) => {
                vec![Slot::One(&d.input), Slot::One(&d.output)]
            }
        }
    }

    /// Clears every slot that holds the given edge.
    pub(crate) fn unlink(&mut self, edge: EdgeId) {
        match self {
            PropertyData::Root(d) => {
                d.default_scene.unlink(edge);
                d.scenes.unlink(edge);
                d.nodes.unlink(edge);
                d.meshes.unlink(edge);
                d.materials.unlink(edge);
                d.textures.unlink(edge);
                d.animations.unlink(edge);
                d.accessors.unlink(edge);
                d.buffers.unlink(edge);
                d.cameras.unlink(edge);
                d.skins.unlink(edge);
            }
            PropertyData::Scene(d) => d.children.unlink(edge),
            PropertyData::Node(d) => {
                d.camera.unlink(edge);
                d.mesh.unlink(edge);
                d.skin.unlink(edge);
                d.children.unlink(edge);
            }
            PropertyData::Mesh(d) => d.primitives.unlink(edge),
            PropertyData::Primitive(d) => {
                d.attributes.unlink(edge);
                d.indices.unlink(edge);
                d.material.unlink(edge);
                d.targets.unlink(edge);
            }
            PropertyData::MorphTarget(d) => d.attributes.unlink(edge),
            PropertyData::Material(d) => {
                d.base_color_info.unlink(edge);
                d.metallic_roughness_info.unlink(edge);
                d.normal_info.unlink(edge);
                d.occlusion_info.unlink(edge);
                d.emissive_info.unlink(edge);
            }
            PropertyData::TextureInfo(d) => d.texture.unlink(edge),
            PropertyData::Texture(_) => {}
            PropertyData::Accessor(d) => d.buffer.unlink(edge),
            PropertyData::Buffer(_) => {}
            PropertyData::Camera(_) => {}
            PropertyData::Skin(d) => {
                d.skeleton.unlink(edge);
                d.inverse_bind_matrices.unlink(edge);
                d.joints.unlink(edge);
            }
            PropertyData::Animation(d) => {
                d.channels.unlink(edge);
                d.samplers.unlink(edge);
            }
            PropertyData::AnimationChannel(d) => {
                d.target_node.unlink(edge);
                d.sampler.unlink(edge);
            }
            PropertyData::AnimationSampler(d) => {
                d.input.unlink(edge);
                d.output.unlink(edge);
            }
        }
    }

    /// Compares the literal (non-reference) attributes of two properties of
    /// the same kind.
    pub(crate) fn literals_eq(&self, other: &PropertyData) -> bool {
        use PropertyData as P;
        match (self, other) {
            // The generator string is tool provenance, not content.
            (P::Root(a), P::Root(b)) => {
                a.extensions_used == b.extensions_used
                    && a.extensions_required == b.extensions_required
            }
            (P::Scene(_), P::Scene(_)) => true,
            (P::Node(a), P::Node(b)) => {
                a.translation == b.translation
                    && a.rotation == b.rotation
                    && a.scale == b.scale
                    && a.weights == b.weights
            }
            (P::Mesh(a), P::Mesh(b)) => a.weights == b.weights,
            (P::Primitive(a), P::Primitive(b)) => a.mode == b.mode,
            (P::MorphTarget(_), P::MorphTarget(_)) => true,
            (P::Material(a), P::Material(b)) => {
                a.double_sided == b.double_sided
                    && a.alpha_mode == b.alpha_mode
                    && a.alpha_cutoff == b.alpha_cutoff
                    && a.base_color_factor == b.base_color_factor
                    && a.emissive_factor == b.emissive_factor
                    && a.metallic_factor == b.metallic_factor
                    && a.roughness_factor == b.roughness_factor
                    && a.normal_scale == b.normal_scale
                    && a.occlusion_strength == b.occlusion_strength
            }
            (P::TextureInfo(a), P::TextureInfo(b)) => {
                a.tex_coord == b.tex_coord
                    && a.mag_filter == b.mag_filter
                    && a.min_filter == b.min_filter
                    && a.wrap_s == b.wrap_s
                    && a.wrap_t == b.wrap_t
            }
            (P::Texture(a), P::Texture(b)) => {
                a.mime_type == b.mime_type && a.image == b.image
            }
            (P::Accessor(a), P::Accessor(b)) => {
                a.element_type == b.element_type
                    && a.normalized == b.normalized
                    && a.sparse == b.sparse
                    && a.array == b.array
            }
            // A buffer's URI is a serialization hint, not identity: a
            // document written without one gets a generated file name.
            (P::Buffer(_), P::Buffer(_)) => true,
            (P::Camera(a), P::Camera(b)) => a.projection == b.projection,
            (P::Skin(_), P::Skin(_)) => true,
            (P::Animation(_), P::Animation(_)) => true,
            (P::AnimationChannel(a), P::AnimationChannel(b)) => {
                a.target_path == b.target_path
            }
            (P::AnimationSampler(a), P::AnimationSampler(b)) => {
                a.interpolation == b.interpolation
            }
            _ => false,
        }
    }
}

/// An entity of the document graph: a named payload with an application
/// extras bag.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub extras: Option<serde_json::Value>,
    pub data: PropertyData,
}

impl Property {
    pub fn new(data: PropertyData) -> Self {
        Self {
            name: String::new(),
            extras: None,
            data,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        self.data.kind()
    }
}
