use std::path::PathBuf;

use glam::{Vec2, Vec3, Vec4};

/// Represents a parsed 3D model on its way to becoming a game prop.
/// It's the intermediary format between the model parsers and the asset
/// generators, and carries the bounding volumes they need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropMesh {
    /// The name of the mesh, usually derived from the source file.
    pub name: String,
    /// One sub-geometry per material group.
    pub geometries: Vec<Geometry>,
    /// The materials referenced by the geometries.
    pub materials: Vec<PropMaterial>,
    pub bounding_box: BoundingBox,
    pub bounding_sphere: BoundingSphere,
}

impl PropMesh {
    pub fn vertex_count(&self) -> usize {
        self.geometries.iter().map(|g| g.vertices.len()).sum()
    }

    pub fn face_count(&self) -> usize {
        self.geometries.iter().map(|g| g.indices.len() / 3).sum()
    }
}

/// Represents the geometry of one material group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    /// Index into the mesh material list.
    pub material_index: usize,
    /// The list of vertices (vertex buffer) of the geometry.
    pub vertices: Vec<Vertex>,
    /// The list of indices (index buffer) of the geometry, which determines
    /// the triangles of the mesh.
    pub indices: Vec<u32>,
}

/// Represents a vertex of a geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// The position of the vertex, relative to the origin.
    pub position: Vec3,
    /// The normal vector of the vertex. Zero when the source carried none.
    pub normal: Vec3,
    /// The UV-mapping texture coordinates of the vertex, if present.
    pub tex_coord: Option<Vec2>,
    pub tangent: Option<Vec4>,
    pub color: Option<Vec4>,
}

impl Vertex {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            normal: Vec3::ZERO,
            tex_coord: None,
            tangent: None,
            color: None,
        }
    }
}

/// Represents a material slot of the mesh, holding the texture paths and
/// shader selection the generators consume.
#[derive(Debug, Clone, PartialEq)]
pub struct PropMaterial {
    pub name: String,
    pub diffuse_texture: Option<PathBuf>,
    pub normal_texture: Option<PathBuf>,
    pub specular_texture: Option<PathBuf>,
    pub diffuse_color: Vec4,
    /// Target shader preset name, e.g. `default.sps`.
    pub shader_name: String,
}

impl Default for PropMaterial {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            diffuse_texture: None,
            normal_texture: None,
            specular_texture: None,
            diffuse_color: Vec4::new(0.8, 0.8, 0.8, 1.0),
            shader_name: String::from("default.sps"),
        }
    }
}

/// Axis-aligned bounding box over every vertex of the mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

/// Conservative bounding sphere: centered at the box midpoint with radius
/// half the box diagonal, not a minimal enclosing sphere.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}
