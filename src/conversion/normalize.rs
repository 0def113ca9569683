use glam::{Vec2, Vec3};

use super::mesh::{BoundingBox, BoundingSphere, PropMesh};

/// Brings a parsed mesh into the state the generators rely on: every vertex
/// has a normal and a texture coordinate, and the bounding volumes are
/// computed. Normalizing an already-normalized mesh changes nothing.
pub fn normalize(mesh: &mut PropMesh) {
    ensure_normals(mesh);
    ensure_tex_coords(mesh);
    mesh.bounding_box = compute_bounding_box(mesh);
    mesh.bounding_sphere = compute_bounding_sphere(&mesh.bounding_box);
}

/// Scans every vertex position across every sub-geometry. An empty mesh
/// yields a degenerate zero box.
pub fn compute_bounding_box(mesh: &PropMesh) -> BoundingBox {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);

    for geometry in &mesh.geometries {
        for vertex in &geometry.vertices {
            min = min.min(vertex.position);
            max = max.max(vertex.position);
        }
    }

    if min.x == f32::INFINITY {
        return BoundingBox::default();
    }
    BoundingBox { min, max }
}

/// Sphere centered at the box midpoint with radius half the box diagonal.
/// Intentionally conservative rather than minimal; downstream consumers
/// expect this exact bound.
pub fn compute_bounding_sphere(bounding_box: &BoundingBox) -> BoundingSphere {
    let center = (bounding_box.min + bounding_box.max) / 2.0;
    let radius = (bounding_box.max - bounding_box.min).length() / 2.0;
    BoundingSphere { center, radius }
}

/// Flat normal of one triangle. A degenerate triangle (zero-length cross
/// product) falls back to the up vector.
pub fn face_normal(p0: Vec3, p1: Vec3, p2: Vec3) -> Vec3 {
    let normal = (p1 - p0).cross(p2 - p0);
    let length = normal.length();
    if length == 0.0 {
        return Vec3::Y;
    }
    normal / length
}

/// Synthesizes flat per-triangle normals for geometries carrying zero
/// normals. Each triangle overwrites its three vertex normals with the same
/// face normal; a vertex shared by several triangles keeps the normal of
/// the last one written.
pub fn ensure_normals(mesh: &mut PropMesh) {
    for geometry in &mut mesh.geometries {
        let has_normals = geometry
            .vertices
            .iter()
            .all(|vertex| vertex.normal != Vec3::ZERO);
        if has_normals {
            continue;
        }

        for triangle in 0..geometry.indices.len() / 3 {
            let i0 = geometry.indices[triangle * 3] as usize;
            let i1 = geometry.indices[triangle * 3 + 1] as usize;
            let i2 = geometry.indices[triangle * 3 + 2] as usize;
            let normal = face_normal(
                geometry.vertices[i0].position,
                geometry.vertices[i1].position,
                geometry.vertices[i2].position,
            );
            geometry.vertices[i0].normal = normal;
            geometry.vertices[i1].normal = normal;
            geometry.vertices[i2].normal = normal;
        }
    }
}

/// Gives every vertex a texture coordinate, defaulting to (0, 0).
pub fn ensure_tex_coords(mesh: &mut PropMesh) {
    for geometry in &mut mesh.geometries {
        for vertex in &mut geometry.vertices {
            if vertex.tex_coord.is_none() {
                vertex.tex_coord = Some(Vec2::ZERO);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::conversion::mesh::{Geometry, Vertex};

    fn triangle_mesh() -> PropMesh {
        PropMesh {
            name: String::from("triangle"),
            geometries: vec![Geometry {
                material_index: 0,
                vertices: vec![
                    Vertex::new(Vec3::new(0.0, 0.0, 0.0)),
                    Vertex::new(Vec3::new(1.0, 0.0, 0.0)),
                    Vertex::new(Vec3::new(0.0, 1.0, 0.0)),
                ],
                indices: vec![0, 1, 2],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn bounds_and_flat_normals() {
        let mut mesh = triangle_mesh();
        normalize(&mut mesh);

        assert_eq!(Vec3::new(0.0, 0.0, 0.0), mesh.bounding_box.min);
        assert_eq!(Vec3::new(1.0, 1.0, 0.0), mesh.bounding_box.max);
        assert_eq!(Vec3::new(0.5, 0.5, 0.0), mesh.bounding_sphere.center);
        assert!((mesh.bounding_sphere.radius - 0.707).abs() < 1e-3);

        for vertex in &mesh.geometries[0].vertices {
            assert_eq!(Vec3::new(0.0, 0.0, 1.0), vertex.normal);
            assert_eq!(Some(Vec2::ZERO), vertex.tex_coord);
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut mesh = triangle_mesh();
        normalize(&mut mesh);
        let once = mesh.clone();
        normalize(&mut mesh);
        assert_eq!(once, mesh);
    }

    #[test]
    fn keeps_existing_non_zero_normals() {
        let mut mesh = triangle_mesh();
        for vertex in &mut mesh.geometries[0].vertices {
            vertex.normal = Vec3::new(0.0, 1.0, 0.0);
        }
        normalize(&mut mesh);
        for vertex in &mesh.geometries[0].vertices {
            assert_eq!(Vec3::new(0.0, 1.0, 0.0), vertex.normal);
        }
    }

    #[test]
    fn empty_mesh_yields_zero_box() {
        let mut mesh = PropMesh::default();
        normalize(&mut mesh);
        assert_eq!(BoundingBox::default(), mesh.bounding_box);
        assert_eq!(0.0, mesh.bounding_sphere.radius);
    }

    #[test]
    fn degenerate_triangle_falls_back_to_up() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(Vec3::Y, face_normal(p, p, p));
    }

    #[test]
    fn shared_vertices_take_last_triangle_normal() {
        // Two triangles sharing an edge, facing opposite ways; the shared
        // vertices end up with the second triangle's normal.
        let mut mesh = PropMesh {
            geometries: vec![Geometry {
                material_index: 0,
                vertices: vec![
                    Vertex::new(Vec3::new(0.0, 0.0, 0.0)),
                    Vertex::new(Vec3::new(1.0, 0.0, 0.0)),
                    Vertex::new(Vec3::new(0.0, 1.0, 0.0)),
                    Vertex::new(Vec3::new(1.0, 1.0, 0.0)),
                ],
                indices: vec![0, 1, 2, 3, 1, 2],
            }],
            ..Default::default()
        };
        ensure_normals(&mut mesh);
        let vertices = &mesh.geometries[0].vertices;
        assert_eq!(Vec3::new(0.0, 0.0, 1.0), vertices[0].normal);
        assert_eq!(Vec3::new(0.0, 0.0, -1.0), vertices[1].normal);
        assert_eq!(Vec3::new(0.0, 0.0, -1.0), vertices[2].normal);
    }
}
