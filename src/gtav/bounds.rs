//! Collision bounds (.ybn.xml) generation: an axis-aligned box, a box-corner
//! convex hull approximation, or a BVH triangle soup.

use std::fmt::Write;

use glam::Vec3;

use crate::conversion::mesh::{BoundingBox, BoundingSphere};
use crate::conversion::PropMesh;

use super::vec3_attr;

/// The collision shapes that can stand in for the visual mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionType {
    /// A single axis-aligned box.
    BBox,
    /// A convex hull approximated by the bounding-box corners.
    Convex,
    /// The full triangle soup, sampled down when too dense.
    Mesh,
}

/// BVH collision keeps at most this many triangles; denser meshes are
/// sampled at a fixed step.
const MAX_COLLISION_TRIANGLES: usize = 1000;

pub fn generate_bounds_xml(mesh: &PropMesh, collision_type: CollisionType) -> String {
    match collision_type {
        CollisionType::BBox => bbox_xml(&mesh.bounding_box, &mesh.bounding_sphere),
        CollisionType::Convex => convex_hull_xml(mesh),
        CollisionType::Mesh => triangle_mesh_xml(mesh),
    }
}

fn push(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn push_common_bounds(out: &mut String, bb: &BoundingBox, bs: &BoundingSphere) {
    let _ = writeln!(out, "  <SphereCenter {} />", vec3_attr(bs.center));
    let _ = writeln!(out, "  <SphereRadius value=\"{:.8}\" />", bs.radius);
    let _ = writeln!(out, "  <BoundingBoxMin {} />", vec3_attr(bb.min));
    let _ = writeln!(out, "  <BoundingBoxMax {} />", vec3_attr(bb.max));
    let _ = writeln!(out, "  <BoundingBoxCenter {} />", vec3_attr(bs.center));
    push(out, "  <Margin value=\"0.04000000\" />");
    push(out, "  <MaterialIndex value=\"0\" />");
    push(out, "  <MaterialColourIndex value=\"0\" />");
}

fn bbox_xml(bb: &BoundingBox, bs: &BoundingSphere) -> String {
    let mut xml = String::new();
    let out = &mut xml;
    push(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    push(out, "<Bounds>");
    push(out, "  <Type>Box</Type>");
    let _ = writeln!(out, "  <BoxCenter {} />", vec3_attr(bs.center));
    let _ = writeln!(out, "  <BoxSize {} />", vec3_attr(bb.max - bb.min));
    push_common_bounds(out, bb, bs);
    push(out, "  <ProceduralId value=\"0\" />");
    out.push_str("</Bounds>");
    xml
}

/// Corners of the bounding box, in the polygon winding the box triangle
/// table below refers to.
fn box_corners(bb: &BoundingBox) -> [Vec3; 8] {
    [
        Vec3::new(bb.min.x, bb.min.y, bb.min.z),
        Vec3::new(bb.max.x, bb.min.y, bb.min.z),
        Vec3::new(bb.min.x, bb.max.y, bb.min.z),
        Vec3::new(bb.max.x, bb.max.y, bb.min.z),
        Vec3::new(bb.min.x, bb.min.y, bb.max.z),
        Vec3::new(bb.max.x, bb.min.y, bb.max.z),
        Vec3::new(bb.min.x, bb.max.y, bb.max.z),
        Vec3::new(bb.max.x, bb.max.y, bb.max.z),
    ]
}

const BOX_TRIANGLES: [[usize; 3]; 12] = [
    [0, 1, 3],
    [0, 3, 2], // bottom
    [4, 6, 7],
    [4, 7, 5], // top
    [0, 4, 5],
    [0, 5, 1], // front
    [2, 3, 7],
    [2, 7, 6], // back
    [0, 2, 6],
    [0, 6, 4], // left
    [1, 5, 7],
    [1, 7, 3], // right
];

fn convex_hull_xml(mesh: &PropMesh) -> String {
    let bb = &mesh.bounding_box;
    let bs = &mesh.bounding_sphere;

    let mut xml = String::new();
    let out = &mut xml;
    push(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    push(out, "<Bounds>");
    push(out, "  <Type>Geometry</Type>");
    push_common_bounds(out, bb, bs);
    push(out, "  <Vertices>");
    for corner in box_corners(bb) {
        let _ = writeln!(out, "    <Item {} />", vec3_attr(corner));
    }
    push(out, "  </Vertices>");
    push(out, "  <Polygons>");
    for triangle in &BOX_TRIANGLES {
        let _ = writeln!(
            out,
            "    <Item v1=\"{}\" v2=\"{}\" v3=\"{}\" materialIndex=\"0\" />",
            triangle[0], triangle[1], triangle[2]
        );
    }
    push(out, "  </Polygons>");
    out.push_str("</Bounds>");
    xml
}

fn triangle_mesh_xml(mesh: &PropMesh) -> String {
    let bb = &mesh.bounding_box;
    let bs = &mesh.bounding_sphere;

    // Flatten every geometry into one vertex and triangle list.
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    let mut offset = 0u32;
    for geometry in &mesh.geometries {
        for vertex in &geometry.vertices {
            vertices.push(vertex.position);
        }
        for triangle in geometry.indices.chunks_exact(3) {
            triangles.push([
                triangle[0] + offset,
                triangle[1] + offset,
                triangle[2] + offset,
            ]);
        }
        offset += geometry.vertices.len() as u32;
    }

    let step = if triangles.len() > MAX_COLLISION_TRIANGLES {
        (triangles.len() + MAX_COLLISION_TRIANGLES - 1) / MAX_COLLISION_TRIANGLES
    } else {
        1
    };

    let mut xml = String::new();
    let out = &mut xml;
    push(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    push(out, "<Bounds>");
    push(out, "  <Type>GeometryBVH</Type>");
    push_common_bounds(out, bb, bs);
    push(out, "  <Vertices>");
    for vertex in &vertices {
        let _ = writeln!(out, "    <Item {} />", vec3_attr(*vertex));
    }
    push(out, "  </Vertices>");
    push(out, "  <Polygons>");
    for triangle in triangles.iter().step_by(step) {
        let _ = writeln!(
            out,
            "    <Item v1=\"{}\" v2=\"{}\" v3=\"{}\" materialIndex=\"0\" />",
            triangle[0], triangle[1], triangle[2]
        );
    }
    push(out, "  </Polygons>");
    out.push_str("</Bounds>");
    xml
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::conversion::normalize::normalize;
    use crate::conversion::{Geometry, Vertex};

    use super::*;

    fn unit_mesh() -> PropMesh {
        let mut mesh = PropMesh {
            geometries: vec![Geometry {
                material_index: 0,
                vertices: vec![
                    Vertex::new(Vec3::new(0.0, 0.0, 0.0)),
                    Vertex::new(Vec3::new(1.0, 0.0, 0.0)),
                    Vertex::new(Vec3::new(0.0, 1.0, 1.0)),
                ],
                indices: vec![0, 1, 2],
            }],
            ..Default::default()
        };
        normalize(&mut mesh);
        mesh
    }

    #[test]
    fn bbox_bounds() {
        let xml = generate_bounds_xml(&unit_mesh(), CollisionType::BBox);
        assert!(xml.contains("<Type>Box</Type>"));
        assert!(xml.contains("<BoxSize x=\"1.00000000\" y=\"1.00000000\" z=\"1.00000000\" />"));
        assert!(xml.contains("<Margin value=\"0.04000000\" />"));
    }

    #[test]
    fn convex_hull_uses_box_corners() {
        let xml = generate_bounds_xml(&unit_mesh(), CollisionType::Convex);
        assert!(xml.contains("<Type>Geometry</Type>"));
        assert_eq!(8, xml.matches("    <Item x=").count());
        assert_eq!(12, xml.matches("materialIndex=\"0\"").count());
    }

    #[test]
    fn bvh_mesh_lists_all_triangles() {
        let xml = generate_bounds_xml(&unit_mesh(), CollisionType::Mesh);
        assert!(xml.contains("<Type>GeometryBVH</Type>"));
        assert!(xml.contains("<Item v1=\"0\" v2=\"1\" v3=\"2\" materialIndex=\"0\" />"));
    }
}
