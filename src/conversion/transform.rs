use glam::{Vec3, Vec4};

use super::mesh::PropMesh;

/// Swaps the Y and Z axes to bring Z-up geometry (Blender exports) into the
/// right-handed Y-up system the drawable pipeline expects.
pub fn z_up_to_y_up(mesh: &mut PropMesh) {
    for geometry in &mut mesh.geometries {
        for vertex in &mut geometry.vertices {
            vertex.position = swap_yz(vertex.position);
            vertex.normal = swap_yz(vertex.normal);
            if let Some(tangent) = vertex.tangent {
                vertex.tangent = Some(Vec4::new(tangent.x, tangent.z, -tangent.y, tangent.w));
            }
        }
    }
}

fn swap_yz(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, -v.y)
}

pub fn scale(mesh: &mut PropMesh, factor: f32) {
    for geometry in &mut mesh.geometries {
        for vertex in &mut geometry.vertices {
            vertex.position *= factor;
        }
    }
}

/// Translates the mesh so its vertex centroid sits at the origin.
pub fn center(mesh: &mut PropMesh) {
    let mut sum = Vec3::ZERO;
    let mut count = 0usize;
    for geometry in &mesh.geometries {
        for vertex in &geometry.vertices {
            sum += vertex.position;
            count += 1;
        }
    }
    if count == 0 {
        return;
    }

    let centroid = sum / count as f32;
    for geometry in &mut mesh.geometries {
        for vertex in &mut geometry.vertices {
            vertex.position -= centroid;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::conversion::mesh::{Geometry, Vertex};

    fn mesh_with(positions: &[Vec3]) -> PropMesh {
        PropMesh {
            geometries: vec![Geometry {
                material_index: 0,
                vertices: positions.iter().map(|&p| Vertex::new(p)).collect(),
                indices: Vec::new(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn swaps_z_up_to_y_up() {
        let mut mesh = mesh_with(&[Vec3::new(1.0, 2.0, 3.0)]);
        z_up_to_y_up(&mut mesh);
        assert_eq!(
            Vec3::new(1.0, 3.0, -2.0),
            mesh.geometries[0].vertices[0].position
        );
    }

    #[test]
    fn centers_on_centroid() {
        let mut mesh = mesh_with(&[Vec3::new(2.0, 0.0, 0.0), Vec3::new(4.0, 0.0, 0.0)]);
        center(&mut mesh);
        assert_eq!(Vec3::new(-1.0, 0.0, 0.0), mesh.geometries[0].vertices[0].position);
        assert_eq!(Vec3::new(1.0, 0.0, 0.0), mesh.geometries[0].vertices[1].position);
    }
}
