//! Drawable (.ydr.xml) generation: bounding volumes, shader group, and the
//! vertex/index buffers of every geometry.

use std::fmt::Write;

use crate::conversion::PropMesh;
use crate::pipeline::ConversionConfig;

use super::shaders::{shader_def, ParamKind};
use super::{esc, vec3_attr};

pub fn generate_drawable_xml(mesh: &PropMesh, config: &ConversionConfig) -> String {
    let bb = &mesh.bounding_box;
    let bs = &mesh.bounding_sphere;
    let prop_name = &config.prop_name;

    let mut xml = String::new();
    let out = &mut xml;
    push(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    push(out, "<Drawable>");
    let _ = writeln!(out, "  <Name>{}</Name>", esc(prop_name));
    let _ = writeln!(out, "  <BoundingSphereCenter {} />", vec3_attr(bs.center));
    let _ = writeln!(out, "  <BoundingSphereRadius value=\"{:.8}\" />", bs.radius);
    let _ = writeln!(out, "  <BoundingBoxMin {} />", vec3_attr(bb.min));
    let _ = writeln!(out, "  <BoundingBoxMax {} />", vec3_attr(bb.max));
    let _ = writeln!(out, "  <LodDistHigh value=\"{:.8}\" />", config.lod_dist_high);
    let _ = writeln!(out, "  <LodDistMed value=\"{:.8}\" />", config.lod_dist_med);
    let _ = writeln!(out, "  <LodDistLow value=\"{:.8}\" />", config.lod_dist_low);
    let _ = writeln!(out, "  <LodDistVlow value=\"{:.8}\" />", config.lod_dist_vlow);
    push(out, "  <FlagsHigh value=\"0\" />");
    push(out, "  <FlagsMed value=\"0\" />");
    push(out, "  <FlagsLow value=\"0\" />");
    push(out, "  <FlagsVlow value=\"0\" />");

    push(out, "  <ShaderGroup>");
    push(out, "    <TextureDictionary />");
    push(out, "    <Shaders>");
    for material in &mesh.materials {
        let shader_name = if config.shader_name.is_empty() {
            &material.shader_name
        } else {
            &config.shader_name
        };
        let shader = shader_def(shader_name);

        push(out, "      <Item>");
        let _ = writeln!(out, "        <Name>{}</Name>", esc(&material.name));
        let _ = writeln!(out, "        <FileName>{}</FileName>", esc(shader.file_name));
        let _ = writeln!(
            out,
            "        <RenderBucket value=\"{}\" />",
            shader.render_bucket
        );
        push(out, "        <Parameters>");
        for param in shader.params {
            match &param.kind {
                ParamKind::Texture => {
                    let texture_name = match param.name {
                        "BumpSampler" => format!("{}_n", prop_name),
                        "SpecSampler" => format!("{}_s", prop_name),
                        _ => format!("{}_diff", prop_name),
                    };
                    let _ = writeln!(
                        out,
                        "          <Item name=\"{}\" type=\"Texture\">",
                        param.name
                    );
                    let _ = writeln!(out, "            <Name>{}</Name>", esc(&texture_name));
                    push(out, "          </Item>");
                }
                ParamKind::Vector(value) => {
                    let _ = writeln!(
                        out,
                        "          <Item name=\"{}\" type=\"Vector\">",
                        param.name
                    );
                    let _ = writeln!(
                        out,
                        "            <Value x=\"{}\" y=\"{}\" z=\"{}\" w=\"{}\" />",
                        value[0], value[1], value[2], value[3]
                    );
                    push(out, "          </Item>");
                }
            }
        }
        push(out, "        </Parameters>");
        push(out, "      </Item>");
    }
    push(out, "    </Shaders>");
    push(out, "  </ShaderGroup>");

    push(out, "  <DrawableModelsHigh>");
    for geometry in &mesh.geometries {
        if geometry.vertices.is_empty() || geometry.indices.is_empty() {
            continue;
        }

        // Per-geometry bounding box.
        let mut min = glam::Vec3::splat(f32::INFINITY);
        let mut max = glam::Vec3::splat(f32::NEG_INFINITY);
        for vertex in &geometry.vertices {
            min = min.min(vertex.position);
            max = max.max(vertex.position);
        }

        push(out, "    <Item>");
        push(out, "      <RenderMask value=\"255\" />");
        push(out, "      <Geometries>");
        push(out, "        <Item>");
        let _ = writeln!(
            out,
            "          <ShaderIndex value=\"{}\" />",
            geometry.material_index
        );
        let _ = writeln!(out, "          <BoundingBoxMin {} />", vec3_attr(min));
        let _ = writeln!(out, "          <BoundingBoxMax {} />", vec3_attr(max));

        push(out, "          <VertexBuffer>");
        push(out, "            <Flags value=\"0\" />");
        push(out, "            <Layout type=\"GTAV1\">");
        push(out, "              <Position />");
        push(out, "              <Normal />");
        push(out, "              <Colour0 />");
        push(out, "              <TexCoord0 />");
        push(out, "            </Layout>");
        let _ = writeln!(
            out,
            "            <Count value=\"{}\" />",
            geometry.vertices.len()
        );
        push(out, "            <Data>");
        for vertex in &geometry.vertices {
            let color = vertex
                .color
                .unwrap_or(glam::Vec4::new(255.0, 255.0, 255.0, 255.0));
            let uv = vertex.tex_coord.unwrap_or_default();
            let _ = writeln!(
                out,
                "              {:.8} {:.8} {:.8}   {:.8} {:.8} {:.8}   {} {} {} {}   {:.8} {:.8}",
                vertex.position.x,
                vertex.position.y,
                vertex.position.z,
                vertex.normal.x,
                vertex.normal.y,
                vertex.normal.z,
                color.x,
                color.y,
                color.z,
                color.w,
                uv.x,
                uv.y
            );
        }
        push(out, "            </Data>");
        push(out, "          </VertexBuffer>");

        push(out, "          <IndexBuffer>");
        let _ = writeln!(
            out,
            "            <Count value=\"{}\" />",
            geometry.indices.len()
        );
        push(out, "            <Data>");
        for triangle in geometry.indices.chunks_exact(3) {
            let _ = writeln!(
                out,
                "              {} {} {}",
                triangle[0], triangle[1], triangle[2]
            );
        }
        push(out, "            </Data>");
        push(out, "          </IndexBuffer>");
        push(out, "        </Item>");
        push(out, "      </Geometries>");
        push(out, "    </Item>");
    }
    push(out, "  </DrawableModelsHigh>");
    out.push_str("</Drawable>");

    xml
}

fn push(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use pretty_assertions::assert_eq;

    use crate::conversion::normalize::normalize;
    use crate::conversion::{Geometry, PropMaterial, Vertex};
    use crate::pipeline::ConversionConfig;

    use super::*;

    #[test]
    fn emits_bounds_shaders_and_buffers() {
        let mut mesh = PropMesh {
            name: String::from("crate"),
            geometries: vec![Geometry {
                material_index: 0,
                vertices: vec![
                    Vertex::new(Vec3::new(0.0, 0.0, 0.0)),
                    Vertex::new(Vec3::new(1.0, 0.0, 0.0)),
                    Vertex::new(Vec3::new(0.0, 1.0, 0.0)),
                ],
                indices: vec![0, 1, 2],
            }],
            materials: vec![PropMaterial::default()],
            ..Default::default()
        };
        normalize(&mut mesh);
        let config = ConversionConfig::new("model.obj", "prop_crate", "out");
        let xml = generate_drawable_xml(&mesh, &config);

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Drawable>"));
        assert!(xml.contains("<Name>prop_crate</Name>"));
        assert!(xml.contains("<BoundingSphereRadius value=\"0.7071"));
        assert!(xml.contains("<FileName>default.sps</FileName>"));
        assert!(xml.contains("<Name>prop_crate_diff</Name>"));
        assert!(xml.contains("<Count value=\"3\" />"));
        assert!(xml.contains("              0 1 2\n"));
        assert_eq!(1, xml.matches("<ShaderIndex").count());
    }

    #[test]
    fn skips_empty_geometries() {
        let mesh = PropMesh {
            geometries: vec![Geometry::default()],
            materials: vec![PropMaterial::default()],
            ..Default::default()
        };
        let config = ConversionConfig::new("model.obj", "prop", "out");
        let xml = generate_drawable_xml(&mesh, &config);
        assert!(!xml.contains("<ShaderIndex"));
    }
}
