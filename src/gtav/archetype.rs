//! Archetype map types (.ytyp.xml) generation: a single CBaseArchetypeDef
//! binding the drawable, collision, and texture dictionary together.

use std::fmt::Write;

use crate::conversion::PropMesh;
use crate::pipeline::ConversionConfig;

use super::{esc, vec3_attr};

pub fn generate_ytyp_xml(mesh: &PropMesh, config: &ConversionConfig) -> String {
    let bb = &mesh.bounding_box;
    let bs = &mesh.bounding_sphere;
    let prop_name = esc(&config.prop_name);

    let mut xml = String::new();
    let out = &mut xml;
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<CMapTypes>\n");
    out.push_str("  <extensions />\n");
    out.push_str("  <archetypes>\n");
    out.push_str("    <Item type=\"CBaseArchetypeDef\">\n");
    let _ = writeln!(out, "      <lodDist value=\"{:.8}\" />", config.lod_dist_high);
    out.push_str("      <flags value=\"32\" />\n");
    out.push_str("      <specialAttribute value=\"0\" />\n");
    let _ = writeln!(out, "      <bbMin {} />", vec3_attr(bb.min));
    let _ = writeln!(out, "      <bbMax {} />", vec3_attr(bb.max));
    let _ = writeln!(out, "      <bsCentre {} />", vec3_attr(bs.center));
    let _ = writeln!(out, "      <bsRadius value=\"{:.8}\" />", bs.radius);
    out.push_str("      <hdTextureDist value=\"15.00000000\" />\n");
    let _ = writeln!(out, "      <name>{}</name>", prop_name);
    let _ = writeln!(out, "      <textureDictionary>{}</textureDictionary>", prop_name);
    out.push_str("      <clipDictionary />\n");
    out.push_str("      <drawableDictionary />\n");
    let _ = writeln!(out, "      <physicsDictionary>{}</physicsDictionary>", prop_name);
    out.push_str("      <assetType>ASSET_TYPE_DRAWABLE</assetType>\n");
    let _ = writeln!(out, "      <assetName>{}</assetName>", prop_name);
    out.push_str("      <extensions />\n");
    out.push_str("    </Item>\n");
    out.push_str("  </archetypes>\n");
    let _ = writeln!(out, "  <name>{}</name>", prop_name);
    out.push_str("  <dependencies />\n");
    out.push_str("  <compositeEntityTypes />\n");
    out.push_str("</CMapTypes>");
    xml
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::pipeline::ConversionConfig;

    use super::*;

    #[test]
    fn binds_prop_dictionaries_together() {
        let mesh = PropMesh::default();
        let config = ConversionConfig::new("model.obj", "prop_bench", "out");
        let xml = generate_ytyp_xml(&mesh, &config);

        assert!(xml.contains("<Item type=\"CBaseArchetypeDef\">"));
        assert!(xml.contains("<name>prop_bench</name>"));
        assert!(xml.contains("<textureDictionary>prop_bench</textureDictionary>"));
        assert!(xml.contains("<physicsDictionary>prop_bench</physicsDictionary>"));
        assert!(xml.contains("<assetType>ASSET_TYPE_DRAWABLE</assetType>"));
        assert_eq!(2, xml.matches("<extensions />").count());
    }
}
