//! Texture dictionary (.ytd.xml) generation.

use std::fmt::Write;

/// One processed texture, as the dictionary and the DDS transcoder describe
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureEntry {
    pub name: String,
    pub dds_file_name: String,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: String,
}

pub fn generate_texture_dict_xml(textures: &[TextureEntry]) -> String {
    let mut xml = String::new();
    let out = &mut xml;
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<TextureDictionary>\n");
    out.push_str("  <Textures>\n");
    for texture in textures {
        out.push_str("    <Item>\n");
        let _ = writeln!(out, "      <Name>{}</Name>", texture.name);
        let _ = writeln!(out, "      <FileName>{}</FileName>", texture.dds_file_name);
        let _ = writeln!(out, "      <Width value=\"{}\" />", texture.width);
        let _ = writeln!(out, "      <Height value=\"{}\" />", texture.height);
        let _ = writeln!(out, "      <MipLevels value=\"{}\" />", texture.mip_levels);
        let _ = writeln!(out, "      <Format>{}</Format>", texture.format);
        out.push_str("      <Usage>DIFFUSE</Usage>\n");
        out.push_str("    </Item>\n");
    }
    out.push_str("  </Textures>\n");
    out.push_str("</TextureDictionary>");
    xml
}

/// Minimal dictionary for props without textures (solid color props).
pub fn generate_placeholder_texture_dict_xml(prop_name: &str) -> String {
    generate_texture_dict_xml(&[TextureEntry {
        name: format!("{}_diff", prop_name),
        dds_file_name: format!("{}_diff.dds", prop_name),
        width: 64,
        height: 64,
        mip_levels: 7,
        format: String::from("D3DFMT_DXT1"),
    }])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lists_texture_entries() {
        let xml = generate_texture_dict_xml(&[TextureEntry {
            name: String::from("prop_diff"),
            dds_file_name: String::from("prop_diff.dds"),
            width: 512,
            height: 512,
            mip_levels: 10,
            format: String::from("D3DFMT_DXT5"),
        }]);
        assert!(xml.contains("<Name>prop_diff</Name>"));
        assert!(xml.contains("<Width value=\"512\" />"));
        assert!(xml.contains("<Format>D3DFMT_DXT5</Format>"));
        assert_eq!(1, xml.matches("<Item>").count());
    }

    #[test]
    fn placeholder_dictionary_for_untextured_props() {
        let xml = generate_placeholder_texture_dict_xml("prop_crate");
        assert!(xml.contains("<Name>prop_crate_diff</Name>"));
        assert!(xml.contains("<MipLevels value=\"7\" />"));
        assert!(xml.contains("<Format>D3DFMT_DXT1</Format>"));
    }
}
