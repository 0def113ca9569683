//! Texture processing stage: hands source images to the external DDS
//! transcoder and records the resulting dictionary entries. The transcoder
//! itself is opaque; a minimal white placeholder DDS is generated locally
//! for untextured materials.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use byteorder::{WriteBytesExt, LE};
use tracing::warn;

use crate::conversion::PropMaterial;
use crate::gtav::TextureEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureQuality {
    High,
    Medium,
    Low,
}

pub struct QualityPreset {
    /// Compressed format passed to the transcoder.
    pub format: &'static str,
    /// Matching dictionary format name.
    pub format_name: &'static str,
    pub max_size: u32,
    pub mip_levels: u32,
}

pub fn preset(quality: TextureQuality) -> &'static QualityPreset {
    match quality {
        TextureQuality::High => &QualityPreset {
            format: "BC7_UNORM",
            format_name: "D3DFMT_A8B8G8R8",
            max_size: 1024,
            mip_levels: 11,
        },
        TextureQuality::Medium => &QualityPreset {
            format: "BC3_UNORM",
            format_name: "D3DFMT_DXT5",
            max_size: 512,
            mip_levels: 10,
        },
        TextureQuality::Low => &QualityPreset {
            format: "BC1_UNORM",
            format_name: "D3DFMT_DXT1",
            max_size: 256,
            mip_levels: 9,
        },
    }
}

pub struct TranscodeRequest<'a> {
    pub input: &'a Path,
    pub output_dir: &'a Path,
    pub format: &'static str,
    pub max_width: u32,
    pub max_height: u32,
    pub mip_levels: u32,
    pub output_name: &'a str,
}

/// External DDS transcoder boundary (texconv). Returns the path of the
/// produced DDS file.
pub trait TextureTranscoder {
    fn transcode(&mut self, request: &TranscodeRequest<'_>) -> Result<PathBuf>;
}

/// Stand-in when no transcoder tool is installed; every transcode fails and
/// the stage falls back to placeholders.
pub struct UnavailableTranscoder;

impl TextureTranscoder for UnavailableTranscoder {
    fn transcode(&mut self, _request: &TranscodeRequest<'_>) -> Result<PathBuf> {
        anyhow::bail!("no DDS transcoder available")
    }
}

/// Converts the material textures into dictionary entries, deduplicating
/// shared source images. At least one diffuse entry always comes out so the
/// dictionary is never empty.
pub fn process_textures(
    materials: &[PropMaterial],
    prop_name: &str,
    quality: TextureQuality,
    transcoder: &mut dyn TextureTranscoder,
    temp_dir: &Path,
) -> Result<Vec<TextureEntry>> {
    let preset = preset(quality);
    let mut textures: Vec<TextureEntry> = Vec::new();
    let mut processed: HashSet<PathBuf> = HashSet::new();

    let mut transcode = |source: &Path, name: &str, transcoder: &mut dyn TextureTranscoder| {
        transcoder
            .transcode(&TranscodeRequest {
                input: source,
                output_dir: temp_dir,
                format: preset.format,
                max_width: preset.max_size,
                max_height: preset.max_size,
                mip_levels: preset.mip_levels,
                output_name: name,
            })
            .map(|dds_path| TextureEntry {
                name: name.to_owned(),
                dds_file_name: dds_path
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("{}.dds", name)),
                width: preset.max_size,
                height: preset.max_size,
                mip_levels: preset.mip_levels,
                format: preset.format_name.to_owned(),
            })
    };

    for material in materials {
        let diffuse_name = format!("{}_diff", prop_name);
        match &material.diffuse_texture {
            Some(path) if path.exists() && !processed.contains(path) => {
                processed.insert(path.clone());
                match transcode(path, &diffuse_name, transcoder) {
                    Ok(entry) => textures.push(entry),
                    Err(err) => {
                        warn!(path = %path.display(), "failed to convert texture: {:#}", err);
                        textures.push(placeholder_entry(&diffuse_name));
                    }
                }
            }
            Some(path) if path.exists() => {}
            _ => {
                // No usable texture: a white placeholder stands in.
                if !textures.iter().any(|t| t.name == diffuse_name) {
                    write_placeholder_dds(&diffuse_name, temp_dir)?;
                    textures.push(placeholder_entry(&diffuse_name));
                }
            }
        }

        if let Some(path) = &material.normal_texture {
            if path.exists() && !processed.contains(path) {
                processed.insert(path.clone());
                let name = format!("{}_n", prop_name);
                match transcode(path, &name, transcoder) {
                    Ok(entry) => textures.push(entry),
                    Err(err) => warn!("failed to convert normal map: {:#}", err),
                }
            }
        }

        if let Some(path) = &material.specular_texture {
            if path.exists() && !processed.contains(path) {
                processed.insert(path.clone());
                let name = format!("{}_s", prop_name);
                match transcode(path, &name, transcoder) {
                    Ok(entry) => textures.push(entry),
                    Err(err) => warn!("failed to convert specular map: {:#}", err),
                }
            }
        }
    }

    if textures.is_empty() {
        let name = format!("{}_diff", prop_name);
        write_placeholder_dds(&name, temp_dir)?;
        textures.push(placeholder_entry(&name));
    }
    Ok(textures)
}

fn placeholder_entry(name: &str) -> TextureEntry {
    TextureEntry {
        name: name.to_owned(),
        dds_file_name: format!("{}.dds", name),
        width: 64,
        height: 64,
        mip_levels: 7,
        format: String::from("D3DFMT_DXT1"),
    }
}

/// Writes a minimal 64x64 white DXT1 DDS file as a placeholder texture.
pub fn write_placeholder_dds(name: &str, output_dir: &Path) -> Result<PathBuf> {
    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 64;
    const HEADER_SIZE: usize = 128;
    // DXT1 packs 16 pixels into 8 bytes.
    let data_size = (WIDTH * HEIGHT / 2) as usize;

    let mut bytes = vec![0u8; HEADER_SIZE];
    bytes[0..4].copy_from_slice(b"DDS ");
    write_u32(&mut bytes, 4, 124);
    // CAPS | HEIGHT | WIDTH | PIXELFORMAT | MIPMAPCOUNT | LINEARSIZE.
    write_u32(&mut bytes, 8, 0x000A_1007);
    write_u32(&mut bytes, 12, HEIGHT);
    write_u32(&mut bytes, 16, WIDTH);
    write_u32(&mut bytes, 20, data_size as u32);
    write_u32(&mut bytes, 28, 1);
    write_u32(&mut bytes, 76, 32);
    // FOURCC pixel format.
    write_u32(&mut bytes, 80, 0x04);
    bytes[84..88].copy_from_slice(b"DXT1");
    write_u32(&mut bytes, 108, 0x1000);

    // White DXT1 blocks: both palette colors white, all pixels color0.
    for _ in 0..data_size / 8 {
        bytes.write_u16::<LE>(0xFFFF)?;
        bytes.write_u16::<LE>(0xFFFF)?;
        bytes.write_u32::<LE>(0)?;
    }

    let path = output_dir.join(format!("{}.dds", name));
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write the placeholder texture {:?}", path))?;
    Ok(path)
}

fn write_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn placeholder_dds_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_placeholder_dds("prop_diff", dir.path()).unwrap();
        let bytes = std::fs::read(&path).unwrap();

        assert_eq!(128 + 64 * 64 / 2, bytes.len());
        assert_eq!(b"DDS ".to_vec(), bytes[0..4].to_vec());
        assert_eq!(124, u32::from_le_bytes(bytes[4..8].try_into().unwrap()));
        assert_eq!(64, u32::from_le_bytes(bytes[12..16].try_into().unwrap()));
        assert_eq!(b"DXT1".to_vec(), bytes[84..88].to_vec());
        // First compressed block is all white.
        assert_eq!([0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0], bytes[128..136]);
    }

    #[test]
    fn untextured_materials_get_one_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let materials = vec![PropMaterial::default(), PropMaterial::default()];
        let textures = process_textures(
            &materials,
            "prop",
            TextureQuality::Medium,
            &mut UnavailableTranscoder,
            dir.path(),
        )
        .unwrap();

        assert_eq!(1, textures.len());
        assert_eq!("prop_diff", textures[0].name);
        assert_eq!("D3DFMT_DXT1", textures[0].format);
        assert!(dir.path().join("prop_diff.dds").exists());
    }

    #[test]
    fn failed_transcode_falls_back_to_placeholder_entry() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("crate_diff.png");
        std::fs::write(&source, b"png").unwrap();

        let materials = vec![PropMaterial {
            diffuse_texture: Some(source),
            ..Default::default()
        }];
        let textures = process_textures(
            &materials,
            "prop",
            TextureQuality::Low,
            &mut UnavailableTranscoder,
            dir.path(),
        )
        .unwrap();

        assert_eq!(1, textures.len());
        assert_eq!("prop_diff.dds", textures[0].dds_file_name);
        assert_eq!(64, textures[0].width);
    }
}
