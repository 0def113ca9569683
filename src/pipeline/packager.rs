//! FiveM resource packaging: a manifest plus streamed asset files. When the
//! native converter produced no binaries, the XML sources and DDS textures
//! are shipped instead so the resource can be finished manually.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub struct PackagerInput<'a> {
    pub prop_name: &'a str,
    pub output_folder: &'a Path,
    pub temp_dir: &'a Path,
    pub ydr: Option<PathBuf>,
    pub ytd: Option<PathBuf>,
    pub ybn: Option<PathBuf>,
    pub ytyp: Option<PathBuf>,
    pub ydr_xml: PathBuf,
    pub ytd_xml: PathBuf,
    pub ybn_xml: PathBuf,
    pub ytyp_xml: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedFile {
    /// Path relative to the resource root.
    pub name: String,
    pub size: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PackagerResult {
    pub resource_path: PathBuf,
    pub files: Vec<PackagedFile>,
}

pub fn package_resource(input: &PackagerInput<'_>) -> Result<PackagerResult> {
    let resource_dir = input.output_folder.join(input.prop_name);
    let stream_dir = resource_dir.join("stream");
    std::fs::create_dir_all(&stream_dir)
        .with_context(|| format!("Failed to create the resource folder {:?}", stream_dir))?;

    let mut files = Vec::new();

    let manifest = generate_fx_manifest(input.prop_name);
    let manifest_path = resource_dir.join("fxmanifest.lua");
    std::fs::write(&manifest_path, &manifest).context("Failed to write fxmanifest.lua")?;
    files.push(PackagedFile {
        name: String::from("fxmanifest.lua"),
        size: manifest.len() as u64,
        path: manifest_path,
    });

    let binaries = [
        (&input.ydr, format!("{}.ydr", input.prop_name)),
        (&input.ytd, format!("{}.ytd", input.prop_name)),
        (&input.ybn, format!("{}.ybn", input.prop_name)),
        (&input.ytyp, format!("{}.ytyp", input.prop_name)),
    ];
    let mut has_binaries = false;
    for (source, name) in &binaries {
        if let Some(source) = source {
            if source.exists() {
                files.push(copy_into_stream(source, &stream_dir, name)?);
                has_binaries = true;
            }
        }
    }

    if !has_binaries {
        // XML fallback, convertible manually with the external tool later.
        let fallbacks = [
            (&input.ydr_xml, format!("{}.ydr.xml", input.prop_name)),
            (&input.ytd_xml, format!("{}.ytd.xml", input.prop_name)),
            (&input.ybn_xml, format!("{}.ybn.xml", input.prop_name)),
            (&input.ytyp_xml, format!("{}.ytyp.xml", input.prop_name)),
        ];
        for (source, name) in &fallbacks {
            if source.exists() {
                files.push(copy_into_stream(source, &stream_dir, name)?);
            }
        }

        // Ship the DDS textures too, for the manual conversion.
        for entry in std::fs::read_dir(input.temp_dir)? {
            let path = entry?.path();
            let is_dds = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("dds"))
                .unwrap_or(false);
            if is_dds {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    files.push(copy_into_stream(&path, &stream_dir, name)?);
                }
            }
        }
    }

    Ok(PackagerResult {
        resource_path: resource_dir,
        files,
    })
}

fn copy_into_stream(source: &Path, stream_dir: &Path, name: &str) -> Result<PackagedFile> {
    let dest = stream_dir.join(name);
    std::fs::copy(source, &dest)
        .with_context(|| format!("Failed to copy {:?} into the resource", source))?;
    let size = std::fs::metadata(&dest)?.len();
    Ok(PackagedFile {
        name: format!("stream/{}", name),
        size,
        path: dest,
    })
}

fn generate_fx_manifest(prop_name: &str) -> String {
    format!(
        "fx_version 'cerulean'\n\
         game 'gta5'\n\
         \n\
         files {{\n\
         \x20   'stream/{prop}.ytyp',\n\
         }}\n\
         \n\
         data_file 'DLC_ITYP_REQUEST' 'stream/{prop}.ytyp'\n",
        prop = prop_name
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn packages_xml_fallback_and_textures() {
        let temp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let ydr_xml = temp.path().join("prop.ydr.xml");
        let ytd_xml = temp.path().join("prop.ytd.xml");
        let ybn_xml = temp.path().join("prop.ybn.xml");
        let ytyp_xml = temp.path().join("prop.ytyp.xml");
        for path in [&ydr_xml, &ytd_xml, &ybn_xml, &ytyp_xml] {
            std::fs::write(path, "<xml />").unwrap();
        }
        std::fs::write(temp.path().join("prop_diff.dds"), b"dds").unwrap();

        let result = package_resource(&PackagerInput {
            prop_name: "prop",
            output_folder: out.path(),
            temp_dir: temp.path(),
            ydr: None,
            ytd: None,
            ybn: None,
            ytyp: None,
            ydr_xml,
            ytd_xml,
            ybn_xml,
            ytyp_xml,
        })
        .unwrap();

        assert!(result.resource_path.join("fxmanifest.lua").exists());
        assert!(result.resource_path.join("stream/prop.ydr.xml").exists());
        assert!(result.resource_path.join("stream/prop_diff.dds").exists());
        // Manifest plus four XML files plus one texture.
        assert_eq!(6, result.files.len());

        let manifest =
            std::fs::read_to_string(result.resource_path.join("fxmanifest.lua")).unwrap();
        assert!(manifest.contains("fx_version 'cerulean'"));
        assert!(manifest.contains("data_file 'DLC_ITYP_REQUEST' 'stream/prop.ytyp'"));
    }

    #[test]
    fn prefers_binaries_when_present() {
        let temp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let ydr = temp.path().join("prop.ydr");
        std::fs::write(&ydr, b"bin").unwrap();
        let ydr_xml = temp.path().join("prop.ydr.xml");
        std::fs::write(&ydr_xml, "<xml />").unwrap();

        let result = package_resource(&PackagerInput {
            prop_name: "prop",
            output_folder: out.path(),
            temp_dir: temp.path(),
            ydr: Some(ydr),
            ytd: None,
            ybn: None,
            ytyp: None,
            ydr_xml: ydr_xml.clone(),
            ytd_xml: ydr_xml.clone(),
            ybn_xml: ydr_xml.clone(),
            ytyp_xml: ydr_xml,
        })
        .unwrap();

        assert!(result.resource_path.join("stream/prop.ydr").exists());
        assert!(!result.resource_path.join("stream/prop.ydr.xml").exists());
        assert_eq!(2, result.files.len());
    }
}
