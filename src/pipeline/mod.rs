//! Conversion pipeline: parse, texture, generate, convert, package.
//!
//! Cancellation is cooperative and coarse-grained: the flag is checked
//! between stages only, so a running stage always completes or fails before
//! the pipeline stops. The working directory is scoped and removed on every
//! exit path.

pub mod packager;
pub mod progress;
pub mod service;
pub mod texture;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::conversion::{importer_for, normalize::normalize, Asset, PropMesh};
use crate::gtav::{
    bounds::generate_bounds_xml, drawable::generate_drawable_xml,
    texture_dict::generate_placeholder_texture_dict_xml,
    texture_dict::generate_texture_dict_xml, CollisionType,
};
use packager::{package_resource, PackagedFile, PackagerInput};
use progress::{emit, Progress};
use service::{BinaryConverter, RequestIds, RequestKind, ServiceRequest};
use texture::{process_textures, TextureQuality, TextureTranscoder};

/// Everything one conversion needs to know.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub input_file: PathBuf,
    /// Name of the resulting prop and resource.
    pub prop_name: String,
    pub output_folder: PathBuf,
    pub collision_type: CollisionType,
    pub texture_quality: TextureQuality,
    /// Shader override for every material; empty keeps the per-material
    /// selection.
    pub shader_name: String,
    pub lod_dist_high: f32,
    pub lod_dist_med: f32,
    pub lod_dist_low: f32,
    pub lod_dist_vlow: f32,
}

impl ConversionConfig {
    pub fn new(
        input_file: impl Into<PathBuf>,
        prop_name: impl Into<String>,
        output_folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_file: input_file.into(),
            prop_name: prop_name.into(),
            output_folder: output_folder.into(),
            collision_type: CollisionType::BBox,
            texture_quality: TextureQuality::Medium,
            shader_name: String::new(),
            lod_dist_high: 100.0,
            lod_dist_med: 80.0,
            lod_dist_low: 60.0,
            lod_dist_vlow: 40.0,
        }
    }
}

/// Cooperative cancellation flag shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub resource_path: PathBuf,
    pub files: Vec<PackagedFile>,
}

/// Runs one conversion end to end. On native-converter failure the pipeline
/// degrades gracefully: the intermediate XML artifacts are valid on their
/// own and get packaged for manual completion.
pub fn run_pipeline(
    config: &ConversionConfig,
    converter: &mut dyn BinaryConverter,
    transcoder: &mut dyn TextureTranscoder,
    ids: &mut RequestIds,
    on_progress: &mut dyn FnMut(Progress),
    cancel: &CancelFlag,
) -> Result<ConversionResult> {
    // Scoped working directory, deleted on success and failure alike.
    let temp = tempfile::tempdir().context("Failed to create the working directory")?;
    let temp_dir = temp.path();
    let prop_name = &config.prop_name;

    // Parse the model.
    emit(
        on_progress,
        0,
        format!("Loading {}...", file_name(&config.input_file)),
    );
    check_cancel(cancel)?;

    let importer = importer_for(&config.input_file)
        .with_context(|| format!("Unsupported model format {:?}", config.input_file))?;
    let bytes = std::fs::read(&config.input_file)
        .with_context(|| format!("Failed to read {:?}", config.input_file))?;
    let mut mesh = PropMesh::default();
    importer.import(&Asset::new(bytes, config.input_file.clone()), &mut mesh)?;
    normalize(&mut mesh);
    emit(
        on_progress,
        0,
        format!(
            "Parsed: {} vertices, {} faces",
            mesh.vertex_count(),
            mesh.face_count()
        ),
    );

    // Textures.
    emit(on_progress, 1, "Converting textures to DDS...");
    check_cancel(cancel)?;
    let textures = process_textures(
        &mesh.materials,
        prop_name,
        config.texture_quality,
        transcoder,
        temp_dir,
    )?;
    emit(
        on_progress,
        1,
        format!("Processed {} texture(s)", textures.len()),
    );

    // Drawable, texture dictionary, and archetype XML.
    emit(on_progress, 2, "Generating drawable definition...");
    check_cancel(cancel)?;

    let ydr_xml = temp_dir.join(format!("{}.ydr.xml", prop_name));
    std::fs::write(&ydr_xml, generate_drawable_xml(&mesh, config))?;

    let ytd = if textures.is_empty() {
        generate_placeholder_texture_dict_xml(prop_name)
    } else {
        generate_texture_dict_xml(&textures)
    };
    let ytd_xml = temp_dir.join(format!("{}.ytd.xml", prop_name));
    std::fs::write(&ytd_xml, ytd)?;

    let ytyp_xml = temp_dir.join(format!("{}.ytyp.xml", prop_name));
    std::fs::write(&ytyp_xml, crate::gtav::archetype::generate_ytyp_xml(&mesh, config))?;

    // Collision.
    emit(
        on_progress,
        3,
        format!("Generating {:?} collision...", config.collision_type),
    );
    check_cancel(cancel)?;
    let ybn_xml = temp_dir.join(format!("{}.ybn.xml", prop_name));
    std::fs::write(&ybn_xml, generate_bounds_xml(&mesh, config.collision_type))?;

    // Native binary conversion, when the service is up.
    emit(on_progress, 4, "Converting XML to GTA V binary format...");
    check_cancel(cancel)?;
    let binaries = if converter.is_available() {
        match convert_binaries(
            converter,
            ids,
            temp_dir,
            prop_name,
            [&ydr_xml, &ytd_xml, &ybn_xml, &ytyp_xml],
        ) {
            Ok(binaries) => {
                emit(on_progress, 4, "Binary conversion complete");
                Some(binaries)
            }
            Err(err) => {
                warn!("native conversion failed: {:#}", err);
                emit(
                    on_progress,
                    4,
                    "Binary conversion failed, using XML output. Convert manually later.",
                );
                None
            }
        }
    } else {
        emit(
            on_progress,
            4,
            "Native converter not available - XML files will be exported for manual conversion",
        );
        None
    };

    // Package the FiveM resource.
    emit(on_progress, 5, "Packaging FiveM resource...");
    check_cancel(cancel)?;
    let [ydr, ytd, ybn, ytyp] = binaries.unwrap_or_default();
    let result = package_resource(&PackagerInput {
        prop_name,
        output_folder: &config.output_folder,
        temp_dir,
        ydr,
        ytd,
        ybn,
        ytyp,
        ydr_xml,
        ytd_xml,
        ybn_xml,
        ytyp_xml,
    })?;
    emit(on_progress, 5, "Resource packaged successfully!");
    info!(resource = %result.resource_path.display(), "conversion finished");

    Ok(ConversionResult {
        resource_path: result.resource_path,
        files: result.files,
    })
}

/// Sends the four conversion requests to the native service. Any failed
/// response fails the whole step; the caller falls back to XML output.
fn convert_binaries(
    converter: &mut dyn BinaryConverter,
    ids: &mut RequestIds,
    temp_dir: &Path,
    prop_name: &str,
    xml: [&PathBuf; 4],
) -> Result<[Option<PathBuf>; 4]> {
    let kinds = [
        (RequestKind::ConvertYdr, "ydr", true),
        (RequestKind::ConvertYtd, "ytd", true),
        (RequestKind::ConvertYbn, "ybn", false),
        (RequestKind::ConvertYtyp, "ytyp", false),
    ];
    let mut outputs: [Option<PathBuf>; 4] = Default::default();
    for (i, (kind, extension, with_folder)) in kinds.into_iter().enumerate() {
        let output = temp_dir.join(format!("{}.{}", prop_name, extension));
        let request = ServiceRequest::convert(
            ids,
            kind,
            &xml[i].to_string_lossy(),
            with_folder.then(|| temp_dir.to_string_lossy()).as_deref(),
            &output.to_string_lossy(),
        );
        let response = converter.convert(&request)?;
        if !response.success {
            bail!(
                "the conversion service rejected {:?}: {}",
                kind,
                response.error.unwrap_or_else(|| String::from("unknown error"))
            );
        }
        outputs[i] = Some(response.output_path.map(PathBuf::from).unwrap_or(output));
    }
    Ok(outputs)
}

fn check_cancel(cancel: &CancelFlag) -> Result<()> {
    if cancel.is_cancelled() {
        bail!("Conversion cancelled");
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::service::UnavailableConverter;
    use super::texture::UnavailableTranscoder;

    use super::*;

    const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn run(config: &ConversionConfig, cancel: &CancelFlag) -> Result<ConversionResult> {
        run_pipeline(
            config,
            &mut UnavailableConverter,
            &mut UnavailableTranscoder,
            &mut RequestIds::sequential(),
            &mut |_| {},
            cancel,
        )
    }

    #[test]
    fn converts_an_obj_into_a_packaged_resource() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bench.obj");
        std::fs::write(&input, TRIANGLE_OBJ).unwrap();

        let config = ConversionConfig::new(&input, "prop_bench", dir.path().join("out"));
        let result = run(&config, &CancelFlag::new()).unwrap();

        let stream = result.resource_path.join("stream");
        assert!(result.resource_path.join("fxmanifest.lua").exists());
        for name in [
            "prop_bench.ydr.xml",
            "prop_bench.ytd.xml",
            "prop_bench.ybn.xml",
            "prop_bench.ytyp.xml",
            "prop_bench_diff.dds",
        ] {
            assert!(stream.join(name).exists(), "missing {}", name);
        }

        let drawable = std::fs::read_to_string(stream.join("prop_bench.ydr.xml")).unwrap();
        assert!(drawable.contains("<Name>prop_bench</Name>"));
    }

    #[test]
    fn cancellation_stops_between_stages() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bench.obj");
        std::fs::write(&input, TRIANGLE_OBJ).unwrap();

        let cancel = CancelFlag::new();
        cancel.cancel();
        let config = ConversionConfig::new(&input, "prop_bench", dir.path().join("out"));
        let err = run(&config, &cancel).unwrap_err();
        assert_eq!("Conversion cancelled", err.to_string());
        assert!(!dir.path().join("out").join("prop_bench").exists());
    }

    #[test]
    fn reports_progress_through_all_stages() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bench.obj");
        std::fs::write(&input, TRIANGLE_OBJ).unwrap();

        let mut steps = Vec::new();
        let config = ConversionConfig::new(&input, "prop_bench", dir.path().join("out"));
        run_pipeline(
            &config,
            &mut UnavailableConverter,
            &mut UnavailableTranscoder,
            &mut RequestIds::sequential(),
            &mut |progress| steps.push(progress.step),
            &CancelFlag::new(),
        )
        .unwrap();

        assert_eq!(0, steps[0]);
        assert!(steps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(Some(&5), steps.last());
    }
}
