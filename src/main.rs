use std::path::Path;

use anyhow::Result;
use dialoguer::{Input, Select};

use propforge::gtav::CollisionType;
use propforge::pipeline::{
    run_pipeline, service::RequestIds, service::UnavailableConverter,
    texture::TextureQuality, texture::UnavailableTranscoder, CancelFlag, ConversionConfig,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let mut args = std::env::args().skip(1);
    let input = match args.next() {
        Some(path) => path,
        None => Input::<String>::new()
            .with_prompt("Model file (.obj, .gltf, .glb)")
            .interact_text()?,
    };

    let default_name = Path::new(&input)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("prop"));
    let prop_name: String = match args.next() {
        Some(name) => name,
        None => Input::new()
            .with_prompt("Prop name")
            .default(format!("prop_{}", default_name))
            .interact_text()?,
    };
    let output: String = match args.next() {
        Some(folder) => folder,
        None => Input::new()
            .with_prompt("Output folder")
            .default(String::from("."))
            .interact_text()?,
    };

    let collision = Select::new()
        .with_prompt("Collision type")
        .items(&["Bounding box", "Convex hull", "Triangle mesh"])
        .default(0)
        .interact()?;
    let quality = Select::new()
        .with_prompt("Texture quality")
        .items(&["High", "Medium", "Low"])
        .default(1)
        .interact()?;

    let mut config = ConversionConfig::new(input, prop_name, output);
    config.collision_type = match collision {
        0 => CollisionType::BBox,
        1 => CollisionType::Convex,
        _ => CollisionType::Mesh,
    };
    config.texture_quality = match quality {
        0 => TextureQuality::High,
        2 => TextureQuality::Low,
        _ => TextureQuality::Medium,
    };

    let result = run_pipeline(
        &config,
        &mut UnavailableConverter,
        &mut UnavailableTranscoder,
        &mut RequestIds::random(),
        &mut |progress| {
            println!(
                "[{}/{}] {}: {}",
                progress.step + 1,
                progress.total_steps,
                progress.step_name,
                progress.message
            );
        },
        &CancelFlag::new(),
    )?;

    println!();
    println!("Resource written to {}", result.resource_path.display());
    for file in &result.files {
        println!("  {} ({} bytes)", file.name, file.size);
    }
    Ok(())
}
