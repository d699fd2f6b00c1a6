//! Prism - glTF 2.0 asset inspector
//!
//! Loads a `.gltf` or `.glb` file through the Prism asset loader into a
//! headless engine and prints what was created.

mod settings;
mod summary;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use prism_engine::HeadlessEngine;
use prism_gltfio::{AssetLoader, ResourceLoader};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use settings::PrismSettings;
use summary::AssetSummary;

#[derive(Parser, Debug)]
#[command(name = "prism", version, about = "Load a glTF 2.0 asset and print what it creates")]
struct Cli {
    /// Path to a .gltf or .glb file
    file: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Renderables do not cast shadows
    #[arg(long)]
    no_cast_shadows: bool,

    /// Renderables do not receive shadows
    #[arg(long)]
    no_receive_shadows: bool,

    /// Scene to instantiate instead of the default one
    #[arg(long)]
    scene: Option<usize>,

    /// Do not decode textures
    #[arg(long)]
    skip_images: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Command-line flags win over the settings file.
    fn apply(&self, settings: &mut PrismSettings) {
        if self.no_cast_shadows {
            settings.loader.cast_shadows = false;
        }
        if self.no_receive_shadows {
            settings.loader.receive_shadows = false;
        }
        if self.scene.is_some() {
            settings.loader.scene = self.scene;
        }
        if self.skip_images {
            settings.resources.decode_images = false;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    let mut settings = PrismSettings::load();
    cli.apply(&mut settings);

    let summary = inspect(&cli.file, &settings)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }
    Ok(())
}

/// Load `path` with its resources, summarize it, then tear everything down.
fn inspect(path: &Path, settings: &PrismSettings) -> Result<AssetSummary> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let binary = bytes.starts_with(b"glTF");

    let engine = HeadlessEngine::new();
    let mut loader = AssetLoader::with_config(&engine, settings.loader.clone());
    let mut asset = loader
        .create_asset(&bytes)
        .with_context(|| format!("Failed to create asset from {}", path.display()))?;
    drop(bytes);

    let mut resources = settings.resources.clone();
    if resources.base_path.is_none() {
        resources.base_path = path.parent().map(Path::to_path_buf);
    }
    let loaded = ResourceLoader::new(&engine, resources)
        .load_resources(&mut asset)
        .context("Failed to load asset resources");
    if let Err(e) = loaded {
        loader.destroy_asset(asset);
        loader.destroy_materials();
        return Err(e);
    }
    asset.release_source_data();

    let summary = AssetSummary::new(path.display().to_string(), binary, &asset, &loader, &engine);
    info!("{} entities loaded from {}", summary.entities, summary.file);

    loader.destroy_asset(asset);
    loader.destroy_materials();
    loader.destroy();
    Ok(summary)
}
