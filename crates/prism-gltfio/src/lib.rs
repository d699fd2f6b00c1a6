//! Prism glTF I/O - glTF 2.0 asset loading
//!
//! [`AssetLoader`] turns the contents of a `.gltf` or `.glb` file into an
//! [`Asset`]: entities with transforms, renderables, lights, vertex and
//! index buffers, and material instances created through an [`Engine`].
//! Buffer and texture data are uploaded in a second step by the
//! [`ResourceLoader`].
//!
//! ```no_run
//! use prism_engine::HeadlessEngine;
//! use prism_gltfio::{AssetLoader, ResourceConfig, ResourceLoader};
//!
//! # fn main() -> Result<(), prism_gltfio::AssetError> {
//! let engine = HeadlessEngine::new();
//! let mut loader = AssetLoader::create(&engine);
//!
//! let content = std::fs::read("scene.gltf").unwrap_or_default();
//! let mut asset = loader.create_asset_from_json(&content)?;
//! drop(content);
//!
//! ResourceLoader::new(&engine, ResourceConfig::with_base_path("."))
//!     .load_resources(&mut asset)?;
//! asset.release_source_data();
//!
//! loader.destroy_asset(asset);
//! loader.destroy_materials();
//! loader.destroy();
//! # Ok(())
//! # }
//! ```
//!
//! [`Engine`]: prism_engine::Engine

mod asset;
mod config;
mod error;
mod loader;
mod material;
mod resource;
#[cfg(test)]
mod testing;

pub use asset::{Asset, Skin};
pub use config::{LoaderConfig, ResourceConfig};
pub use error::AssetError;
pub use loader::AssetLoader;
pub use material::{MaterialCache, MaterialKey};
pub use resource::ResourceLoader;
