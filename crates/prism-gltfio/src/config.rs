use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Defaults applied by an [`AssetLoader`](crate::AssetLoader) to the assets
/// it creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Renderables cast shadows.
    pub cast_shadows: bool,
    /// Renderables receive shadows.
    pub receive_shadows: bool,
    /// Scene to instantiate. `None` picks the document's default scene,
    /// then the first scene.
    pub scene: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cast_shadows: true,
            receive_shadows: true,
            scene: None,
        }
    }
}

/// Where a [`ResourceLoader`](crate::ResourceLoader) finds external data
/// and what it decodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Directory external URIs are resolved against. Usually the directory
    /// of the `.gltf` file.
    pub base_path: Option<PathBuf>,
    /// Decode images and bind them to material samplers.
    pub decode_images: bool,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            decode_images: true,
        }
    }
}

impl ResourceConfig {
    pub fn with_base_path(path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: Some(path.into()),
            ..Self::default()
        }
    }
}
