//! Loader settings with persistence
//!
//! Settings are read from `~/.config/prism/settings.toml`:
//!
//! ```toml
//! [loader]
//! cast_shadows = true
//! receive_shadows = false
//!
//! [resources]
//! decode_images = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use prism_gltfio::{LoaderConfig, ResourceConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// All CLI settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismSettings {
    pub loader: LoaderConfig,
    pub resources: ResourceConfig,
}

impl PrismSettings {
    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("prism").join("settings.toml"))
    }

    /// Load settings from the config directory, or return defaults
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load settings from `path`, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }
}
