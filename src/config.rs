use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Client configuration persisted under the user config directory.
///
/// Credentials never live here; they go through the system keyring
/// (`crate::store::keyring`), keyed by `store_url`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the hosted record store.
    pub store_url: String,
    pub debug_logging: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            debug_logging: false,
        }
    }
}

impl DashboardConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("strive")
            .join("config.json")
    }

    /// Load from the default location, falling back to defaults on any
    /// problem (missing file, unreadable JSON).
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) {
        self.save_to(&Self::config_path());
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create config directory: {}", e);
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    log::error!("Failed to save config: {}", e);
                }
            }
            Err(e) => log::error!("Failed to serialize config: {}", e),
        }
    }
}
