//! Optional RON config file for the client.
//!
//! Every field may be left out. A file can start with
//! `#![enable(implicit_some)]` to drop the `Some(...)` wrappers.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use control_engine::ClientSettings;
use control_logging::{control_info, control_warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "scrape-control.ron";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub health_interval_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub download_dir: Option<PathBuf>,
    pub max_download_bytes: Option<u64>,
}

/// Command-line values that win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub download_dir: Option<PathBuf>,
}

/// Reads the config file. A missing file means defaults; a broken one is reported and ignored.
pub fn load(path: &Path) -> ClientConfig {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return ClientConfig::default();
        }
        Err(err) => {
            control_warn!("Failed to read config from {:?}: {}", path, err);
            return ClientConfig::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => {
            control_info!("Loaded config from {:?}", path);
            config
        }
        Err(err) => {
            control_warn!("Failed to parse config from {:?}: {}", path, err);
            ClientConfig::default()
        }
    }
}

impl ClientConfig {
    pub fn into_settings(self, overrides: Overrides) -> ClientSettings {
        let defaults = ClientSettings::default();
        ClientSettings {
            base_url: overrides
                .base_url
                .or(self.base_url)
                .unwrap_or(defaults.base_url),
            health_interval: self
                .health_interval_ms
                .map_or(defaults.health_interval, Duration::from_millis),
            poll_interval: self
                .poll_interval_ms
                .map_or(defaults.poll_interval, Duration::from_millis),
            connect_timeout: self.connect_timeout_ms.map(Duration::from_millis),
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
            download_dir: overrides
                .download_dir
                .or(self.download_dir)
                .unwrap_or(defaults.download_dir),
            max_download_bytes: self
                .max_download_bytes
                .unwrap_or(defaults.max_download_bytes),
        }
    }
}
