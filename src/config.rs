//! Component and service configuration

use crate::brush::BrushPreset;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// How the source image should be fitted into the canvas.
///
/// Accepted for compatibility with hosts that send it; rendering always
/// draws the source at native size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropMode {
    #[default]
    None,
    Center,
}

/// Configuration for [`crate::marker::ImageMarker`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerConfig {
    /// Directory relative image URLs are resolved against
    pub asset_root: PathBuf,
    /// Stamp image loaded at startup
    pub brush_url: String,
    pub crop_mode: CropMode,
    /// Canvas pixel size before any source image has loaded
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            brush_url: BrushPreset::default().url().to_string(),
            crop_mode: CropMode::None,
            // HTML canvas defaults
            canvas_width: 300,
            canvas_height: 150,
        }
    }
}

/// Configuration for the dataset service
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Directory holding `storage/` and `assets/`
    pub project_root: PathBuf,
}

impl ServerConfig {
    pub const ADDR_ENV: &'static str = "HEATMARK_ADDR";
    pub const ROOT_ENV: &'static str = "HEATMARK_PROJECT_ROOT";

    /// Defaults overridden by `HEATMARK_ADDR` and `HEATMARK_PROJECT_ROOT`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup(Self::ADDR_ENV) {
            match addr.parse() {
                Ok(addr) => config.addr = addr,
                Err(e) => tracing::warn!("Ignoring {}={:?}: {}", Self::ADDR_ENV, addr, e),
            }
        }
        if let Some(root) = lookup(Self::ROOT_ENV) {
            config.project_root = PathBuf::from(root);
        }

        config
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.project_root.join("storage")
    }

    pub fn datasets_dir(&self) -> PathBuf {
        self.storage_dir().join("datasets")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.project_root.join("assets")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            project_root: PathBuf::from("."),
        }
    }
}
