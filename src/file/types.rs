//! Image loading types

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which resource a load belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadKind {
    Source,
    Brush,
}

/// A decoded image ready to draw
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub url: String,
    pub image: Arc<RgbaImage>,
}

impl LoadedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Image load errors
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error for {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<LoadError> for String {
    fn from(e: LoadError) -> Self {
        e.to_string()
    }
}
