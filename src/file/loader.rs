//! Asynchronous image loader
//!
//! URLs are resolved against an asset root:
//! - `data:` URLs carry base64 image bytes inline
//! - `file://` URLs and absolute paths are read as-is
//! - anything else is relative to the asset root (a leading `./` is fine)
//!
//! Reads go through `tokio::fs`; decoding runs on the blocking pool.

use super::types::{LoadError, LoadedImage};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::RgbaImage;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ImageLoader {
    root: PathBuf,
}

impl ImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a non-`data:` URL to a file path
    pub fn resolve(&self, url: &str) -> Result<PathBuf, LoadError> {
        if url.is_empty() {
            return Err(LoadError::InvalidUrl(url.to_string()));
        }
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        if url.contains("://") {
            return Err(LoadError::InvalidUrl(url.to_string()));
        }

        let path = Path::new(url);
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(LoadError::InvalidUrl(url.to_string()));
        }
        Ok(self.root.join(path))
    }

    /// Read and decode `url` into an RGBA image
    pub async fn load(&self, url: &str) -> Result<LoadedImage, LoadError> {
        let bytes = if url.starts_with("data:") {
            decode_data_url(url)?
        } else {
            let path = self.resolve(url)?;
            tokio::fs::read(&path).await.map_err(|source| LoadError::Io {
                url: url.to_string(),
                source,
            })?
        };

        let image = tokio::task::spawn_blocking(move || decode_rgba(&bytes)).await??;
        tracing::debug!("Loaded {} ({}x{})", url_for_log(url), image.width(), image.height());

        Ok(LoadedImage {
            url: url.to_string(),
            image: Arc::new(image),
        })
    }
}

fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, LoadError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Payload bytes of a base64 `data:` URL
fn decode_data_url(url: &str) -> Result<Vec<u8>, LoadError> {
    let Some((header, payload)) = url.split_once(',') else {
        return Err(LoadError::InvalidUrl(url_for_log(url).to_string()));
    };
    if !header.ends_with(";base64") {
        return Err(LoadError::InvalidUrl(header.to_string()));
    }
    Ok(BASE64.decode(payload)?)
}

/// Data URLs are long; log only their header
pub(crate) fn url_for_log(url: &str) -> &str {
    if url.starts_with("data:") {
        url.split(',').next().unwrap_or(url)
    } else {
        url
    }
}

/// Encode an image as a PNG data URL
pub fn png_data_url(image: &RgbaImage) -> Result<String, LoadError> {
    let mut buf = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buf, image::ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        BASE64.encode(buf.into_inner())
    ))
}
