//! Annotation raster - the pixel buffer behind a heatmap feature

use crate::brush::Brush;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{imageops, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Errors raised while encoding a raster for persistence
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Raster is not allocated")]
    Unallocated,
}

impl From<RasterError> for String {
    fn from(e: RasterError) -> Self {
        e.to_string()
    }
}

/// RGBA buffer aligned 1:1 with the source image pixel grid.
///
/// A freshly created raster is 0x0 ("not allocated") until the source image
/// dimensions are known.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationRaster {
    pixels: RgbaImage,
}

impl AnnotationRaster {
    /// Create an unallocated raster
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn is_allocated(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Resize to `width` x `height`, discarding all content
    pub fn allocate(&mut self, width: u32, height: u32) {
        self.pixels = RgbaImage::new(width, height);
    }

    /// Allocate only when the dimensions differ. Returns true if reallocated.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        if self.dimensions() == (width, height) {
            return false;
        }
        tracing::debug!(
            "Raster resized {}x{} -> {}x{}",
            self.width(),
            self.height(),
            width,
            height
        );
        self.allocate(width, height);
        true
    }

    /// Composite `brush` so that its centre lands on `(center_x, center_y)`.
    ///
    /// Alpha-over, clipped to the raster bounds. Does nothing on an
    /// unallocated raster; returns whether anything was drawn.
    pub fn stamp(&mut self, brush: &Brush, center_x: f32, center_y: f32) -> bool {
        if !self.is_allocated() || brush.width() == 0 || brush.height() == 0 {
            return false;
        }
        if !center_x.is_finite() || !center_y.is_finite() {
            return false;
        }

        let left = (center_x - brush.width() as f32 / 2.0).round() as i64;
        let top = (center_y - brush.height() as f32 / 2.0).round() as i64;
        imageops::overlay(&mut self.pixels, brush.image(), left, top);
        true
    }

    /// Reset every pixel to transparent, keeping the dimensions
    pub fn clear(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            pixel.0 = [0, 0, 0, 0];
        }
    }

    /// Whether the pixel at `(x, y)` carries any alpha
    pub fn is_covered(&self, x: u32, y: u32) -> bool {
        self.pixels
            .get_pixel_checked(x, y)
            .is_some_and(|pixel| pixel[3] > 0)
    }

    /// Coordinates of every non-transparent pixel, row-major
    pub fn coverage(&self) -> Vec<(u32, u32)> {
        self.pixels
            .enumerate_pixels()
            .filter(|(_, _, pixel)| pixel[3] > 0)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    /// Encode the raster as a base64 PNG for the host to persist
    pub fn encode_png_base64(&self) -> Result<String, RasterError> {
        if !self.is_allocated() {
            return Err(RasterError::Unallocated);
        }
        let mut buf = Cursor::new(Vec::new());
        self.pixels.write_to(&mut buf, ImageFormat::Png)?;
        Ok(BASE64.encode(buf.into_inner()))
    }
}
