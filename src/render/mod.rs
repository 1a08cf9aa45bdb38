//! Compositor - redraws the visible canvas from the source image and the
//! active heatmap overlay

use crate::raster::AnnotationRaster;
use image::{imageops, Rgba, RgbaImage};

/// Visible canvas. Rendering is a no-op until a surface is attached.
#[derive(Debug, Default)]
pub struct Compositor {
    canvas: Option<RgbaImage>,
    frames: u64,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a drawing surface of the given pixel size
    pub fn attach(&mut self, width: u32, height: u32) {
        self.canvas = Some(RgbaImage::new(width, height));
    }

    pub fn detach(&mut self) {
        self.canvas = None;
    }

    pub fn is_attached(&self) -> bool {
        self.canvas.is_some()
    }

    /// Change the canvas pixel size. Like an HTML canvas, resizing wipes it.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(canvas) = self.canvas.as_mut() {
            if canvas.dimensions() != (width, height) {
                *canvas = RgbaImage::new(width, height);
            }
        }
    }

    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref()
    }

    /// Pixel size of the attached canvas
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.canvas.as_ref().map(RgbaImage::dimensions)
    }

    /// Number of completed redraws
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Draw the source image at the origin at native size, then the overlay
    /// alpha-composited on top. Full redraw; no dirty tracking.
    pub fn render(&mut self, source: Option<&RgbaImage>, overlay: Option<&AnnotationRaster>) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };

        canvas.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]));
        if let Some(source) = source {
            imageops::overlay(canvas, source, 0, 0);
        }
        if let Some(raster) = overlay.filter(|raster| raster.is_allocated()) {
            imageops::overlay(canvas, raster.pixels(), 0, 0);
        }

        self.frames += 1;
    }
}
