//! Brush module - stamp images and stroke interpolation

mod interpolation;

pub use interpolation::{distance, points_between, PointsBetween};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An immutable stamp image shared by every stamping operation.
///
/// Cloning is cheap; selecting another brush replaces the handle and never
/// touches the pixels of the previous one.
#[derive(Debug, Clone)]
pub struct Brush {
    url: String,
    image: Arc<RgbaImage>,
}

impl Brush {
    pub fn new(url: impl Into<String>, image: Arc<RgbaImage>) -> Self {
        Self {
            url: url.into(),
            image,
        }
    }

    /// URL the brush was loaded from
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Interpolation step for strokes: half the brush width
    pub fn stroke_step(&self) -> f32 {
        self.width() as f32 / 2.0
    }
}

/// Stamp images offered by the reference brush picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrushPreset {
    #[default]
    Green10x10,
    Green5x5,
}

impl BrushPreset {
    pub const ALL: [BrushPreset; 2] = [BrushPreset::Green10x10, BrushPreset::Green5x5];

    /// Asset URL of the stamp image
    pub fn url(&self) -> &'static str {
        match self {
            BrushPreset::Green10x10 => "./brushes/green_10x10.png",
            BrushPreset::Green5x5 => "./brushes/green_5x5.png",
        }
    }

    /// Label shown next to the preview
    pub fn label(&self) -> &'static str {
        match self {
            BrushPreset::Green10x10 => "10x10",
            BrushPreset::Green5x5 => "5x5",
        }
    }

    pub fn from_url(url: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.url() == url)
    }
}
