//! Dataset support
//!
//! Provides:
//! - Samples and features (heatmap rasters or list-valued placeholders)
//! - Manifest parsing, glob expansion of on-disk indexes, sample navigation

mod manifest;
mod model;

pub use manifest::{
    is_valid_dataset_name, load_dataset, DatasetCursor, DatasetManifest, SampleRef,
    DATASET_INDEX_FILE,
};
pub use model::{Feature, FeatureRecord, FeatureTemplate, FeatureValue, Sample, HEATMAP};

/// Dataset errors
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Invalid dataset name: {0}")]
    InvalidName(String),

    #[error("Dataset not found: {0}")]
    NotFound(String),

    #[error("Invalid sample pattern: {0}")]
    InvalidPattern(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),
}

impl From<glob::PatternError> for DatasetError {
    fn from(e: glob::PatternError) -> Self {
        DatasetError::InvalidPattern(e.to_string())
    }
}

impl From<DatasetError> for String {
    fn from(e: DatasetError) -> Self {
        e.to_string()
    }
}
