//! Dataset manifests and sample navigation

use super::model::{FeatureTemplate, Sample};
use super::DatasetError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Component, Path};

/// File name of the per-dataset index
pub const DATASET_INDEX_FILE: &str = "dataset.json";

/// Reference to one sample's source image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRef {
    pub file: String,
}

/// Manifest returned by the dataset service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub samples: Vec<SampleRef>,
    pub features: Vec<FeatureTemplate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatasetManifest {
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Fresh sample at `index` with empty feature values
    pub fn instantiate(&self, index: usize) -> Option<Sample> {
        self.samples
            .get(index)
            .map(|sample| Sample::from_templates(sample.file.clone(), &self.features))
    }
}

/// On-disk index: `samples` is a glob pattern relative to the dataset
/// directory.
#[derive(Debug, Clone, Deserialize)]
struct DatasetIndex {
    samples: String,
    #[serde(default)]
    features: Vec<FeatureTemplate>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Dataset names: lowercase ASCII letters, digits, `_`, `-` and spaces
pub fn is_valid_dataset_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | ' '))
}

/// Build the manifest of `<datasets_root>/<name>`.
///
/// Sample paths are matched against the index's glob pattern, sorted, and
/// reported relative to `project_root` with `/` separators.
pub fn load_dataset(
    datasets_root: &Path,
    project_root: &Path,
    name: &str,
) -> Result<DatasetManifest, DatasetError> {
    if !is_valid_dataset_name(name) {
        return Err(DatasetError::InvalidName(name.to_string()));
    }

    let dataset_dir = datasets_root.join(name);
    let index_path = dataset_dir.join(DATASET_INDEX_FILE);
    if !index_path.is_file() {
        return Err(DatasetError::NotFound(name.to_string()));
    }

    let index: DatasetIndex = serde_json::from_str(&std::fs::read_to_string(&index_path)?)?;
    if Path::new(&index.samples)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return Err(DatasetError::InvalidPattern(index.samples));
    }

    let pattern = dataset_dir.join(&index.samples);
    let mut paths = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        paths.push(entry?);
    }
    paths.sort();

    let samples = paths
        .iter()
        .map(|path| SampleRef {
            file: relative_url(project_root, path),
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        "Dataset '{}' resolved {} samples from {:?}",
        name,
        samples.len(),
        pattern
    );

    Ok(DatasetManifest {
        samples,
        features: index.features,
        extra: index.extra,
    })
}

fn relative_url(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Position within a dataset; hands out a fresh sample per step
#[derive(Debug, Clone)]
pub struct DatasetCursor {
    manifest: DatasetManifest,
    index: usize,
}

impl DatasetCursor {
    pub fn new(manifest: DatasetManifest) -> Self {
        Self { manifest, index: 0 }
    }

    pub fn manifest(&self) -> &DatasetManifest {
        &self.manifest
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Fresh sample at the current position
    pub fn current(&self) -> Option<Sample> {
        self.manifest.instantiate(self.index)
    }

    /// Move to the next sample. At the end the cursor stays put and
    /// returns `None`.
    pub fn advance(&mut self) -> Option<Sample> {
        let next = self.manifest.instantiate(self.index + 1)?;
        self.index += 1;
        Some(next)
    }
}
