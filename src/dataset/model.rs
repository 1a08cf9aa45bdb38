//! Samples and the features painted onto them

use crate::raster::{AnnotationRaster, RasterError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Feature type name for raster overlays
pub const HEATMAP: &str = "heatmap";

/// Feature description from the dataset manifest.
///
/// Only `type` is interpreted; every other key is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTemplate {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureTemplate {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            extra: Map::new(),
        }
    }

    pub fn heatmap() -> Self {
        Self::new(HEATMAP)
    }

    pub fn is_heatmap(&self) -> bool {
        self.kind == HEATMAP
    }
}

/// Value owned by a feature
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Heatmap(AnnotationRaster),
    List(Vec<Value>),
}

/// One annotation on a sample
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    template: FeatureTemplate,
    value: FeatureValue,
}

impl Feature {
    /// Fresh, empty feature for a template. Heatmap rasters stay unallocated
    /// until the source image size is known.
    pub fn from_template(template: &FeatureTemplate) -> Self {
        let value = if template.is_heatmap() {
            FeatureValue::Heatmap(AnnotationRaster::new())
        } else {
            FeatureValue::List(Vec::new())
        };
        Self {
            template: template.clone(),
            value,
        }
    }

    pub fn kind(&self) -> &str {
        &self.template.kind
    }

    pub fn template(&self) -> &FeatureTemplate {
        &self.template
    }

    pub fn value(&self) -> &FeatureValue {
        &self.value
    }

    pub fn is_heatmap(&self) -> bool {
        matches!(self.value, FeatureValue::Heatmap(_))
    }

    pub fn heatmap(&self) -> Option<&AnnotationRaster> {
        match &self.value {
            FeatureValue::Heatmap(raster) => Some(raster),
            FeatureValue::List(_) => None,
        }
    }

    pub fn heatmap_mut(&mut self) -> Option<&mut AnnotationRaster> {
        match &mut self.value {
            FeatureValue::Heatmap(raster) => Some(raster),
            FeatureValue::List(_) => None,
        }
    }

    pub fn list(&self) -> Option<&[Value]> {
        match &self.value {
            FeatureValue::List(values) => Some(values),
            FeatureValue::Heatmap(_) => None,
        }
    }

    pub fn list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.value {
            FeatureValue::List(values) => Some(values),
            FeatureValue::Heatmap(_) => None,
        }
    }

    /// Serializable snapshot for persistence. Heatmaps become base64 PNG;
    /// an unallocated heatmap is stored as `null`.
    pub fn to_record(&self) -> Result<FeatureRecord, RasterError> {
        let value = match &self.value {
            FeatureValue::Heatmap(raster) if raster.is_allocated() => {
                Value::String(raster.encode_png_base64()?)
            }
            FeatureValue::Heatmap(_) => Value::Null,
            FeatureValue::List(values) => Value::Array(values.clone()),
        };
        Ok(FeatureRecord {
            template: self.template.clone(),
            value,
        })
    }
}

/// Persisted form of a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(flatten)]
    pub template: FeatureTemplate,
    pub value: Value,
}

impl FeatureRecord {
    /// Decode the PNG bytes of a heatmap record
    pub fn heatmap_png(&self) -> Option<Vec<u8>> {
        if !self.template.is_heatmap() {
            return None;
        }
        self.value
            .as_str()
            .and_then(|encoded| BASE64.decode(encoded).ok())
    }
}

/// A source image plus the features annotated on it
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    file: String,
    features: Vec<Feature>,
}

impl Sample {
    pub fn new(file: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            file: file.into(),
            features,
        }
    }

    /// Sample with one fresh feature per template
    pub fn from_templates(file: impl Into<String>, templates: &[FeatureTemplate]) -> Self {
        Self::new(file, templates.iter().map(Feature::from_template).collect())
    }

    /// URL of the source image
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, index: usize) -> Option<&Feature> {
        self.features.get(index)
    }

    pub fn feature_mut(&mut self, index: usize) -> Option<&mut Feature> {
        self.features.get_mut(index)
    }

    /// Bring every heatmap raster to the source image size.
    /// Returns the number of rasters that were reallocated.
    pub fn fit_heatmaps(&mut self, width: u32, height: u32) -> usize {
        self.features
            .iter_mut()
            .filter_map(Feature::heatmap_mut)
            .map(|raster| raster.ensure_size(width, height))
            .filter(|resized| *resized)
            .count()
    }
}
