//! Extraction-related types and error definitions

use std::time::Duration;

use indexmap::IndexMap;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while processing an extraction request
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid image data: {0}")]
    Decode(String),

    #[error("Image is {width}x{height}, exceeds maximum dimension {max_dim}")]
    ImageTooLarge { width: u32, height: u32, max_dim: u32 },

    #[error("Processing queue is full")]
    Saturated,

    #[error("Processing timed out after {0:?}")]
    Timeout(Duration),

    #[error("Algorithm failure: {0}")]
    Algorithm(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Decoded pixel data in its native channel layout.
///
/// IFCB ROIs are typically 8-bit grayscale; color inputs are kept as
/// height x width x 3 so the algorithms can pick their own reduction.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelArray {
    Gray(Array2<u8>),
    Rgb(Array3<u8>),
}

impl PixelArray {
    /// (width, height) of the underlying image
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            PixelArray::Gray(a) => (a.ncols() as u32, a.nrows() as u32),
            PixelArray::Rgb(a) => {
                let (h, w, _) = a.dim();
                (w as u32, h as u32)
            }
        }
    }
}

/// Binary mask aligned pixel-for-pixel with its source image; values are
/// restricted to 0 (background) and 1 (foreground).
pub type MaskArray = Array2<u8>;

/// A single feature value; numeric for measurements, text for categorical
/// outputs. Serialized untagged so the wire shape is a plain scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

/// Ordered name -> value mapping returned by the feature algorithms.
/// The request layer passes this through without assuming a schema.
pub type FeatureSet = IndexMap<String, FeatureValue>;

/// Request payload for segmentation ("blob extraction") and feature
/// computation; both actions accept the same shape.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobRequest {
    /// Base64-encoded PNG image data
    pub image_data: String,
}

/// Response payload for `/features/extract`
#[derive(Debug, Serialize, Deserialize)]
pub struct FeaturesResponse {
    /// Base64-encoded 1-bit PNG of the blob mask
    pub blob: String,
    /// Feature name -> value mapping
    pub features: FeatureSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_values_serialize_as_plain_scalars() {
        let mut features = FeatureSet::new();
        features.insert("area".to_string(), FeatureValue::Number(42.0));
        features.insert("class".to_string(), FeatureValue::Text("diatom".to_string()));

        let json = serde_json::to_value(&features).unwrap();
        assert_eq!(json["area"], 42.0);
        assert_eq!(json["class"], "diatom");
    }

    #[test]
    fn test_feature_set_preserves_insertion_order() {
        let mut features = FeatureSet::new();
        for name in ["width", "height", "area"] {
            features.insert(name.to_string(), FeatureValue::Number(0.0));
        }
        let names: Vec<&str> = features.keys().map(String::as_str).collect();
        assert_eq!(names, ["width", "height", "area"]);
    }
}
