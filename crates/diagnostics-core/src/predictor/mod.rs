//! ML prediction engine

mod adapter;
mod encoder;
mod features;
mod inference;

pub use adapter::{FeatureNamespace, ModelAdapter, ModelInputVector, NAMESPACE_FEATURES};
pub use encoder::{CategoryEncoder, UnknownCategoryPolicy, DEFAULT_SENTINEL_CODE};
pub use features::{backfill, rolling_mean, FeatureEngine, ROLLING_WINDOW};
pub use inference::{load_model, BackendSpec, LinearModel, ModelManifest, OnnxModel};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// How a model's raw outputs are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Outputs class probabilities; the last class is the positive one
    Classifier,
    /// Outputs a single numeric value
    Regressor,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Classifier => "classifier",
            ModelKind::Regressor => "regressor",
        }
    }
}

/// Trait for externally trained models
///
/// Implementations are pure: the same input always yields the same output and
/// nothing is mutated by running them.
pub trait Model: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    fn kind(&self) -> ModelKind;

    /// Required input features, in the order the model was trained on
    fn feature_names(&self) -> &[String];

    /// Run one input row (ordered as `feature_names`) and return raw outputs
    fn run(&self, input: &[f64]) -> Result<Vec<f64>>;
}

/// Interpreted model output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
    Class { probability: f64, label: i64 },
    Value(f64),
}

impl Prediction {
    /// Confidence that the positive class applies, for classifiers
    pub fn probability(&self) -> Option<f64> {
        match self {
            Prediction::Class { probability, .. } => Some(*probability),
            Prediction::Value(_) => None,
        }
    }

    /// Class label, or the regression value rounded to the nearest integer
    pub fn as_integer(&self) -> i64 {
        match self {
            Prediction::Class { label, .. } => *label,
            Prediction::Value(v) => v.round() as i64,
        }
    }
}
