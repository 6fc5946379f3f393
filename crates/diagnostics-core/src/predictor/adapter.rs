//! Uniform prediction contract over heterogeneous models
//!
//! Builds each model's input from the merged record + engineered-feature
//! namespace, restricted to and ordered by the model's declared features, then
//! interprets the raw outputs according to the model kind.

use super::{Model, ModelKind, Prediction};
use crate::error::{DiagnosticsError, Result};
use crate::models::{EngineeredFeatures, SensorRecord};
use crate::observability::DiagnosticsMetrics;
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

/// Every name a model may request, in namespace order
pub const NAMESPACE_FEATURES: &[&str] = &[
    "engine_temp",
    "oil_pressure",
    "vibration",
    "rpm",
    "mileage",
    "past_failures",
    "stress_index",
    "driving_pattern_encoded",
    "engine_temp_avg_3",
    "oil_pressure_avg_3",
    "vibration_avg_3",
    "day_index",
];

/// Numeric view over one record and its engineered features
#[derive(Debug, Clone, Copy)]
pub struct FeatureNamespace<'a> {
    record: &'a SensorRecord,
    features: &'a EngineeredFeatures,
}

impl<'a> FeatureNamespace<'a> {
    pub fn new(record: &'a SensorRecord, features: &'a EngineeredFeatures) -> Self {
        Self { record, features }
    }

    /// Look up a feature by name; string-valued fields are not numeric features
    pub fn get(&self, name: &str) -> Option<f64> {
        let r = self.record;
        let f = self.features;
        let value = match name {
            "engine_temp" => r.engine_temp,
            "oil_pressure" => r.oil_pressure,
            "vibration" => r.vibration,
            "rpm" => r.rpm as f64,
            "mileage" => r.mileage as f64,
            "past_failures" => r.past_failures as f64,
            "stress_index" => r.stress_index,
            "driving_pattern_encoded" => f.driving_pattern_encoded as f64,
            "engine_temp_avg_3" => f.engine_temp_avg_3,
            "oil_pressure_avg_3" => f.oil_pressure_avg_3,
            "vibration_avg_3" => f.vibration_avg_3,
            "day_index" => f.day_index as f64,
            _ => return None,
        };
        Some(value)
    }
}

/// Ordered, name-restricted input for a single model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInputVector {
    entries: Vec<(String, f64)>,
}

impl ModelInputVector {
    /// Select `names` from the namespace, in the given order
    pub fn build(model: &str, names: &[String], namespace: &FeatureNamespace<'_>) -> Result<Self> {
        let entries = names
            .iter()
            .map(|name| {
                namespace
                    .get(name)
                    .map(|value| (name.clone(), value))
                    .ok_or_else(|| DiagnosticsError::FeatureMismatch {
                        model: model.to_string(),
                        feature: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, value)| *value).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Runs models against the merged namespace
pub struct ModelAdapter;

impl ModelAdapter {
    pub fn predict(
        model: &dyn Model,
        record: &SensorRecord,
        features: &EngineeredFeatures,
    ) -> Result<Prediction> {
        let namespace = FeatureNamespace::new(record, features);
        let input = ModelInputVector::build(model.name(), model.feature_names(), &namespace)?;

        let start = Instant::now();
        let outputs = model
            .run(&input.values())
            .map_err(|source| DiagnosticsError::Inference {
                model: model.name().to_string(),
                source,
            })?;

        let elapsed = start.elapsed();
        DiagnosticsMetrics::new().observe_inference_latency(model.name(), elapsed.as_secs_f64());
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(model = %model.name(), elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(model = %model.name(), elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        interpret(model, &outputs)
    }
}

fn interpret(model: &dyn Model, outputs: &[f64]) -> Result<Prediction> {
    let empty = || DiagnosticsError::Inference {
        model: model.name().to_string(),
        source: anyhow::anyhow!("Model produced no output"),
    };

    match model.kind() {
        ModelKind::Regressor => outputs.first().copied().map(Prediction::Value).ok_or_else(empty),
        ModelKind::Classifier => match outputs {
            [] => Err(empty()),
            [p] => Ok(Prediction::Class {
                probability: p.clamp(0.0, 1.0),
                label: i64::from(*p >= 0.5),
            }),
            probs => {
                let label = probs
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(idx, _)| idx as i64)
                    .unwrap_or(0);
                let positive = probs[probs.len() - 1];
                Ok(Prediction::Class {
                    probability: positive.clamp(0.0, 1.0),
                    label,
                })
            }
        },
    }
}
