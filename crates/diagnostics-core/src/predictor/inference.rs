//! Model backends and artifact loading
//!
//! Models ship as a JSON manifest naming the model, its kind, the ordered list
//! of features it was trained on and a backend. ONNX graphs run through tract;
//! linear models carry their coefficients inline.

use super::{Model, ModelKind};
use crate::error::{DiagnosticsError, Result};
use anyhow::Context;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tract_onnx::prelude::*;
use tracing::{debug, info};

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Model artifact manifest
#[derive(Debug, Clone, Deserialize)]
pub struct ModelManifest {
    pub name: String,
    pub kind: ModelKind,
    pub feature_names: Vec<String>,
    pub backend: BackendSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendSpec {
    Onnx {
        /// Graph file, relative paths resolve against the manifest directory
        path: PathBuf,
        /// Index of the output holding probabilities or the value
        #[serde(default)]
        output: usize,
        /// Expected hex SHA-256 of the graph file
        #[serde(default)]
        sha256: Option<String>,
    },
    Linear {
        coefficients: Vec<f64>,
        #[serde(default)]
        intercept: f64,
    },
}

/// Load a model from its manifest
pub fn load_model(manifest_path: &Path) -> Result<Arc<dyn Model>> {
    let invalid = |reason: String| DiagnosticsError::ArtifactInvalid {
        path: manifest_path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(manifest_path).map_err(|e| invalid(e.to_string()))?;
    let manifest: ModelManifest =
        serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
    validate_feature_names(&manifest.feature_names).map_err(invalid)?;

    let model: Arc<dyn Model> = match manifest.backend {
        BackendSpec::Linear {
            coefficients,
            intercept,
        } => Arc::new(
            LinearModel::new(
                manifest.name,
                manifest.kind,
                manifest.feature_names,
                coefficients,
                intercept,
            )
            .map_err(invalid)?,
        ),
        BackendSpec::Onnx {
            path,
            output,
            sha256,
        } => {
            let graph_path = match manifest_path.parent() {
                Some(dir) if path.is_relative() => dir.join(&path),
                _ => path,
            };
            let bytes = std::fs::read(&graph_path)
                .map_err(|e| invalid(format!("{}: {}", graph_path.display(), e)))?;
            if let Some(expected) = sha256 {
                verify_checksum(&bytes, &expected).map_err(invalid)?;
            }
            Arc::new(
                OnnxModel::from_bytes(
                    manifest.name,
                    manifest.kind,
                    manifest.feature_names,
                    &bytes,
                    output,
                )
                .map_err(|e| invalid(format!("{:#}", e)))?,
            )
        }
    };

    info!(
        model = %model.name(),
        kind = ?model.kind(),
        features = model.feature_names().len(),
        "Model loaded"
    );
    Ok(model)
}

fn validate_feature_names(names: &[String]) -> std::result::Result<(), String> {
    if names.is_empty() {
        return Err("model declares no input features".to_string());
    }
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(format!("duplicate feature name '{}'", name));
        }
    }
    Ok(())
}

fn verify_checksum(bytes: &[u8], expected: &str) -> std::result::Result<(), String> {
    let actual = hex::encode(Sha256::digest(bytes));
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(format!("checksum mismatch: expected {}, got {}", expected, actual))
    }
}

/// Linear or logistic model with inline coefficients
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    kind: ModelKind,
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    pub fn new(
        name: impl Into<String>,
        kind: ModelKind,
        feature_names: Vec<String>,
        coefficients: Vec<f64>,
        intercept: f64,
    ) -> std::result::Result<Self, String> {
        if coefficients.len() != feature_names.len() {
            return Err(format!(
                "{} coefficients for {} features",
                coefficients.len(),
                feature_names.len()
            ));
        }
        Ok(Self {
            name: name.into(),
            kind,
            feature_names,
            coefficients,
            intercept,
        })
    }
}

impl Model for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn run(&self, input: &[f64]) -> anyhow::Result<Vec<f64>> {
        if input.len() != self.coefficients.len() {
            anyhow::bail!(
                "Input has {} values, expected {}",
                input.len(),
                self.coefficients.len()
            );
        }
        let z = self.intercept
            + input
                .iter()
                .zip(&self.coefficients)
                .map(|(x, w)| x * w)
                .sum::<f64>();

        Ok(match self.kind {
            ModelKind::Classifier => {
                let p = 1.0 / (1.0 + (-z).exp());
                vec![1.0 - p, p]
            }
            ModelKind::Regressor => vec![z],
        })
    }
}

/// ONNX-based model using tract for lightweight inference
pub struct OnnxModel {
    name: String,
    kind: ModelKind,
    feature_names: Vec<String>,
    plan: TractModel,
    output_index: usize,
}

impl OnnxModel {
    /// Parse and optimize an ONNX graph with a single `[1, N]` f32 input
    pub fn from_bytes(
        name: impl Into<String>,
        kind: ModelKind,
        feature_names: Vec<String>,
        model_bytes: &[u8],
        output_index: usize,
    ) -> anyhow::Result<Self> {
        let plan = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, feature_names.len()]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        Ok(Self {
            name: name.into(),
            kind,
            feature_names,
            plan,
            output_index,
        })
    }
}

impl Model for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn run(&self, input: &[f64]) -> anyhow::Result<Vec<f64>> {
        let data: Vec<f32> = input.iter().map(|v| *v as f32).collect();
        let tensor: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.feature_names.len()), data)
                .context("Input does not match declared feature count")?
                .into();

        let result = self.plan.run(tvec!(tensor.into()))?;
        let output = result
            .get(self.output_index)
            .with_context(|| format!("Model has no output {}", self.output_index))?;
        let output = output.cast_to::<f32>()?;
        let values: Vec<f64> = output.as_slice::<f32>()?.iter().map(|v| *v as f64).collect();

        debug!(model = %self.name, outputs = values.len(), "ONNX inference completed");
        Ok(values)
    }
}
