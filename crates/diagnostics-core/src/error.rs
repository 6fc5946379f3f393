//! Error taxonomy for the diagnostics pipeline

use std::path::PathBuf;

/// Failure raised anywhere in the read → engineer → predict → assemble chain.
///
/// The variant tags the failure class; the original cause, where one exists,
/// is kept reachable through [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
pub enum DiagnosticsError {
    /// Dataset source missing or unreadable
    #[error("dataset unavailable at {}", path.display())]
    DataUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dataset present but a column is missing or a value cannot be parsed
    #[error("dataset malformed at row {row}: {reason}")]
    DataMalformed { row: u64, reason: String },

    /// Dataset contains no records
    #[error("dataset contains no records")]
    InsufficientData,

    /// A model or the encoder failed to load at startup
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// A model requires a feature the engineered namespace does not provide
    #[error("model '{model}' requires feature '{feature}' which is not available")]
    FeatureMismatch { model: String, feature: String },

    /// Categorical value never seen by the encoder
    #[error("unknown driving pattern category '{0}'")]
    UnknownCategory(String),

    /// The model backend itself failed while running
    #[error("inference failed for model '{model}'")]
    Inference {
        model: String,
        #[source]
        source: anyhow::Error,
    },

    /// Model or encoder artifact rejected while loading
    #[error("invalid artifact {}: {reason}", path.display())]
    ArtifactInvalid { path: PathBuf, reason: String },
}

impl DiagnosticsError {
    /// Stable machine-readable code used in logs, metrics and API bodies
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticsError::DataUnavailable { .. } => "DATA_UNAVAILABLE",
            DiagnosticsError::DataMalformed { .. } => "DATA_MALFORMED",
            DiagnosticsError::InsufficientData => "INSUFFICIENT_DATA",
            DiagnosticsError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            DiagnosticsError::FeatureMismatch { .. } => "FEATURE_MISMATCH",
            DiagnosticsError::UnknownCategory(_) => "UNKNOWN_CATEGORY",
            DiagnosticsError::Inference { .. } => "INFERENCE_FAILED",
            DiagnosticsError::ArtifactInvalid { .. } => "ARTIFACT_INVALID",
        }
    }

    /// True for failures that mean "nothing to diagnose" rather than a fault
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DiagnosticsError::DataUnavailable { .. } | DiagnosticsError::InsufficientData
        )
    }
}

pub type Result<T, E = DiagnosticsError> = std::result::Result<T, E>;
