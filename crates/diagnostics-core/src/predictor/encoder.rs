//! Categorical encoding for the driving pattern column
//!
//! The encoder is fitted at training time and shipped as an artifact; here it
//! is only ever applied. A value's code is its position in `classes`.

use crate::error::{DiagnosticsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Default code for unseen categories under [`UnknownCategoryPolicy::Sentinel`]
pub const DEFAULT_SENTINEL_CODE: i64 = -1;

/// What to do with a category the encoder never saw during training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownCategoryPolicy {
    /// Fail with `UnknownCategory`
    #[default]
    Reject,
    /// Map to the given code
    Sentinel(i64),
}

#[derive(Debug, Deserialize, Serialize)]
struct EncoderArtifact {
    classes: Vec<String>,
}

/// Label encoder mapping category strings to integer codes
#[derive(Debug, Clone)]
pub struct CategoryEncoder {
    classes: Vec<String>,
    codes: HashMap<String, i64>,
    policy: UnknownCategoryPolicy,
}

impl CategoryEncoder {
    /// Build from the training-time class list
    pub fn new(classes: Vec<String>) -> Result<Self> {
        let mut codes = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            if codes.insert(class.clone(), code as i64).is_some() {
                return Err(DiagnosticsError::ArtifactInvalid {
                    path: Default::default(),
                    reason: format!("duplicate encoder class '{}'", class),
                });
            }
        }
        Ok(Self {
            classes,
            codes,
            policy: UnknownCategoryPolicy::default(),
        })
    }

    /// Load a `{"classes": [...]}` artifact from disk
    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |reason: String| DiagnosticsError::ArtifactInvalid {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let artifact: EncoderArtifact =
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        if artifact.classes.is_empty() {
            return Err(invalid("encoder has no classes".to_string()));
        }
        Self::new(artifact.classes).map_err(|e| match e {
            DiagnosticsError::ArtifactInvalid { reason, .. } => invalid(reason),
            other => other,
        })
    }

    pub fn with_policy(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> UnknownCategoryPolicy {
        self.policy
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Encode a single value according to the configured policy
    pub fn transform(&self, value: &str) -> Result<i64> {
        match (self.codes.get(value), self.policy) {
            (Some(code), _) => Ok(*code),
            (None, UnknownCategoryPolicy::Sentinel(code)) => Ok(code),
            (None, UnknownCategoryPolicy::Reject) => {
                Err(DiagnosticsError::UnknownCategory(value.to_string()))
            }
        }
    }
}
