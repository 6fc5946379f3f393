//! Alert derivation for the vehicle dashboard
//!
//! This module provides:
//! - The alert payload served to the UI
//! - Two fixed rule sets (raw thresholds, model probabilities)
//! - The nominal fallback emitted when no rule fires

mod rules;

pub use rules::{derive, nominal_alert, AlertInput, ENGINE_TEMP_LIMIT_C, STRESS_INDEX_LIMIT};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the condition still needs attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

/// Alert as served to the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub predicted_failure_window: String,
    /// 0-100
    pub ai_confidence: u8,
}

/// Which inputs drive the alert rules. Exactly one is active per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertRuleSet {
    /// Raw latest-record thresholds on engine temperature and stress index
    #[default]
    Threshold,
    /// Failure (and bearing) probabilities from the models
    Probability,
}

impl AlertRuleSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertRuleSet::Threshold => "threshold",
            AlertRuleSet::Probability => "probability",
        }
    }
}

impl FromStr for AlertRuleSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "threshold" => Ok(AlertRuleSet::Threshold),
            "probability" => Ok(AlertRuleSet::Probability),
            other => Err(format!("unknown alert rule set '{}'", other)),
        }
    }
}
