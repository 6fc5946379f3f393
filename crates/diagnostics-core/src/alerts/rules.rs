//! Fixed alert rules
//!
//! Rules are evaluated in order and independently; more than one may fire.
//! A non-finite input never fires a rule.

use super::{Alert, AlertRuleSet, AlertSeverity, AlertStatus};
use crate::models::{DiagnosticsSnapshot, SensorRecord};

/// Engine temperature (°C) above which the raw-threshold critical alert fires
pub const ENGINE_TEMP_LIMIT_C: f64 = 100.0;

/// Stress index above which the raw-threshold warning fires
pub const STRESS_INDEX_LIMIT: f64 = 80.0;

/// Failure probability at or above which the probability critical alert fires
const FAILURE_PROBABILITY_LIMIT: f64 = 0.9;

/// Bearing-wear probability at or above which the probability warning fires
const BEARING_PROBABILITY_LIMIT: f64 = 0.4;

/// Confidence reported for threshold alerts without a model probability
const ENGINE_TEMP_CONFIDENCE: u8 = 90;
const STRESS_CONFIDENCE: u8 = 80;
const NOMINAL_CONFIDENCE: u8 = 95;

/// Fields the alert rules read
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlertInput {
    pub engine_temp: f64,
    pub stress_index: f64,
    /// Failure-model probability, when a snapshot was assembled
    pub failure_probability: Option<f64>,
    /// No model produces this yet; the bearing rule stays latent until one does
    pub bearing_probability: Option<f64>,
}

impl From<&DiagnosticsSnapshot> for AlertInput {
    fn from(snapshot: &DiagnosticsSnapshot) -> Self {
        Self {
            engine_temp: snapshot.engine_temp,
            stress_index: snapshot.stress_index,
            failure_probability: Some(snapshot.final_risk),
            bearing_probability: None,
        }
    }
}

impl From<&SensorRecord> for AlertInput {
    fn from(record: &SensorRecord) -> Self {
        Self {
            engine_temp: record.engine_temp,
            stress_index: record.stress_index,
            failure_probability: None,
            bearing_probability: None,
        }
    }
}

/// Derive the ordered alert list; never empty
pub fn derive(input: &AlertInput, rule_set: AlertRuleSet) -> Vec<Alert> {
    let mut alerts = match rule_set {
        AlertRuleSet::Threshold => threshold_rules(input),
        AlertRuleSet::Probability => probability_rules(input),
    };
    if alerts.is_empty() {
        alerts.push(nominal_alert());
    }
    alerts
}

/// The single alert emitted when nothing fired
pub fn nominal_alert() -> Alert {
    Alert {
        id: "vehicle-ok-001".to_string(),
        title: "Vehicle Operating Normally".to_string(),
        description: "No critical issues detected by AI diagnostics.".to_string(),
        severity: AlertSeverity::Low,
        status: AlertStatus::Resolved,
        predicted_failure_window: "N/A".to_string(),
        ai_confidence: NOMINAL_CONFIDENCE,
    }
}

fn threshold_rules(input: &AlertInput) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if exceeds(input.engine_temp, ENGINE_TEMP_LIMIT_C) {
        let confidence = input
            .failure_probability
            .and_then(confidence_from)
            .unwrap_or(ENGINE_TEMP_CONFIDENCE);
        alerts.push(Alert {
            id: "engine-temp-critical-001".to_string(),
            title: "High Engine Temperature".to_string(),
            description: format!(
                "Engine temperature of {:.1}°C exceeds the {:.0}°C safe limit. \
                 Immediate service is strongly recommended.",
                input.engine_temp, ENGINE_TEMP_LIMIT_C
            ),
            severity: AlertSeverity::Critical,
            status: AlertStatus::Active,
            predicted_failure_window: "Within 48 hours".to_string(),
            ai_confidence: confidence,
        });
    }

    if exceeds(input.stress_index, STRESS_INDEX_LIMIT) {
        alerts.push(Alert {
            id: "stress-warning-001".to_string(),
            title: "Component Stress Elevated".to_string(),
            description: format!(
                "Stress index of {:.1} is above {:.0}. Inspection is recommended.",
                input.stress_index, STRESS_INDEX_LIMIT
            ),
            severity: AlertSeverity::High,
            status: AlertStatus::Active,
            predicted_failure_window: "Within 7 days".to_string(),
            ai_confidence: STRESS_CONFIDENCE,
        });
    }

    alerts
}

fn probability_rules(input: &AlertInput) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if let Some(confidence) = firing(input.failure_probability, FAILURE_PROBABILITY_LIMIT) {
        alerts.push(Alert {
            id: "engine-critical-001".to_string(),
            title: "Engine Overheating Risk".to_string(),
            description: "AI detected a critical engine overheating condition. \
                          Immediate service is strongly recommended."
                .to_string(),
            severity: AlertSeverity::Critical,
            status: AlertStatus::Active,
            predicted_failure_window: "Within 48 hours".to_string(),
            ai_confidence: confidence,
        });
    }

    if let Some(confidence) = firing(input.bearing_probability, BEARING_PROBABILITY_LIMIT) {
        alerts.push(Alert {
            id: "bearing-warning-001".to_string(),
            title: "Bearing Wear Detected".to_string(),
            description: "Bearing wear probability is elevated. Inspection is recommended."
                .to_string(),
            severity: AlertSeverity::High,
            status: AlertStatus::Active,
            predicted_failure_window: "Within 7 days".to_string(),
            ai_confidence: confidence,
        });
    }

    alerts
}

/// Strictly above the limit, finite values only
fn exceeds(value: f64, limit: f64) -> bool {
    value.is_finite() && value > limit
}

/// Confidence for a probability at or above the limit
fn firing(probability: Option<f64>, limit: f64) -> Option<u8> {
    probability
        .filter(|p| p.is_finite() && *p >= limit)
        .and_then(confidence_from)
}

fn confidence_from(probability: f64) -> Option<u8> {
    if !probability.is_finite() {
        return None;
    }
    Some((probability * 100.0).round().clamp(0.0, 100.0) as u8)
}
