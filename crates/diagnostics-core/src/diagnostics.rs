//! Diagnostics assembly
//!
//! [`DiagnosticsService`] is built once at startup and shared by reference into
//! every request. It owns the dataset location, the loaded models and encoder
//! (or the reason they failed to load) and the active alert rule set. Nothing
//! it holds changes after construction, so concurrent requests need no locking.

use crate::alerts::{self, Alert, AlertInput, AlertRuleSet};
use crate::dataset::DatasetReader;
use crate::error::{DiagnosticsError, Result};
use crate::health::components;
use crate::models::DiagnosticsSnapshot;
use crate::predictor::{
    load_model, CategoryEncoder, FeatureEngine, Model, ModelAdapter, ModelKind,
    UnknownCategoryPolicy,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where the startup artifacts live and how to apply them
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub failure_model: PathBuf,
    pub service_model: PathBuf,
    pub encoder: PathBuf,
    pub unknown_category: UnknownCategoryPolicy,
}

/// Models and encoder, immutable once loaded
#[derive(Clone)]
pub struct LoadedModels {
    pub failure: Arc<dyn Model>,
    pub service_demand: Arc<dyn Model>,
    pub features: FeatureEngine,
}

impl LoadedModels {
    /// Assemble from already-constructed parts, checking the failure model kind
    pub fn new(
        failure: Arc<dyn Model>,
        service_demand: Arc<dyn Model>,
        encoder: CategoryEncoder,
    ) -> Result<Self> {
        if failure.kind() != ModelKind::Classifier {
            return Err(DiagnosticsError::ModelUnavailable(format!(
                "failure model '{}' must be a classifier",
                failure.name()
            )));
        }
        Ok(Self {
            failure,
            service_demand,
            features: FeatureEngine::new(encoder),
        })
    }
}

/// One artifact that failed to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    /// Health component name
    pub component: &'static str,
    pub reason: String,
}

/// Process-wide model state decided once at startup
#[derive(Clone)]
pub enum ModelState {
    Ready(LoadedModels),
    Unavailable(Vec<LoadFailure>),
}

impl ModelState {
    /// Load every artifact; any failure marks the whole state unavailable
    pub fn load(paths: &ArtifactPaths) -> Self {
        let mut failures = Vec::new();

        let failure = load_model(&paths.failure_model).map_err(|e| LoadFailure {
            component: components::FAILURE_MODEL,
            reason: e.to_string(),
        });
        let service = load_model(&paths.service_model).map_err(|e| LoadFailure {
            component: components::SERVICE_MODEL,
            reason: e.to_string(),
        });
        let encoder = CategoryEncoder::load(&paths.encoder)
            .map(|enc| enc.with_policy(paths.unknown_category))
            .map_err(|e| LoadFailure {
                component: components::ENCODER,
                reason: e.to_string(),
            });

        match (failure, service, encoder) {
            (Ok(failure), Ok(service), Ok(encoder)) => {
                match LoadedModels::new(failure, service, encoder) {
                    Ok(models) => return ModelState::Ready(models),
                    Err(e) => failures.push(LoadFailure {
                        component: components::FAILURE_MODEL,
                        reason: e.to_string(),
                    }),
                }
            }
            (failure, service, encoder) => {
                failures.extend(failure.err());
                failures.extend(service.err());
                failures.extend(encoder.err());
            }
        }

        ModelState::Unavailable(failures)
    }

    pub fn ready(&self) -> Result<&LoadedModels> {
        match self {
            ModelState::Ready(models) => Ok(models),
            ModelState::Unavailable(failures) => {
                let reasons: Vec<_> = failures
                    .iter()
                    .map(|f| format!("{}: {}", f.component, f.reason))
                    .collect();
                Err(DiagnosticsError::ModelUnavailable(reasons.join("; ")))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }

    pub fn failures(&self) -> &[LoadFailure] {
        match self {
            ModelState::Ready(_) => &[],
            ModelState::Unavailable(failures) => failures,
        }
    }
}

/// Snapshot plus the dataset size it was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub snapshot: DiagnosticsSnapshot,
    pub records: usize,
}

/// Orchestrates read → engineer → predict → assemble for the latest record
pub struct DiagnosticsService {
    reader: DatasetReader,
    models: ModelState,
    rule_set: AlertRuleSet,
}

impl DiagnosticsService {
    pub fn new(reader: DatasetReader, models: ModelState, rule_set: AlertRuleSet) -> Self {
        Self {
            reader,
            models,
            rule_set,
        }
    }

    pub fn models(&self) -> &ModelState {
        &self.models
    }

    pub fn reader(&self) -> &DatasetReader {
        &self.reader
    }

    pub fn rule_set(&self) -> AlertRuleSet {
        self.rule_set
    }

    /// Build the snapshot for the most recent record
    pub fn assemble(&self) -> Result<DiagnosticsSnapshot> {
        self.assemble_with_stats().map(|a| a.snapshot)
    }

    /// Like [`assemble`](Self::assemble), also reporting the dataset size
    pub fn assemble_with_stats(&self) -> Result<Assembled> {
        // Short-circuit before any I/O when models never loaded
        let models = self.models.ready()?;

        let records = self.reader.read()?;
        let features = models.features.engineer(&records)?;

        let (latest, latest_features) = records
            .last()
            .zip(features.last())
            .ok_or(DiagnosticsError::InsufficientData)?;

        let risk = ModelAdapter::predict(models.failure.as_ref(), latest, latest_features)?;
        let probability = risk.probability().ok_or_else(|| DiagnosticsError::Inference {
            model: models.failure.name().to_string(),
            source: anyhow::anyhow!("Failure model returned no probability"),
        })?;
        let final_risk = round_to(probability, 3);

        let demand =
            ModelAdapter::predict(models.service_demand.as_ref(), latest, latest_features)?;
        let service_demand = demand.as_integer();

        debug!(
            vehicle_id = %latest.vehicle_id,
            final_risk,
            service_demand,
            "Inference complete for latest record"
        );

        Ok(Assembled {
            snapshot: DiagnosticsSnapshot {
                vehicle_id: latest.vehicle_id.clone(),
                timestamp: latest.timestamp,
                final_risk,
                service_demand,
                engine_temp: latest.engine_temp,
                vibration: latest.vibration,
                oil_pressure: latest.oil_pressure,
                rpm: latest.rpm,
                mileage: latest.mileage,
                past_failures: latest.past_failures,
                driving_pattern: latest.driving_pattern.clone(),
                stress_index: latest.stress_index,
                dtc_code: latest.dtc_code.clone(),
            },
            records: records.len(),
        })
    }

    /// Input for the active rule set.
    ///
    /// Threshold rules read the raw latest record and need no models; the
    /// probability rules need a full snapshot.
    pub fn alert_input(&self) -> Result<AlertInput> {
        match self.rule_set {
            AlertRuleSet::Threshold => {
                // Same thresholds either way; the snapshot adds the failure probability
                if self.models.is_ready() {
                    match self.assemble() {
                        Ok(snapshot) => return Ok(AlertInput::from(&snapshot)),
                        Err(e) => {
                            debug!(code = e.code(), "Snapshot unavailable, alerting on raw record")
                        }
                    }
                }
                self.reader
                    .latest()?
                    .as_ref()
                    .map(AlertInput::from)
                    .ok_or(DiagnosticsError::InsufficientData)
            }
            AlertRuleSet::Probability => Ok(AlertInput::from(&self.assemble()?)),
        }
    }

    /// Alerts for the latest state; advisory, so failures yield an empty list
    pub fn alerts(&self) -> Vec<Alert> {
        match self.alert_input() {
            Ok(input) => alerts::derive(&input, self.rule_set),
            Err(e) => {
                warn!(code = e.code(), error = %e, "Alert input unavailable, returning no alerts");
                Vec::new()
            }
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
