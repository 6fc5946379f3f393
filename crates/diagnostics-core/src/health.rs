//! Health tracking for the diagnostics pipeline
//!
//! Four components back every snapshot: the sensor log and the three startup
//! artifacts. Artifact health is fixed once the models are loaded; dataset
//! health follows the outcome of each pipeline run.

use crate::diagnostics::ModelState;
use crate::error::{DiagnosticsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Component names for health tracking
pub mod components {
    pub const DATASET: &str = "dataset";
    pub const FAILURE_MODEL: &str = "failure_model";
    pub const SERVICE_MODEL: &str = "service_model";
    pub const ENCODER: &str = "encoder";

    pub const ALL: &[&str] = &[DATASET, FAILURE_MODEL, SERVICE_MODEL, ENCODER];
}

/// Ordered from best to worst, so the overall status is the maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Diagnostics currently unavailable, but recoverable without a restart
    Degraded,
    /// Needs new artifacts and a restart
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Shared view of component health, cheap to clone into handlers
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<BTreeMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    /// Seed every component from the startup model load.
    ///
    /// Each [`LoadFailure`](crate::diagnostics::LoadFailure) marks its
    /// component unhealthy; the dataset starts healthy until a read says
    /// otherwise.
    pub fn for_models(models: &ModelState) -> Self {
        let mut map: BTreeMap<String, ComponentHealth> = components::ALL
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    ComponentHealth::new(ComponentStatus::Healthy, None),
                )
            })
            .collect();

        for failure in models.failures() {
            map.insert(
                failure.component.to_string(),
                ComponentHealth::new(ComponentStatus::Unhealthy, Some(failure.reason.clone())),
            );
        }

        Self {
            components: Arc::new(RwLock::new(map)),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Degrade the dataset if the log is not there yet
    pub async fn check_dataset(&self, path: &Path) {
        if !path.exists() {
            self.set_dataset(
                ComponentStatus::Degraded,
                Some(format!("{} not found", path.display())),
            )
            .await;
        }
    }

    /// Update dataset health from the outcome of a pipeline run
    pub async fn record_dataset<T>(&self, outcome: &Result<T>) {
        match outcome {
            Ok(_) => self.set_dataset(ComponentStatus::Healthy, None).await,
            Err(
                err @ (DiagnosticsError::DataUnavailable { .. }
                | DiagnosticsError::DataMalformed { .. }
                | DiagnosticsError::InsufficientData),
            ) => {
                self.set_dataset(ComponentStatus::Degraded, Some(err.to_string()))
                    .await
            }
            // Checked before any read, says nothing about the log
            Err(DiagnosticsError::ModelUnavailable(_)) => {}
            // Later stages only run once the log was read successfully
            Err(_) => self.set_dataset(ComponentStatus::Healthy, None).await,
        }
    }

    async fn set_dataset(&self, status: ComponentStatus, message: Option<String>) {
        self.components.write().await.insert(
            components::DATASET.to_string(),
            ComponentHealth::new(status, message),
        );
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthResponse { status, components }
    }

    /// Ready once startup finished and no artifact is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        if !*self.ready.read().await {
            return ReadinessResponse {
                ready: false,
                reason: Some("Service not yet initialized".to_string()),
            };
        }

        let health = self.health().await;
        let failed: Vec<&str> = health
            .components
            .iter()
            .filter(|(_, c)| c.status == ComponentStatus::Unhealthy)
            .map(|(name, _)| name.as_str())
            .collect();

        if failed.is_empty() {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some(format!("Unhealthy components: {}", failed.join(", "))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::LoadFailure;
    use std::io;

    fn failed(component: &'static str, reason: &str) -> LoadFailure {
        LoadFailure {
            component,
            reason: reason.to_string(),
        }
    }

    fn unavailable() -> Result<()> {
        Err(DiagnosticsError::DataUnavailable {
            path: "/data/log.csv".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        })
    }

    #[tokio::test]
    async fn test_all_components_seeded_healthy() {
        let registry = HealthRegistry::for_models(&ModelState::Unavailable(vec![]));
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        let names: Vec<_> = health.components.keys().map(String::as_str).collect();
        assert_eq!(names, ["dataset", "encoder", "failure_model", "service_model"]);
    }

    #[tokio::test]
    async fn test_load_failures_mark_components_unhealthy() {
        let registry = HealthRegistry::for_models(&ModelState::Unavailable(vec![
            failed(components::FAILURE_MODEL, "checksum mismatch"),
            failed(components::ENCODER, "classes list is empty"),
        ]));

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert_eq!(
            health.components[components::ENCODER].message.as_deref(),
            Some("classes list is empty")
        );
        assert_eq!(
            health.components[components::SERVICE_MODEL].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_readiness_lists_failures_in_stable_order() {
        // Inserted failure-first; reported alphabetically every time
        let registry = HealthRegistry::for_models(&ModelState::Unavailable(vec![
            failed(components::FAILURE_MODEL, "missing"),
            failed(components::ENCODER, "missing"),
        ]));
        registry.set_ready(true).await;

        for _ in 0..5 {
            let readiness = registry.readiness().await;
            assert!(!readiness.ready);
            assert_eq!(
                readiness.reason.as_deref(),
                Some("Unhealthy components: encoder, failure_model")
            );
        }
    }

    #[tokio::test]
    async fn test_readiness_waits_for_startup() {
        let registry = HealthRegistry::for_models(&ModelState::Unavailable(vec![]));
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Service not yet initialized"));

        registry.set_ready(true).await;
        let readiness = registry.readiness().await;
        assert!(readiness.ready);
        assert!(readiness.reason.is_none());
    }

    #[tokio::test]
    async fn test_dataset_follows_pipeline_outcomes() {
        let registry = HealthRegistry::for_models(&ModelState::Unavailable(vec![]));
        registry.set_ready(true).await;

        registry.record_dataset(&unavailable()).await;
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.components[components::DATASET]
            .message
            .as_deref()
            .unwrap()
            .contains("/data/log.csv"));
        // A missing log never blocks readiness
        assert!(registry.readiness().await.ready);

        registry.record_dataset(&Ok(())).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_model_errors_leave_dataset_alone() {
        let registry = HealthRegistry::for_models(&ModelState::Unavailable(vec![]));
        registry.record_dataset(&unavailable()).await;

        let model_err: Result<()> = Err(DiagnosticsError::ModelUnavailable("x".to_string()));
        registry.record_dataset(&model_err).await;
        assert_eq!(
            registry.health().await.components[components::DATASET].status,
            ComponentStatus::Degraded
        );

        let mismatch: Result<()> = Err(DiagnosticsError::FeatureMismatch {
            model: "failure_model".to_string(),
            feature: "coolant_level".to_string(),
        });
        registry.record_dataset(&mismatch).await;
        assert_eq!(
            registry.health().await.components[components::DATASET].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_check_dataset_missing_path() {
        let registry = HealthRegistry::for_models(&ModelState::Unavailable(vec![]));
        registry.check_dataset(Path::new("/nope/vehicle_sensor_log.csv")).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        let file = tempfile::NamedTempFile::new().unwrap();
        let registry = HealthRegistry::for_models(&ModelState::Unavailable(vec![]));
        registry.check_dataset(file.path()).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[test]
    fn test_status_ordering() {
        assert!(ComponentStatus::Unhealthy > ComponentStatus::Degraded);
        assert!(ComponentStatus::Degraded > ComponentStatus::Healthy);
        assert_eq!(
            serde_json::to_value(ComponentStatus::Degraded).unwrap(),
            "degraded"
        );
    }
}
