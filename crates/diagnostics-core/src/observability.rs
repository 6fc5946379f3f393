//! Observability infrastructure for the diagnostics service
//!
//! Provides:
//! - Prometheus metrics (assembly latency, outcomes, alert counts, model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge, register_gauge_vec, register_histogram, register_histogram_vec,
    register_int_counter, register_int_counter_vec, register_int_gauge, Gauge, GaugeVec,
    Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DiagnosticsMetricsInner> = OnceLock::new();

struct DiagnosticsMetricsInner {
    assemble_latency_seconds: Histogram,
    inference_latency_seconds: HistogramVec,
    snapshots_assembled: IntCounter,
    diagnostics_errors: IntCounterVec,
    alerts_emitted: IntCounterVec,
    last_final_risk: Gauge,
    last_service_demand: IntGauge,
    dataset_records: IntGauge,
    model_info: GaugeVec,
}

impl DiagnosticsMetricsInner {
    fn new() -> Self {
        Self {
            assemble_latency_seconds: register_histogram!(
                "vehicle_diagnostics_assemble_latency_seconds",
                "Time spent reading, engineering and inferring one snapshot",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register assemble_latency_seconds"),

            inference_latency_seconds: register_histogram_vec!(
                "vehicle_diagnostics_inference_latency_seconds",
                "Time spent running a single model on one input row",
                &["model"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            snapshots_assembled: register_int_counter!(
                "vehicle_diagnostics_snapshots_assembled_total",
                "Total number of diagnostics snapshots assembled"
            )
            .expect("Failed to register snapshots_assembled"),

            diagnostics_errors: register_int_counter_vec!(
                "vehicle_diagnostics_errors_total",
                "Diagnostics failures by error code",
                &["code"]
            )
            .expect("Failed to register diagnostics_errors"),

            alerts_emitted: register_int_counter_vec!(
                "vehicle_diagnostics_alerts_emitted_total",
                "Alerts derived, by severity",
                &["severity"]
            )
            .expect("Failed to register alerts_emitted"),

            last_final_risk: register_gauge!(
                "vehicle_diagnostics_last_final_risk",
                "Failure probability of the most recent snapshot"
            )
            .expect("Failed to register last_final_risk"),

            last_service_demand: register_int_gauge!(
                "vehicle_diagnostics_last_service_demand",
                "Service demand of the most recent snapshot"
            )
            .expect("Failed to register last_service_demand"),

            dataset_records: register_int_gauge!(
                "vehicle_diagnostics_dataset_records",
                "Number of records in the sensor log at the last read"
            )
            .expect("Failed to register dataset_records"),

            model_info: register_gauge_vec!(
                "vehicle_diagnostics_model_info",
                "Information about the loaded models",
                &["model", "kind", "features"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Diagnostics metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct DiagnosticsMetrics {
    _private: (),
}

impl Default for DiagnosticsMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticsMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DiagnosticsMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DiagnosticsMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_assemble_latency(&self, duration_secs: f64) {
        self.inner().assemble_latency_seconds.observe(duration_secs);
    }

    pub fn observe_inference_latency(&self, model: &str, duration_secs: f64) {
        self.inner()
            .inference_latency_seconds
            .with_label_values(&[model])
            .observe(duration_secs);
    }

    /// Record a successful snapshot
    pub fn record_snapshot(&self, final_risk: f64, service_demand: i64, records: usize) {
        let inner = self.inner();
        inner.snapshots_assembled.inc();
        inner.last_final_risk.set(final_risk);
        inner.last_service_demand.set(service_demand);
        inner.dataset_records.set(records as i64);
    }

    pub fn inc_diagnostics_error(&self, code: &str) {
        self.inner().diagnostics_errors.with_label_values(&[code]).inc();
    }

    pub fn inc_alert(&self, severity: &str) {
        self.inner().alerts_emitted.with_label_values(&[severity]).inc();
    }

    /// Publish which models are loaded
    pub fn set_model_info(&self, model: &str, kind: &str, features: usize) {
        self.inner()
            .model_info
            .with_label_values(&[model, kind, &features.to_string()])
            .set(1.0);
    }
}

/// Structured logger for diagnostics events
///
/// Provides consistent JSON-formatted logging for snapshots, alerts and
/// lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, dataset_path: &str, rule_set: &str) {
        info!(
            event = "server_started",
            instance = %self.instance,
            server_version = %version,
            dataset_path = %dataset_path,
            alert_rule_set = %rule_set,
            "Diagnostics server started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "server_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Diagnostics server shutting down"
        );
    }

    pub fn log_models_loaded(&self, failure_model: &str, service_model: &str, classes: usize) {
        info!(
            event = "models_loaded",
            instance = %self.instance,
            failure_model = %failure_model,
            service_model = %service_model,
            encoder_classes = classes,
            "Models and encoder loaded"
        );
    }

    pub fn log_model_load_failed(&self, component: &str, reason: &str) {
        error!(
            event = "model_load_failed",
            instance = %self.instance,
            component = %component,
            reason = %reason,
            "Model load failed, diagnostics will be unavailable"
        );
    }

    pub fn log_snapshot(
        &self,
        vehicle_id: &str,
        final_risk: f64,
        service_demand: i64,
        records: usize,
        elapsed_ms: u128,
    ) {
        info!(
            event = "diagnostics_assembled",
            instance = %self.instance,
            vehicle_id = %vehicle_id,
            final_risk = final_risk,
            service_demand = service_demand,
            records = records,
            elapsed_ms = elapsed_ms as u64,
            "Diagnostics snapshot assembled"
        );
    }

    pub fn log_diagnostics_failed(&self, code: &str, error: &str) {
        warn!(
            event = "diagnostics_failed",
            instance = %self.instance,
            code = %code,
            error = %error,
            "Diagnostics assembly failed"
        );
    }

    pub fn log_alerts(&self, rule_set: &str, count: usize, highest: &str) {
        info!(
            event = "alerts_derived",
            instance = %self.instance,
            alert_rule_set = %rule_set,
            count = count,
            highest_severity = %highest,
            "Alerts derived"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_metrics_creation() {
        let metrics = DiagnosticsMetrics::new();

        metrics.observe_assemble_latency(0.004);
        metrics.observe_inference_latency("failure_model", 0.0002);
        metrics.record_snapshot(0.42, 3, 120);
        metrics.inc_diagnostics_error("DATA_UNAVAILABLE");
        metrics.inc_alert("critical");
        metrics.set_model_info("failure_model", "classifier", 9);

        let inner = metrics.inner();
        assert!(inner.snapshots_assembled.get() >= 1);
        assert!(inner.alerts_emitted.with_label_values(&["critical"]).get() >= 1);
    }

    #[test]
    fn test_handles_share_registry() {
        let a = DiagnosticsMetrics::new();
        let b = a.clone();
        let before = b.inner().diagnostics_errors.with_label_values(&["FEATURE_MISMATCH"]).get();
        a.inc_diagnostics_error("FEATURE_MISMATCH");
        let after = b.inner().diagnostics_errors.with_label_values(&["FEATURE_MISMATCH"]).get();
        assert!(after > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance, "test-instance");
    }
}
