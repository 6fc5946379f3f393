//! Diagnostics library for vehicle health prediction
//!
//! This crate provides the core functionality for:
//! - Reading the append-only sensor log
//! - Feature engineering consistent with model training
//! - Failure-risk and service-demand inference
//! - Threshold-based alert derivation
//! - Health checks and observability

pub mod alerts;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use alerts::{Alert, AlertRuleSet, AlertSeverity, AlertStatus};
pub use dataset::DatasetReader;
pub use diagnostics::{ArtifactPaths, DiagnosticsService, LoadFailure, LoadedModels, ModelState};
pub use error::DiagnosticsError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{DiagnosticsMetrics, StructuredLogger};
