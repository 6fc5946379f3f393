//! Core data models for vehicle diagnostics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the vehicle sensor log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub vehicle_id: String,
    pub timestamp: DateTime<Utc>,
    pub engine_temp: f64,
    pub oil_pressure: f64,
    pub vibration: f64,
    pub rpm: i64,
    pub mileage: i64,
    pub past_failures: i64,
    pub driving_pattern: String,
    pub stress_index: f64,
    pub dtc_code: String,
}

/// Features derived from a record and the records preceding it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineeredFeatures {
    pub driving_pattern_encoded: i64,
    pub engine_temp_avg_3: f64,
    pub oil_pressure_avg_3: f64,
    pub vibration_avg_3: f64,
    /// Whole days since the earliest timestamp in the sequence
    pub day_index: i64,
}

/// Per-request inference result for the most recent observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    pub vehicle_id: String,
    pub timestamp: DateTime<Utc>,
    /// Failure probability rounded to 3 decimals
    pub final_risk: f64,
    pub service_demand: i64,
    pub engine_temp: f64,
    pub vibration: f64,
    pub oil_pressure: f64,
    pub rpm: i64,
    pub mileage: i64,
    pub past_failures: i64,
    pub driving_pattern: String,
    pub stress_index: f64,
    pub dtc_code: String,
}
