//! Feature engineering for model inference
//!
//! Derives the same features the models were trained on: the encoded driving
//! pattern, trailing rolling means of the core engine signals and a day index
//! relative to the start of the log. The whole history is processed on every
//! call, so leading positions without a full window are back-filled from the
//! first complete window rather than computed from partial data.

use super::encoder::CategoryEncoder;
use crate::error::{DiagnosticsError, Result};
use crate::models::{EngineeredFeatures, SensorRecord};

/// Trailing window used for the `*_avg_3` features
pub const ROLLING_WINDOW: usize = 3;

/// Derives [`EngineeredFeatures`] from an ordered record sequence
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    encoder: CategoryEncoder,
    window_size: usize,
}

impl FeatureEngine {
    pub fn new(encoder: CategoryEncoder) -> Self {
        Self {
            encoder,
            window_size: ROLLING_WINDOW,
        }
    }

    pub fn encoder(&self) -> &CategoryEncoder {
        &self.encoder
    }

    /// Engineer features for every record, aligned 1:1 with the input
    pub fn engineer(&self, records: &[SensorRecord]) -> Result<Vec<EngineeredFeatures>> {
        if records.is_empty() {
            return Err(DiagnosticsError::InsufficientData);
        }

        let encoded = records
            .iter()
            .map(|r| self.encoder.transform(&r.driving_pattern))
            .collect::<Result<Vec<_>>>()?;

        let engine_temp = self.rolling_column(records, |r| r.engine_temp);
        let oil_pressure = self.rolling_column(records, |r| r.oil_pressure);
        let vibration = self.rolling_column(records, |r| r.vibration);
        let day_index = day_indices(records);

        Ok((0..records.len())
            .map(|i| EngineeredFeatures {
                driving_pattern_encoded: encoded[i],
                engine_temp_avg_3: engine_temp[i],
                oil_pressure_avg_3: oil_pressure[i],
                vibration_avg_3: vibration[i],
                day_index: day_index[i],
            })
            .collect())
    }

    fn rolling_column(&self, records: &[SensorRecord], field: impl Fn(&SensorRecord) -> f64) -> Vec<f64> {
        let values: Vec<f64> = records.iter().map(field).collect();
        backfill(&rolling_mean(&values, self.window_size), &values)
    }
}

/// Trailing mean over `window` values; `None` until a full window exists
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                let slice = &values[i + 1 - window..=i];
                Some(slice.iter().sum::<f64>() / window as f64)
            }
        })
        .collect()
}

/// Replace leading `None`s with the first defined value after them.
///
/// When no position is defined at all (sequence shorter than the window) every
/// position takes the mean of `raw`, which for a single record is that record.
pub fn backfill(column: &[Option<f64>], raw: &[f64]) -> Vec<f64> {
    let first_defined = column.iter().flatten().copied().next();
    let fill = first_defined.unwrap_or_else(|| {
        if raw.is_empty() {
            0.0
        } else {
            raw.iter().sum::<f64>() / raw.len() as f64
        }
    });

    let mut out = Vec::with_capacity(column.len());
    let mut next = fill;
    // Walk backwards so each gap takes the nearest later value
    for value in column.iter().rev() {
        if let Some(v) = value {
            next = *v;
        }
        out.push(value.unwrap_or(next));
    }
    out.reverse();
    out
}

/// Whole days between each record and the earliest timestamp in the sequence
fn day_indices(records: &[SensorRecord]) -> Vec<i64> {
    let Some(start) = records.iter().map(|r| r.timestamp).min() else {
        return Vec::new();
    };
    records
        .iter()
        .map(|r| (r.timestamp - start).num_days())
        .collect()
}
