//! Sensor log reader
//!
//! Loads the append-only CSV sensor log in file order. Nothing is cached: each
//! call re-reads the whole file so the last row is always the latest append.

use crate::error::{DiagnosticsError, Result};
use crate::models::SensorRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Naive layouts accepted besides RFC 3339, interpreted as UTC
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Columns every sensor log must carry, in any order
pub const REQUIRED_COLUMNS: &[&str] = &[
    "vehicle_id",
    "timestamp",
    "engine_temp",
    "oil_pressure",
    "vibration",
    "rpm",
    "mileage",
    "past_failures",
    "driving_pattern",
    "stress_index",
    "dtc_code",
];

/// Row as it appears on disk, before timestamp parsing
#[derive(Debug, Deserialize)]
struct RawRow {
    vehicle_id: String,
    timestamp: String,
    engine_temp: f64,
    oil_pressure: f64,
    vibration: f64,
    rpm: i64,
    mileage: i64,
    past_failures: i64,
    driving_pattern: String,
    stress_index: f64,
    dtc_code: String,
}

impl RawRow {
    fn into_record(self, row: u64) -> Result<SensorRecord> {
        let timestamp =
            parse_timestamp(&self.timestamp).ok_or_else(|| DiagnosticsError::DataMalformed {
                row,
                reason: format!("unparsable timestamp '{}'", self.timestamp),
            })?;

        Ok(SensorRecord {
            vehicle_id: self.vehicle_id,
            timestamp,
            engine_temp: self.engine_temp,
            oil_pressure: self.oil_pressure,
            vibration: self.vibration,
            rpm: self.rpm,
            mileage: self.mileage,
            past_failures: self.past_failures,
            driving_pattern: self.driving_pattern,
            stress_index: self.stress_index,
            dtc_code: self.dtc_code,
        })
    }
}

/// Reads the sensor log from a fixed path
#[derive(Debug, Clone)]
pub struct DatasetReader {
    path: PathBuf,
}

impl DatasetReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record in ingestion order
    pub fn read(&self) -> Result<Vec<SensorRecord>> {
        let file = File::open(&self.path).map_err(|source| DiagnosticsError::DataUnavailable {
            path: self.path.clone(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        self.check_header(&mut reader)?;

        let mut records = Vec::new();
        for (idx, row) in reader.deserialize::<RawRow>().enumerate() {
            let row_number = idx as u64 + 1;
            let raw = row.map_err(|e| self.classify_csv_error(e, row_number))?;
            records.push(raw.into_record(row_number)?);
        }

        debug!(path = %self.path.display(), records = records.len(), "Dataset loaded");
        Ok(records)
    }

    /// Read only the most recent record, if any
    pub fn latest(&self) -> Result<Option<SensorRecord>> {
        Ok(self.read()?.pop())
    }

    /// Reject a log whose header is absent or lacks a required column (row 0)
    fn check_header(&self, reader: &mut csv::Reader<File>) -> Result<()> {
        let headers = reader
            .headers()
            .map_err(|e| self.classify_csv_error(e, 0))?;

        if headers.is_empty() {
            return Err(DiagnosticsError::DataMalformed {
                row: 0,
                reason: "missing header row".to_string(),
            });
        }

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .collect();
        if !missing.is_empty() {
            return Err(DiagnosticsError::DataMalformed {
                row: 0,
                reason: format!("missing columns: {}", missing.join(", ")),
            });
        }
        Ok(())
    }

    fn classify_csv_error(&self, err: csv::Error, row: u64) -> DiagnosticsError {
        if err.is_io_error() {
            if let csv::ErrorKind::Io(source) = err.into_kind() {
                return DiagnosticsError::DataUnavailable {
                    path: self.path.clone(),
                    source,
                };
            }
            return DiagnosticsError::DataMalformed {
                row,
                reason: "I/O error while reading".to_string(),
            };
        }
        DiagnosticsError::DataMalformed {
            row,
            reason: err.to_string(),
        }
    }
}

/// Parse a timestamp in any of the layouts the sensor log is known to use
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "vehicle_id,timestamp,engine_temp,oil_pressure,vibration,rpm,mileage,past_failures,driving_pattern,stress_index,dtc_code";

    fn write_csv(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        write!(file, "{}", body).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_reads_rows_in_file_order() {
        let file = write_csv(
            "V1,2024-01-02 08:00:00,92.5,40.1,0.3,2200,51000,1,city,45.0,P0000\n\
             V1,2024-01-01 08:00:00,95.0,39.0,0.4,2400,50900,1,highway,50.0,P0217\n",
        );
        let records = DatasetReader::new(file.path()).read().unwrap();

        assert_eq!(records.len(), 2);
        // Not re-sorted by timestamp
        assert_eq!(records[0].timestamp.day(), 2);
        assert_eq!(records[1].timestamp.day(), 1);
        assert_eq!(records[1].driving_pattern, "highway");
        assert_eq!(records[1].dtc_code, "P0217");
        assert_eq!(records[0].rpm, 2200);
    }

    #[test]
    fn test_latest_is_last_row() {
        let file = write_csv(
            "V1,2024-01-01 08:00:00,92.5,40.1,0.3,2200,51000,1,city,45.0,P0000\n\
             V2,2024-01-02 08:00:00,105.0,39.0,0.4,2400,50900,1,highway,85.0,P0217\n",
        );
        let latest = DatasetReader::new(file.path()).latest().unwrap().unwrap();
        assert_eq!(latest.vehicle_id, "V2");
        assert_eq!(latest.engine_temp, 105.0);
    }

    #[test]
    fn test_rereads_after_append() {
        let mut file = write_csv("V1,2024-01-01,90,40,0.3,2000,1000,0,city,10,P0000\n");
        let reader = DatasetReader::new(file.path());
        assert_eq!(reader.read().unwrap().len(), 1);

        writeln!(file, "V1,2024-01-02,91,40,0.3,2000,1100,0,city,12,P0000").unwrap();
        file.flush().unwrap();

        let records = reader.read().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].mileage, 1100);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = DatasetReader::new("/definitely/not/here.csv").read().unwrap_err();
        assert!(matches!(err, DiagnosticsError::DataUnavailable { .. }));
    }

    #[test]
    fn test_bad_timestamp_is_malformed() {
        let file = write_csv(
            "V1,2024-01-01 08:00:00,92.5,40.1,0.3,2200,51000,1,city,45.0,P0000\n\
             V1,yesterday,92.5,40.1,0.3,2200,51000,1,city,45.0,P0000\n",
        );
        let err = DatasetReader::new(file.path()).read().unwrap_err();
        match err {
            DiagnosticsError::DataMalformed { row, reason } => {
                assert_eq!(row, 2);
                assert!(reason.contains("yesterday"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "vehicle_id,timestamp,engine_temp").unwrap();
        writeln!(file, "V1,2024-01-01,90").unwrap();
        file.flush().unwrap();

        let err = DatasetReader::new(file.path()).read().unwrap_err();
        assert!(matches!(err, DiagnosticsError::DataMalformed { row: 0, .. }));
    }

    #[test]
    fn test_short_header_without_rows_is_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "vehicle_id,timestamp,engine_temp").unwrap();
        file.flush().unwrap();

        let err = DatasetReader::new(file.path()).read().unwrap_err();
        match err {
            DiagnosticsError::DataMalformed { row, reason } => {
                assert_eq!(row, 0);
                assert!(reason.contains("oil_pressure"));
                assert!(reason.contains("dtc_code"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_byte_file_is_malformed() {
        let file = NamedTempFile::new().unwrap();
        let err = DatasetReader::new(file.path()).read().unwrap_err();
        assert!(matches!(err, DiagnosticsError::DataMalformed { row: 0, .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_reordered_header_is_accepted() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timestamp,vehicle_id,engine_temp,oil_pressure,vibration,rpm,mileage,past_failures,driving_pattern,stress_index,dtc_code").unwrap();
        writeln!(file, "2024-01-01,V9,90,40,0.3,2000,1000,0,city,10,P0000").unwrap();
        file.flush().unwrap();

        let records = DatasetReader::new(file.path()).read().unwrap();
        assert_eq!(records[0].vehicle_id, "V9");
    }

    #[test]
    fn test_header_only_is_empty() {
        let file = write_csv("");
        assert!(DatasetReader::new(file.path()).read().unwrap().is_empty());
        assert!(DatasetReader::new(file.path()).latest().unwrap().is_none());
    }

    #[test]
    fn test_timestamp_formats() {
        let rfc = parse_timestamp("2024-03-01T10:30:00+02:00").unwrap();
        assert_eq!(rfc.hour(), 8);

        let spaced = parse_timestamp("2024-03-01 10:30:00").unwrap();
        assert_eq!(spaced.hour(), 10);

        let fractional = parse_timestamp("2024-03-01T10:30:00.250").unwrap();
        assert_eq!(fractional.minute(), 30);

        let date_only = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(date_only.hour(), 0);

        assert!(parse_timestamp("03/01/2024").is_none());
    }
}
