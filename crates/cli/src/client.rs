//! API client for communicating with the diagnostics server

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the diagnostics server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(path).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, describe_error(&body));
        }

        response.json().await.context("Failed to parse response")
    }

    /// GET a health or readiness endpoint, which answers 503 with a normal body when not OK
    pub async fn get_status<T: DeserializeOwned>(&self, path: &str) -> Result<(bool, T)> {
        let response = self.send(path).await?;
        let status = response.status();

        if !status.is_success() && status != StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, describe_error(&body));
        }

        let body = response.json().await.context("Failed to parse response")?;
        Ok((status.is_success(), body))
    }

    pub async fn diagnostics(&self) -> Result<Snapshot> {
        self.get("api/diagnostics").await
    }

    pub async fn alerts(&self) -> Result<Vec<Alert>> {
        self.get("api/alerts").await
    }

    async fn send(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.base_url.join(path).context("Invalid path")?;

        self.client
            .get(url)
            .send()
            .await
            .context("Failed to send request")
    }
}

/// Render a server error body, preferring the structured `{error, code}` form
fn describe_error(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error,
            code: Some(code),
        }) => format!("{} ({})", error, code),
        Ok(ErrorResponse { error, code: None }) => error,
        Err(_) => body.to_string(),
    }
}

// API response types

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub vehicle_id: String,
    pub timestamp: String,
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub status: String,
    pub predicted_failure_window: String,
    pub ai_confidence: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "vehicle_id": "V7", "timestamp": "2024-02-05T09:00:00Z",
        "final_risk": 0.93, "service_demand": 4,
        "engine_temp": 105.0, "vibration": 0.52, "oil_pressure": 38.5,
        "rpm": 3400, "mileage": 30410, "past_failures": 2,
        "driving_pattern": "aggressive", "stress_index": 85.0, "dtc_code": "P0217"
    }"#;

    #[tokio::test]
    async fn test_diagnostics_parses_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/diagnostics")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SNAPSHOT)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let snapshot = client.diagnostics().await.unwrap();

        mock.assert_async().await;
        assert_eq!(snapshot.vehicle_id, "V7");
        assert_eq!(snapshot.final_risk, 0.93);
        assert_eq!(snapshot.service_demand, 4);
    }

    #[tokio::test]
    async fn test_structured_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/diagnostics")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "dataset contains no records", "code": "INSUFFICIENT_DATA"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.diagnostics().await.unwrap_err().to_string();

        assert!(err.contains("404"));
        assert!(err.contains("INSUFFICIENT_DATA"));
        assert!(err.contains("dataset contains no records"));
    }

    #[tokio::test]
    async fn test_alerts_parse_camel_case() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/alerts")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id": "vehicle-ok-001", "title": "Vehicle Operating Normally",
                     "description": "No critical issues detected by AI diagnostics.",
                     "severity": "low", "status": "resolved",
                     "predictedFailureWindow": "N/A", "aiConfidence": 95}]"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let alerts = client.alerts().await.unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].predicted_failure_window, "N/A");
        assert_eq!(alerts[0].ai_confidence, 95);
    }

    #[tokio::test]
    async fn test_get_status_accepts_service_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/readyz")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ready": false, "reason": "Unhealthy components: encoder"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let (ok, readiness): (bool, Readiness) = client.get_status("readyz").await.unwrap();

        assert!(!ok);
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Unhealthy components: encoder"));
    }

    #[tokio::test]
    async fn test_get_status_rejects_other_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let result: Result<(bool, HealthStatus)> = client.get_status("healthz").await;
        assert!(result.unwrap_err().to_string().contains("boom"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[test]
    fn test_describe_error_falls_back_to_raw_body() {
        assert_eq!(describe_error("plain text"), "plain text");
        assert_eq!(
            describe_error(r#"{"error": "model unavailable: x", "code": "MODEL_UNAVAILABLE"}"#),
            "model unavailable: x (MODEL_UNAVAILABLE)"
        );
    }
}
