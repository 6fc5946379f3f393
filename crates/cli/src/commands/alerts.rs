//! Alert listing command

use anyhow::Result;
use tabled::Tabled;

use crate::client::{Alert, ApiClient};
use crate::output::{color_severity, color_status, print_json, print_table, OutputFormat, Severity};

/// Row for alerts table
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

impl From<&Alert> for AlertRow {
    fn from(alert: &Alert) -> Self {
        Self {
            severity: color_severity(&alert.severity),
            title: alert.title.clone(),
            status: color_status(&alert.status),
            window: alert.predicted_failure_window.clone(),
            confidence: format!("{}%", alert.ai_confidence),
        }
    }
}

/// Keep alerts at or above `min_severity`; unrecognised severities only pass an unfiltered listing
pub fn filter_by_severity(alerts: Vec<Alert>, min_severity: Option<Severity>) -> Vec<Alert> {
    match min_severity {
        Some(floor) => alerts
            .into_iter()
            .filter(|a| a.severity.parse::<Severity>().is_ok_and(|s| s >= floor))
            .collect(),
        None => alerts,
    }
}

/// List current alerts
pub async fn show_alerts(
    client: &ApiClient,
    min_severity: Option<Severity>,
    format: OutputFormat,
) -> Result<()> {
    let alerts = filter_by_severity(client.alerts().await?, min_severity);

    match format {
        OutputFormat::Json => print_json(&alerts)?,
        OutputFormat::Table => {
            let rows: Vec<AlertRow> = alerts.iter().map(AlertRow::from).collect();
            print_table(&rows, "No alerts");
            for alert in &alerts {
                println!("{}: {}", alert.id, alert.description);
            }
        }
    }

    Ok(())
}
