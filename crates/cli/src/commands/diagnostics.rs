//! Diagnostics snapshot command

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, Snapshot};
use crate::output::{color_risk, print_json, OutputFormat};

/// Show the latest diagnostics snapshot
pub async fn show_diagnostics(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let snapshot = client.diagnostics().await?;

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => print_snapshot(&snapshot),
    }

    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    println!("{}", "Vehicle Diagnostics".bold());
    println!("{}", "=".repeat(50));
    println!("Vehicle:                {}", snapshot.vehicle_id.cyan());
    println!("Recorded at:            {}", snapshot.timestamp);
    println!();

    println!("{}", "Predictions".bold());
    println!("{}", "-".repeat(50));
    println!("Failure risk:           {}", color_risk(snapshot.final_risk));
    println!("Service demand:         {}", snapshot.service_demand);
    println!();

    println!("{}", "Latest Readings".bold());
    println!("{}", "-".repeat(50));
    println!("Engine temp:            {:.1} °C", snapshot.engine_temp);
    println!("Oil pressure:           {:.1}", snapshot.oil_pressure);
    println!("Vibration:              {:.2}", snapshot.vibration);
    println!("RPM:                    {}", snapshot.rpm);
    println!("Mileage:                {}", snapshot.mileage);
    println!("Past failures:          {}", snapshot.past_failures);
    println!("Driving pattern:        {}", snapshot.driving_pattern);
    println!("Stress index:           {:.1}", snapshot.stress_index);
    println!("DTC:                    {}", snapshot.dtc_code);
}
