//! Vehicle health diagnostics server
//!
//! Loads the trained models once at startup and serves the latest
//! diagnostics snapshot and derived alerts over HTTP.

use anyhow::Result;
use diagnostics_core::{
    health::HealthRegistry,
    observability::{DiagnosticsMetrics, StructuredLogger},
    DatasetReader, DiagnosticsService, ModelState,
};
use diagnostics_server::{api, config};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting diagnostics-server");

    let config = config::ServerConfig::load()?;
    let rule_set = config.alert_rule_set;
    info!(instance = %config.instance_name, port = config.api_port, "Server configured");

    let metrics = DiagnosticsMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(
        SERVER_VERSION,
        &config.dataset_path.display().to_string(),
        rule_set.as_str(),
    );

    // Load failures keep the process up; diagnostics then report MODEL_UNAVAILABLE
    let models = ModelState::load(&config.artifact_paths());
    let health_registry = HealthRegistry::for_models(&models);
    match &models {
        ModelState::Ready(loaded) => {
            for model in [&loaded.failure, &loaded.service_demand] {
                metrics.set_model_info(
                    model.name(),
                    model.kind().as_str(),
                    model.feature_names().len(),
                );
            }
            logger.log_models_loaded(
                loaded.failure.name(),
                loaded.service_demand.name(),
                loaded.features.encoder().classes().len(),
            );
        }
        ModelState::Unavailable(failures) => {
            for failure in failures {
                logger.log_model_load_failed(failure.component, &failure.reason);
            }
        }
    }

    let reader = DatasetReader::new(&config.dataset_path);
    health_registry.check_dataset(reader.path()).await;

    let service = Arc::new(DiagnosticsService::new(reader, models, rule_set));
    let app_state = Arc::new(api::AppState::new(
        service,
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    health_registry.set_ready(true).await;

    api::serve(config.api_port, app_state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
    })
    .await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
