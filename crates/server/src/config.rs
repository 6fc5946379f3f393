//! Server configuration

use anyhow::{Context, Result};
use diagnostics_core::predictor::{UnknownCategoryPolicy, DEFAULT_SENTINEL_CODE};
use diagnostics_core::{AlertRuleSet, ArtifactPaths};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable prefix, e.g. `VHD_API_PORT`
const ENV_PREFIX: &str = "VHD";

/// Optional config file, any format the `config` crate understands
const CONFIG_FILE: &str = "config/diagnostics";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Sensor log CSV
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Failure classifier manifest
    #[serde(default = "default_failure_model_path")]
    pub failure_model_path: PathBuf,

    /// Service-demand model manifest
    #[serde(default = "default_service_model_path")]
    pub service_model_path: PathBuf,

    /// Driving pattern encoder artifact
    #[serde(default = "default_encoder_path")]
    pub encoder_path: PathBuf,

    /// `reject` or `sentinel`
    #[serde(default)]
    pub unknown_category: UnknownCategoryMode,

    /// Code used for unseen categories when `unknown_category = sentinel`
    #[serde(default = "default_sentinel")]
    pub unknown_category_sentinel: i64,

    /// `threshold` or `probability`
    #[serde(default)]
    pub alert_rule_set: AlertRuleSet,
}

/// How unseen driving patterns are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCategoryMode {
    #[default]
    Reject,
    /// Use `unknown_category_sentinel`
    Sentinel,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8000
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/vehicle_sensor_log.csv")
}

fn default_failure_model_path() -> PathBuf {
    PathBuf::from("models/failure_model.json")
}

fn default_service_model_path() -> PathBuf {
    PathBuf::from("models/service_demand_model.json")
}

fn default_encoder_path() -> PathBuf {
    PathBuf::from("models/driving_pattern_encoder.json")
}

fn default_sentinel() -> i64 {
    DEFAULT_SENTINEL_CODE
}

impl ServerConfig {
    /// Load configuration from the optional config file and environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        config.try_deserialize().context("Invalid configuration")
    }

    pub fn unknown_category_policy(&self) -> UnknownCategoryPolicy {
        match self.unknown_category {
            UnknownCategoryMode::Reject => UnknownCategoryPolicy::Reject,
            UnknownCategoryMode::Sentinel => {
                UnknownCategoryPolicy::Sentinel(self.unknown_category_sentinel)
            }
        }
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            failure_model: self.failure_model_path.clone(),
            service_model: self.service_model_path.clone(),
            encoder: self.encoder_path.clone(),
            unknown_category: self.unknown_category_policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(overrides: &[(&str, &str)]) -> Result<ServerConfig> {
        let mut builder = config::Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        ServerConfig::from_config(builder.build()?)
    }

    #[test]
    fn test_defaults() {
        let config = build(&[]).unwrap();
        assert_eq!(config.api_port, 8000);
        assert_eq!(config.dataset_path, PathBuf::from("data/vehicle_sensor_log.csv"));
        assert_eq!(config.unknown_category_policy(), UnknownCategoryPolicy::Reject);
        assert_eq!(config.alert_rule_set, AlertRuleSet::Threshold);
    }

    #[test]
    fn test_overrides() {
        let config = build(&[
            ("api_port", "9100"),
            ("dataset_path", "/srv/log.csv"),
            ("unknown_category", "sentinel"),
            ("unknown_category_sentinel", "99"),
            ("alert_rule_set", "probability"),
        ])
        .unwrap();

        assert_eq!(config.api_port, 9100);
        assert_eq!(config.dataset_path, PathBuf::from("/srv/log.csv"));
        assert_eq!(
            config.unknown_category_policy(),
            UnknownCategoryPolicy::Sentinel(99)
        );
        assert_eq!(config.alert_rule_set, AlertRuleSet::Probability);

        let paths = config.artifact_paths();
        assert_eq!(paths.unknown_category, UnknownCategoryPolicy::Sentinel(99));
    }

    #[test]
    fn test_invalid_rule_set_rejected() {
        let err = build(&[("alert_rule_set", "both")]).unwrap_err();
        assert!(format!("{:#}", err).contains("both"));
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let err = build(&[("unknown_category", "guess")]).unwrap_err();
        assert!(format!("{:#}", err).contains("guess"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(build(&[("api_port", "not-a-port")]).is_err());
    }
}
