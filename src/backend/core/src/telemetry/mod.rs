//! Telemetry: structured logging and decision metrics.
//!
//! # Example
//!
//! ```rust,no_run
//! use lectern_core::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::default();
//! init_telemetry(&config).expect("Failed to initialize telemetry");
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LoggingConfig, RedactionConfig, SensitiveFieldRedactor};
pub use metrics::{describe_metrics, AuthzMetrics};

use serde::Deserialize;

/// Unified telemetry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Environment (development, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            environment: default_environment(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "lectern".to_string()
}

fn default_environment() -> String {
    std::env::var("LECTERN_ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
}

/// Install the logging subscriber and describe the decision metrics.
///
/// Call once at startup.
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    describe_metrics();
    init_logging(&config.logging, &config.environment)?;
    ::tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        "Telemetry initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "lectern");
        assert!(!config.environment.is_empty());
    }

    #[test]
    fn test_init_telemetry_installs_once() {
        let config = TelemetryConfig {
            service_name: "lectern-cli".to_string(),
            logging: LoggingConfig {
                level: "warn".to_string(),
                format: LogFormat::Compact,
                include_location: false,
                ..LoggingConfig::default()
            },
            ..TelemetryConfig::default()
        };
        assert!(init_telemetry(&config).is_ok());
        // The global subscriber is already set.
        assert!(init_telemetry(&config).is_err());
    }
}
