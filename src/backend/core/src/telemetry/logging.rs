//! Structured logging with JSON/pretty formats and secret redaction.
//!
//! - JSON format for production environments
//! - Pretty format for development
//! - Per-module log level configuration
//! - Field-name based redaction for secrets that end up in rendered output

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Global redactor instance.
static REDACTOR: OnceLock<SensitiveFieldRedactor> = OnceLock::new();

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,

    /// Per-module log levels, e.g. `lectern_core::rbac = "debug"`
    #[serde(default)]
    pub module_levels: HashMap<String, String>,

    /// Whether to include file/line information
    #[serde(default = "default_include_location")]
    pub include_location: bool,

    /// Whether to include target (module path)
    #[serde(default = "default_include_target")]
    pub include_target: bool,

    #[serde(default)]
    pub redaction: RedactionConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            module_levels: HashMap::new(),
            include_location: default_include_location(),
            include_target: default_include_target(),
            redaction: RedactionConfig::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    /// Single-line format, used by the CLI
    Compact,
}

/// Configuration for secret redaction.
#[derive(Debug, Clone, Deserialize)]
pub struct RedactionConfig {
    #[serde(default = "default_redaction_enabled")]
    pub enabled: bool,

    /// Field names to redact (case-insensitive substring match)
    #[serde(default = "default_redacted_fields")]
    pub field_names: Vec<String>,

    #[serde(default = "default_redaction_replacement")]
    pub replacement: String,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: default_redaction_enabled(),
            field_names: default_redacted_fields(),
            replacement: default_redaction_replacement(),
        }
    }
}

/// Redacts values of sensitive fields, such as the session signing secret.
#[derive(Debug, Clone)]
pub struct SensitiveFieldRedactor {
    field_names: Vec<String>,
    replacement: String,
    enabled: bool,
}

impl SensitiveFieldRedactor {
    pub fn new(config: &RedactionConfig) -> Self {
        Self {
            field_names: config.field_names.iter().map(|s| s.to_lowercase()).collect(),
            replacement: config.replacement.clone(),
            enabled: config.enabled,
        }
    }

    pub fn should_redact_field(&self, field_name: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let lower = field_name.to_lowercase();
        self.field_names.iter().any(|f| lower.contains(f.as_str()))
    }

    /// Redact a field value when its name is sensitive.
    pub fn redact(&self, field_name: &str, value: &str) -> String {
        if self.should_redact_field(field_name) {
            self.replacement.clone()
        } else {
            value.to_string()
        }
    }

    /// Walk a JSON document and redact every sensitive key in place.
    pub fn redact_json(&self, value: &mut serde_json::Value) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, field) in map.iter_mut() {
                    if self.should_redact_field(key) && !field.is_null() {
                        *field = serde_json::Value::String(self.replacement.clone());
                    } else {
                        self.redact_json(field);
                    }
                }
            }
            serde_json::Value::Array(items) => items.iter_mut().for_each(|v| self.redact_json(v)),
            _ => {}
        }
    }

    /// The redactor installed by [`init_logging`], or the default one.
    pub fn global() -> &'static SensitiveFieldRedactor {
        REDACTOR.get_or_init(|| SensitiveFieldRedactor::new(&RedactionConfig::default()))
    }
}

// Default value functions
fn default_log_level() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
}

fn default_include_location() -> bool {
    true
}

fn default_include_target() -> bool {
    true
}

fn default_redaction_enabled() -> bool {
    true
}

fn default_redaction_replacement() -> String {
    "[REDACTED]".to_string()
}

fn default_redacted_fields() -> Vec<String> {
    ["secret", "password", "token", "authorization"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Initialize the logging subsystem.
///
/// In `development` a JSON format is swapped for pretty output unless the
/// format was set to something else explicitly.
///
/// # Errors
///
/// Returns an error if a filter directive is invalid or a global subscriber
/// is already installed.
pub fn init_logging(config: &LoggingConfig, environment: &str) -> anyhow::Result<()> {
    let _ = REDACTOR.set(SensitiveFieldRedactor::new(&config.redaction));

    let mut filter = EnvFilter::try_new(&config.level)?;
    for (module, level) in &config.module_levels {
        filter = filter.add_directive(format!("{}={}", module, level).parse()?);
    }

    let format = if environment == "development" && config.format == LogFormat::Json {
        &LogFormat::Pretty
    } else {
        &config.format
    };

    match format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_redaction() {
        let redactor = SensitiveFieldRedactor::new(&RedactionConfig::default());

        assert!(redactor.should_redact_field("secret"));
        assert!(redactor.should_redact_field("SESSION_SECRET"));
        assert!(redactor.should_redact_field("access_token"));
        assert!(!redactor.should_redact_field("issuer"));
        assert_eq!(redactor.redact("issuer", "lectern"), "lectern");
        assert_eq!(redactor.redact("secret", "hunter2"), "[REDACTED]");
    }

    #[test]
    fn test_redact_json_document() {
        let redactor = SensitiveFieldRedactor::new(&RedactionConfig::default());
        let mut doc = serde_json::json!({
            "session": { "secret": "hunter2", "issuer": "lectern", "ttl_secs": 3600 },
            "catalog": { "path": null },
        });
        redactor.redact_json(&mut doc);

        assert_eq!(doc["session"]["secret"], "[REDACTED]");
        assert_eq!(doc["session"]["issuer"], "lectern");
        assert!(doc["catalog"]["path"].is_null());
    }

    #[test]
    fn test_disabled_redaction() {
        let redactor = SensitiveFieldRedactor::new(&RedactionConfig {
            enabled: false,
            ..RedactionConfig::default()
        });
        assert_eq!(redactor.redact("secret", "hunter2"), "hunter2");
    }

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.redaction.enabled);
    }
}
