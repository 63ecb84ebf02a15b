//! Configuration management.
//!
//! Sources, lowest precedence first: an optional file, then `LECTERN__*`
//! environment variables (`LECTERN__SESSION__TTL_SECS=600`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::rbac::models::RoleSlug;
use crate::rbac::visibility::AdminViewMode;
use crate::telemetry::{LogFormat, LoggingConfig};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Role catalog source
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Admin-UI visibility policy
    #[serde(default)]
    pub visibility: VisibilityConfig,

    /// Session snapshot signing
    #[serde(default)]
    pub session: SessionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// TOML or JSON catalog file; the built-in catalog when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Roles given to newly provisioned users. Each must exist in the catalog.
    #[serde(default)]
    pub default_roles: Vec<RoleSlug>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisibilityConfig {
    /// Whether `exclude_from_admin_view` also hides resources from admins
    #[serde(default)]
    pub admin_view_mode: AdminViewMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HMAC secret for session tokens
    #[serde(default)]
    pub secret: Option<String>,

    /// Token lifetime in seconds
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,

    /// Issuer claim
    #[serde(default = "default_session_issuer")]
    pub issuer: String,

    /// Clock skew tolerance in seconds
    #[serde(default = "default_session_leeway")]
    pub leeway_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_secs: default_session_ttl(),
            issuer: default_session_issuer(),
            leeway_secs: default_session_leeway(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

impl ObservabilityConfig {
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: if self.json_logging {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            ..LoggingConfig::default()
        }
    }
}

// Default value functions
fn default_session_ttl() -> u64 { 3600 }
fn default_session_issuer() -> String { "lectern".to_string() }
fn default_session_leeway() -> u64 { 60 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("LECTERN").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LECTERN").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.catalog.path.is_none());
        assert_eq!(config.visibility.admin_view_mode, AdminViewMode::AdminsSeeAll);
        assert_eq!(config.session.ttl_secs, 3600);
        assert_eq!(config.session.issuer, "lectern");
        assert_eq!(config.observability.logging().format, LogFormat::Json);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[catalog]
default_roles = ["viewer"]

[visibility]
admin_view_mode = "hide_from_everyone"

[session]
secret = "s3cret"
ttl_secs = 600

[observability]
json_logging = false
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.catalog.default_roles, vec![RoleSlug::new("viewer")]);
        assert_eq!(config.visibility.admin_view_mode, AdminViewMode::HideFromEveryone);
        assert_eq!(config.session.secret.as_deref(), Some("s3cret"));
        assert_eq!(config.session.ttl_secs, 600);
        assert_eq!(config.session.leeway_secs, 60);
        assert_eq!(config.observability.logging().format, LogFormat::Pretty);
    }
}
