//! Configuration inspection commands.

use anyhow::Result;
use clap::Subcommand;

use lectern_core::telemetry::SensitiveFieldRedactor;

use crate::context::Context;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration, secrets redacted
    Show,

    /// Load and validate the role catalog
    Validate,
}

/// Effective configuration as JSON with sensitive fields redacted.
fn redacted(ctx: &Context) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(&ctx.config)?;
    SensitiveFieldRedactor::global().redact_json(&mut value);
    Ok(value)
}

pub async fn execute(cmd: ConfigCommands, ctx: &Context, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let value = redacted(ctx)?;
            match format {
                OutputFormat::Table => {
                    output::print_header("Configuration");
                    if let serde_json::Value::Object(sections) = &value {
                        for (section, fields) in sections {
                            if let serde_json::Value::Object(fields) = fields {
                                for (key, field) in fields {
                                    let name = format!("{}.{}", section, key);
                                    output::print_detail(&name, &field.to_string());
                                }
                            }
                        }
                    }
                }
                _ => output::print_item(&value, format)?,
            }
        }

        // Context::load already validated the catalog and default roles.
        ConfigCommands::Validate => {
            let registry = ctx.engine.registry();
            let source = ctx
                .config
                .catalog
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in".to_string());
            match format {
                OutputFormat::Table => {
                    output::print_info(&format!(
                        "Catalog {} is valid: {} roles across {} projects",
                        source,
                        registry.len(),
                        registry.projects().len()
                    ));
                }
                _ => output::print_item(
                    &serde_json::json!({
                        "catalog": source,
                        "valid": true,
                        "roles": registry.len(),
                        "projects": registry.projects().len(),
                    }),
                    format,
                )?,
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::config::Config;
    use lectern_core::AccessEngine;

    #[test]
    fn test_show_redacts_session_secret() {
        let mut config = Config::default();
        config.session.secret = Some("hunter2".to_string());
        let ctx = Context {
            config,
            engine: AccessEngine::builtin().unwrap(),
        };

        let value = redacted(&ctx).unwrap();
        assert_eq!(value["session"]["secret"], "[REDACTED]");
        assert_eq!(value["session"]["issuer"], "lectern");
        assert_eq!(value["visibility"]["admin_view_mode"], "admins_see_all");
    }
}
