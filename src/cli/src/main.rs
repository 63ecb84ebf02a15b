//! Lectern CLI - offline inspection of access-control policy.
//!
//! Loads the same configuration and role catalog as the service and answers
//! authorization and visibility questions for user records on disk.

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{check, config, projects, resolve, roles, visibility};
use context::Context;
use lectern_core::telemetry::{init_telemetry, LogFormat, LoggingConfig, TelemetryConfig};
use output::OutputFormat;

/// Lectern - access-control and visibility-policy engine CLI
#[derive(Parser)]
#[command(
    name = "lectern",
    version,
    about = "Lectern - access-control and visibility-policy engine",
    long_about = "Inspect roles and projects, resolve user permissions, \
                  and check authorization and admin-UI visibility decisions.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "LECTERN_CONFIG")]
    config: Option<PathBuf>,

    /// Role catalog file, overriding catalog.path
    #[arg(long, global = true, env = "LECTERN_CATALOG")]
    catalog: Option<PathBuf>,

    /// Log level for diagnostics on stderr
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Role catalog inspection
    #[command(subcommand)]
    Roles(roles::RolesCommands),

    /// Project inspection
    #[command(subcommand)]
    Projects(projects::ProjectsCommands),

    /// Resolve a user's merged permissions
    Resolve(resolve::ResolveArgs),

    /// Check one authorization decision
    Check(check::CheckArgs),

    /// Check admin-UI visibility of a resource
    Visibility(visibility::VisibilityArgs),

    /// Configuration inspection
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    init_telemetry(&TelemetryConfig {
        service_name: "lectern-cli".to_string(),
        logging: LoggingConfig {
            level: cli.log_level.clone(),
            format: LogFormat::Compact,
            include_location: false,
            ..LoggingConfig::default()
        },
        ..TelemetryConfig::default()
    })?;

    let format = cli.output;
    let result = match Context::load(cli.config.as_deref(), cli.catalog.clone()) {
        Ok(ctx) => match cli.command {
            Commands::Roles(cmd) => roles::execute(cmd, &ctx, format).await,
            Commands::Projects(cmd) => projects::execute(cmd, &ctx, format).await,
            Commands::Resolve(args) => resolve::execute(args, &ctx, format).await,
            Commands::Check(args) => check::execute(args, &ctx, format).await,
            Commands::Visibility(args) => visibility::execute(args, &ctx, format).await,
            Commands::Config(cmd) => config::execute(cmd, &ctx, format).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
