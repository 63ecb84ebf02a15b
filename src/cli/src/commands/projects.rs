//! Project (tenant) inspection.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

use lectern_core::rbac::{ProjectScoped, RoleScope};

use crate::context::Context;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum ProjectsCommands {
    /// List catalog projects and the roles bound to them
    List,

    /// Show which projects a user may select
    Available {
        /// User record (JSON)
        #[arg(short, long)]
        user: PathBuf,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct ProjectRow {
    #[tabled(rename = "Project")]
    slug: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Project Role")]
    project_role: String,
    #[tabled(rename = "Managers")]
    managers: String,
}

#[derive(Debug, Serialize)]
struct Availability {
    user: String,
    available: Vec<String>,
    current: Option<String>,
    stored_selection: Option<String>,
}

pub async fn execute(cmd: ProjectsCommands, ctx: &Context, format: OutputFormat) -> Result<()> {
    let registry = ctx.engine.registry();

    match cmd {
        ProjectsCommands::List => {
            let rows: Vec<ProjectRow> = registry
                .projects()
                .iter()
                .map(|project| ProjectRow {
                    slug: project.slug.to_string(),
                    label: project.label.clone(),
                    project_role: registry
                        .project_role(project.slug)
                        .map(|r| r.slug.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    managers: registry
                        .roles()
                        .filter(|r| r.scope == RoleScope::Manager { project: project.slug })
                        .map(|r| r.slug.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                })
                .collect();
            output::print_list(&rows, format)?;
        }

        ProjectsCommands::Available { user } => {
            let user = ctx.load_user(&user).await?;
            let permissions = ctx.engine.resolve(&user);
            let scope = ctx.engine.projects();

            let availability = Availability {
                user: user.id().to_string(),
                available: scope
                    .available(&user, &permissions)
                    .iter()
                    .map(|p| p.to_string())
                    .collect(),
                current: scope.current(&user, &permissions).map(|p| p.to_string()),
                stored_selection: user.current_project().map(|p| p.to_string()),
            };

            match format {
                OutputFormat::Table => {
                    output::print_header(&format!("Projects for {}", availability.user));
                    output::print_detail("Available", &availability.available.join(", "));
                    output::print_detail(
                        "Current",
                        availability.current.as_deref().unwrap_or("(admin view)"),
                    );
                    if availability.current != availability.stored_selection {
                        output::print_info(
                            "Stored selection is no longer permitted and reads as unset",
                        );
                    }
                }
                _ => output::print_item(&availability, format)?,
            }
        }
    }

    Ok(())
}
