//! Role catalog inspection.

use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use lectern_core::rbac::{ResourceId, Role, RoleScope, RoleSlug};

use crate::context::Context;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum RolesCommands {
    /// List every role in the catalog
    List,

    /// Show one role's grants
    Show {
        /// Role slug (e.g. alpha-manager)
        slug: String,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct RoleRow {
    #[tabled(rename = "Slug")]
    slug: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Resources")]
    resources: usize,
}

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct GrantRow {
    #[tabled(rename = "Resource")]
    pub resource: String,
    #[tabled(rename = "Operations")]
    pub operations: String,
}

fn scope_name(scope: &RoleScope) -> &'static str {
    match scope {
        RoleScope::Global => "global",
        RoleScope::Manager { .. } => "manager",
        RoleScope::Project => "project",
    }
}

fn row(role: &Role) -> RoleRow {
    RoleRow {
        slug: role.slug.to_string(),
        label: role.label.clone(),
        scope: scope_name(&role.scope).to_string(),
        project: role
            .bound_project()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string()),
        resources: role.permissions.iter().count(),
    }
}

pub(crate) fn grant_rows<F>(grants: F) -> Vec<GrantRow>
where
    F: Fn(ResourceId) -> String,
{
    ResourceId::ALL
        .into_iter()
        .map(|resource| GrantRow {
            resource: resource.to_string(),
            operations: grants(resource),
        })
        .filter(|row| !row.operations.is_empty())
        .collect()
}

pub async fn execute(cmd: RolesCommands, ctx: &Context, format: OutputFormat) -> Result<()> {
    let registry = ctx.engine.registry();

    match cmd {
        RolesCommands::List => {
            let rows: Vec<RoleRow> = registry.roles().map(row).collect();
            output::print_list(&rows, format)?;
        }

        RolesCommands::Show { slug } => {
            let Some(role) = registry.lookup(&RoleSlug::new(slug.as_str())) else {
                bail!("Unknown role: {}", slug);
            };

            match format {
                OutputFormat::Table => {
                    output::print_header(&format!("Role: {}", role.label));
                    output::print_detail("Slug", role.slug.as_str());
                    output::print_detail("Scope", scope_name(&role.scope));
                    if let Some(project) = role.bound_project() {
                        output::print_detail("Project", project.as_str());
                    }
                    if !role.description.is_empty() {
                        output::print_detail("Description", &role.description);
                    }
                    println!();
                    output::print_list(&grant_rows(|r| role.grants(r).to_string()), format)?;
                }
                _ => output::print_item(role, format)?,
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::rbac::PredefinedRole;

    #[test]
    fn test_row_for_manager_role() {
        let role = PredefinedRole::Manager(lectern_core::rbac::ProjectSlug::Gamma).to_role();
        let row = row(&role);
        assert_eq!(row.slug, "gamma-manager");
        assert_eq!(row.scope, "manager");
        assert_eq!(row.project, "gamma");
    }

    #[test]
    fn test_grant_rows_skip_empty_resources() {
        let role = PredefinedRole::Editor.to_role();
        let rows = grant_rows(|r| role.grants(r).to_string());
        let resources: Vec<_> = rows.iter().map(|r| r.resource.as_str()).collect();
        assert_eq!(resources, vec!["articles", "pages", "media"]);
        assert_eq!(rows[0].operations, "read,update");
    }
}
