//! Would this resource be listed in the admin UI for this user?

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use lectern_core::rbac::{admin_only_visibility, ProjectSlug, ResourceId, VisibilityOptions};

use crate::context::Context;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct VisibilityArgs {
    /// User record (JSON)
    #[arg(short, long)]
    user: PathBuf,

    /// Resource (e.g. redirects)
    #[arg(short, long)]
    resource: ResourceId,

    /// Projects the resource belongs to, comma separated
    #[arg(short, long, value_delimiter = ',', default_value = "alpha,beta,gamma")]
    projects: Vec<ProjectSlug>,

    /// Hide the resource in the aggregate admin view
    #[arg(long)]
    exclude_from_admin_view: bool,

    /// Only admins may see the resource
    #[arg(long, conflicts_with = "exclude_from_admin_view")]
    admin_only: bool,
}

#[derive(Debug, Serialize)]
struct VisibilityResult {
    user: String,
    resource: ResourceId,
    hidden: bool,
    mode: String,
}

pub async fn execute(args: VisibilityArgs, ctx: &Context, format: OutputFormat) -> Result<()> {
    let user = ctx.load_user(&args.user).await?;
    let policy = ctx.engine.visibility();

    let hidden = if args.admin_only {
        admin_only_visibility(Some(&user))
    } else {
        let options = VisibilityOptions {
            exclude_from_admin_view: args.exclude_from_admin_view,
        };
        policy.is_hidden(args.resource, &args.projects, &options, Some(&user))
    };

    let result = VisibilityResult {
        user: user.id().to_string(),
        resource: args.resource,
        hidden,
        mode: if args.admin_only {
            "admin_only".to_string()
        } else {
            policy.mode().to_string()
        },
    };

    match format {
        OutputFormat::Table => {
            output::print_verdict(
                !result.hidden,
                &format!(
                    "{} {} {} ({})",
                    result.resource,
                    if result.hidden { "hidden from" } else { "shown to" },
                    result.user,
                    result.mode
                ),
            );
        }
        _ => output::print_item(&result, format)?,
    }

    Ok(())
}
