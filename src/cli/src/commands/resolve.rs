//! Print a user's merged permission set.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use lectern_core::rbac::RoleBearing;

use super::roles::grant_rows;
use crate::context::Context;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct ResolveArgs {
    /// User record (JSON)
    #[arg(short, long)]
    user: PathBuf,
}

pub async fn execute(args: ResolveArgs, ctx: &Context, format: OutputFormat) -> Result<()> {
    let user = ctx.load_user(&args.user).await?;
    let merged = ctx.engine.resolve(&user);

    match format {
        OutputFormat::Table => {
            output::print_header(&format!("Permissions for {}", user.id()));
            output::print_detail("Kind", &format!("{:?}", user.kind()).to_lowercase());
            output::print_detail(
                "Roles",
                &user
                    .assigned_roles()
                    .iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            );
            output::print_detail(
                "Projects",
                &merged
                    .projects()
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            );
            if user.is_admin() {
                output::print_info("Admins bypass every check; the resolved set is empty.");
            }
            println!();
            output::print_list(&grant_rows(|r| merged.get(r).to_string()), format)?;
        }
        _ => output::print_item(&merged, format)?,
    }

    Ok(())
}
