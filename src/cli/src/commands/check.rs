//! Evaluate one authorization question.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use lectern_core::rbac::{AccessRequest, Operation, PolicyDecision, ResourceId};

use crate::context::Context;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct CheckArgs {
    /// User record (JSON)
    #[arg(short, long)]
    user: PathBuf,

    /// Resource (e.g. articles)
    #[arg(short, long)]
    resource: ResourceId,

    /// Operation: create, read, update, delete or translate
    #[arg(short = 'p', long)]
    operation: Operation,

    /// Target document id
    #[arg(short, long)]
    document: Option<String>,

    /// Target content locale
    #[arg(short, long)]
    locale: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    user: String,
    resource: ResourceId,
    operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locale: Option<String>,
    allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

pub async fn execute(args: CheckArgs, ctx: &Context, format: OutputFormat) -> Result<()> {
    let user = ctx.load_user(&args.user).await?;

    let mut request = AccessRequest::new(args.resource, args.operation);
    if let Some(document) = &args.document {
        request = request.with_document(document.as_str());
    }
    if let Some(locale) = &args.locale {
        request = request.with_locale(locale.as_str());
    }

    let decision = ctx.engine.gate().check(Some(&user), &request);
    let result = CheckResult {
        user: user.id().to_string(),
        resource: request.resource,
        operation: request.operation,
        document: request.document_id.clone(),
        locale: request.locale.as_ref().map(|l| l.to_string()),
        allowed: decision.is_allowed(),
        reason: match decision {
            PolicyDecision::Allow => None,
            PolicyDecision::Deny(reason) => Some(reason),
        },
    };

    match format {
        OutputFormat::Table => {
            let mut question = format!("{} {} {}", result.user, result.operation, result.resource);
            if let Some(document) = &result.document {
                question.push_str(&format!(" #{}", document));
            }
            if let Some(locale) = &result.locale {
                question.push_str(&format!(" [{}]", locale));
            }
            output::print_verdict(result.allowed, &question);
            if let Some(reason) = &result.reason {
                output::print_detail("Reason", reason);
            }
        }
        _ => output::print_item(&result, format)?,
    }

    if !result.allowed {
        std::process::exit(2);
    }
    Ok(())
}
