//! Audit Log Command - one page of an organization's audit log

use anyhow::Result;
use chrono::DateTime;
use clap::Parser;
use serde_json::Value;

use crate::api_call::handle_api_call;
use crate::api_client::{AuditLogEntry, AuditLogQuery};
use crate::commands::{emit, render_rows};
use crate::context::CommandContext;
use crate::dispatch::{Invocation, RunFuture};
use crate::flags::{self, OutputFlags};

/// Look up the audit log for an organization
#[derive(Parser, Debug)]
struct AuditLogArgs {
    /// Organization slug
    org_slug: String,

    /// Type of log event (e.g. `delete`)
    #[arg(short, long = "type")]
    log_type: Option<String>,

    /// Page number
    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Results per page
    #[arg(long = "perPage", default_value_t = 30)]
    per_page: u32,

    #[command(flatten)]
    output: OutputFlags,
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn rows(entries: &[AuditLogEntry]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|e| {
            vec![
                display_value(&e.event_id),
                format_timestamp(&e.created_at),
                e.event_type.clone(),
                e.user_email.clone().unwrap_or_default(),
                e.ip_address.clone().unwrap_or_default(),
                e.country_code.clone().unwrap_or_default(),
            ]
        })
        .collect()
}

async fn audit_log(args: Vec<String>, inv: Invocation, ctx: &mut CommandContext) -> Result<()> {
    let Some(args) = flags::parse::<AuditLogArgs>(&inv.command_path(), &args)? else {
        return Ok(());
    };

    let query = AuditLogQuery::new(
        &args.org_slug,
        args.log_type.as_deref(),
        args.page,
        args.per_page,
    );
    tracing::debug!("Audit log query: {:?}", query);

    let sdk = ctx.setup_sdk()?;
    let progress = ctx.progress("Looking up audit log...");
    let response = handle_api_call(sdk.get_audit_log(&query), &progress, "looking up audit log")
        .await
        .into_result()?;
    progress.stop();

    let rendered = render_rows(
        &ctx.output,
        args.output.kind(),
        &["Event id", "Created at", "Type", "User", "IP address", "Country"],
        &rows(&response.results),
        &response,
    )?;
    emit(&ctx.output, &rendered, None)?;

    if let Some(next) = response.next_page.as_ref().filter(|v| !v.is_null()) {
        ctx.output.info(&format!(
            "More events available: rerun with --page {}",
            display_value(next)
        ));
    }
    Ok(())
}

pub fn run<'a>(args: Vec<String>, inv: Invocation, ctx: &'a mut CommandContext) -> RunFuture<'a> {
    Box::pin(audit_log(args, inv, ctx))
}
