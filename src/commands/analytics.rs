//! Analytics Command - alert totals per day for an organization or repository

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::application::use_cases::analytics::{AnalyticsScope, AnalyticsSummary, AnalyticsUseCase};
use crate::commands::{emit, render_rows};
use crate::context::CommandContext;
use crate::dispatch::{Invocation, RunFuture};
use crate::errors::CliError;
use crate::flags::{self, OutputFlags, OutputKind};
use crate::output::OutputWriter;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Org,
    Repo,
}

/// Look up analytics data
#[derive(Parser, Debug)]
struct AnalyticsArgs {
    /// Whole organization or a single repository
    #[arg(value_enum)]
    scope: Scope,

    /// Number of days to look back (7, 30 or 60)
    #[arg(value_parser = ["7", "30", "60"])]
    time: String,

    /// Name of the repository (required for the `repo` scope)
    #[arg(long)]
    repo: Option<String>,

    /// Path to a file to save the data to
    #[arg(long)]
    file: Option<PathBuf>,

    #[command(flatten)]
    output: OutputFlags,
}

const DAY_HEADERS: [&str; 5] = ["Date", "Critical", "High", "Medium", "Low"];
const TYPE_HEADERS: [&str; 2] = ["Alert type", "Count"];

fn day_rows(summary: &AnalyticsSummary) -> Vec<Vec<String>> {
    summary
        .days
        .iter()
        .map(|day| {
            vec![
                day.date.format("%Y-%m-%d").to_string(),
                day.critical.to_string(),
                day.high.to_string(),
                day.medium.to_string(),
                day.low.to_string(),
            ]
        })
        .collect()
}

fn type_rows(summary: &AnalyticsSummary) -> Vec<Vec<String>> {
    summary
        .top_alert_types
        .iter()
        .map(|(name, count)| vec![name.clone(), count.to_string()])
        .collect()
}

fn render(output: &OutputWriter, kind: OutputKind, summary: &AnalyticsSummary) -> Result<String> {
    match kind {
        OutputKind::Json => render_rows(output, kind, &[], &[], summary),
        OutputKind::Markdown => Ok(format!(
            "# Socket Alert Analytics\n\n## Alerts per day\n\n{}\n## Top five alert types\n\n{}",
            render_rows(output, kind, &DAY_HEADERS, &day_rows(summary), summary)?,
            render_rows(output, kind, &TYPE_HEADERS, &type_rows(summary), summary)?,
        )),
        OutputKind::Text => Ok(format!(
            "Alerts per day\n{}\n\nTop five alert types\n{}",
            render_rows(output, kind, &DAY_HEADERS, &day_rows(summary), summary)?,
            render_rows(output, kind, &TYPE_HEADERS, &type_rows(summary), summary)?,
        )),
    }
}

fn scope_of(args: &AnalyticsArgs) -> Result<AnalyticsScope, CliError> {
    match (args.scope, &args.repo) {
        (Scope::Org, _) => Ok(AnalyticsScope::Org),
        (Scope::Repo, Some(repo)) if !repo.is_empty() => Ok(AnalyticsScope::Repo(repo.clone())),
        (Scope::Repo, _) => Err(CliError::input(
            "The `repo` scope requires a repository name: pass --repo <name>",
        )),
    }
}

async fn analytics(args: Vec<String>, inv: Invocation, ctx: &mut CommandContext) -> Result<()> {
    let Some(args) = flags::parse::<AnalyticsArgs>(&inv.command_path(), &args)? else {
        return Ok(());
    };
    let scope = scope_of(&args)?;
    let time: u32 = args
        .time
        .parse()
        .map_err(|_| CliError::input(format!("Invalid time window: {}", args.time)))?;

    let summary = AnalyticsUseCase::execute(ctx, &scope, time).await?;
    if summary.days.is_empty() {
        ctx.output.warn("No analytics data is available for this period");
    }

    let rendered = render(&ctx.output, args.output.kind(), &summary)?;
    emit(&ctx.output, &rendered, args.file.as_deref())
}

pub fn run<'a>(args: Vec<String>, inv: Invocation, ctx: &'a mut CommandContext) -> RunFuture<'a> {
    Box::pin(analytics(args, inv, ctx))
}
