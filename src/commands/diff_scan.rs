//! Diff Scan Commands - compare two full scans of an organization

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde_json::Value;

use crate::api_call::handle_api_call;
use crate::commands::{emit, render_rows};
use crate::context::CommandContext;
use crate::dispatch::{Invocation, Registry, RunFuture};
use crate::errors::RegistryError;
use crate::flags::{self, OutputFlags, OutputKind};

pub fn registry() -> Result<Registry, RegistryError> {
    Registry::new().with_leaf("get", "Get a diff scan for an organization", run_get)
}

/// Get a diff scan for an organization
#[derive(Parser, Debug)]
struct GetArgs {
    /// Organization slug
    org_slug: String,

    /// The full scan ID of the base scan
    #[arg(long)]
    before: String,

    /// The full scan ID of the head scan
    #[arg(long)]
    after: String,

    /// A boolean flag to persist or not the diff scan result
    #[arg(long)]
    preview: bool,

    /// Path to a local file where the output should be saved
    #[arg(long)]
    file: Option<PathBuf>,

    #[command(flatten)]
    output: OutputFlags,
}

/// Summary rows: one per top-level section of the diff
fn summary_rows(diff: &Value) -> Vec<Vec<String>> {
    let Some(obj) = diff.as_object() else {
        return Vec::new();
    };
    obj.iter()
        .map(|(key, value)| {
            let summary = match value {
                Value::Array(items) => format!("{} item(s)", items.len()),
                Value::Object(map) => format!("{} field(s)", map.len()),
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            vec![key.clone(), summary]
        })
        .collect()
}

async fn get(args: Vec<String>, inv: Invocation, ctx: &mut CommandContext) -> Result<()> {
    let Some(args) = flags::parse::<GetArgs>(&inv.command_path(), &args)? else {
        return Ok(());
    };

    let sdk = ctx.setup_sdk()?;
    let progress = ctx.progress("Getting diff scan...");
    let diff = handle_api_call(
        sdk.get_diff_scan(&args.org_slug, &args.before, &args.after, args.preview),
        &progress,
        "getting diff scan",
    )
    .await
    .into_result()?;
    progress.stop();

    // Files always receive the full diff
    let kind = match (args.output.kind(), &args.file) {
        (OutputKind::Text, Some(_)) => OutputKind::Json,
        (kind, _) => kind,
    };
    let rendered = render_rows(
        &ctx.output,
        kind,
        &["Section", "Summary"],
        &summary_rows(&diff),
        &diff,
    )?;
    emit(&ctx.output, &rendered, args.file.as_deref())
}

fn run_get<'a>(args: Vec<String>, inv: Invocation, ctx: &'a mut CommandContext) -> RunFuture<'a> {
    Box::pin(get(args, inv, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    use crate::errors::CliError;
    use crate::testing::test_context;

    fn invocation() -> Invocation {
        Invocation {
            parent_name: "socket diff-scan".into(),
            name: "get".into(),
        }
    }

    #[test]
    fn test_summary_rows() {
        let diff = json!({
            "artifacts": {"added": [], "removed": []},
            "diff_report_url": "https://socket.dev/diff/1",
            "directDependenciesChanged": false
        });
        let rows = summary_rows(&diff);
        assert_eq!(rows.len(), 3);
        assert!(rows.contains(&vec!["artifacts".to_string(), "2 field(s)".to_string()]));
        assert!(rows.contains(&vec![
            "directDependenciesChanged".to_string(),
            "false".to_string()
        ]));
    }

    #[tokio::test]
    async fn test_before_and_after_are_required() {
        let mut ctx = test_context();
        let err = run_get(vec!["acme".into()], invocation(), &mut ctx)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<CliError>().is_some_and(CliError::is_input));
    }

    #[tokio::test]
    async fn test_diff_written_to_file_as_json() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/orgs/acme/full-scans/diff")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("before".into(), "scan-a".into()),
                Matcher::UrlEncoded("after".into(), "scan-b".into()),
                Matcher::UrlEncoded("preview".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"artifacts":{"added":[]}}"#)
            .create_async()
            .await;

        let dir = tempfile::TempDir::new()?;
        let file = dir.path().join("diff.json");

        let mut ctx = test_context();
        ctx.config.api_key = Some("sk-test".into());
        ctx.config.api_base_url = Some(server.url());

        let argv = vec![
            "acme".to_string(),
            "--before".into(),
            "scan-a".into(),
            "--after".into(),
            "scan-b".into(),
            "--preview".into(),
            "--file".into(),
            file.to_string_lossy().to_string(),
        ];
        run_get(argv, invocation(), &mut ctx).await?;
        mock.assert_async().await;

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
        assert_eq!(written, json!({"artifacts": {"added": []}}));
        Ok(())
    }
}
