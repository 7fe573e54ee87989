//! Dependencies Commands - search the organization's dependencies and
//! upload manifests

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::api_call::handle_api_call;
use crate::api_client::{DependencyRow, UploadFile};
use crate::commands::{emit, render_rows};
use crate::context::CommandContext;
use crate::dispatch::{Invocation, Registry, RunFuture};
use crate::errors::{CliError, RegistryError};
use crate::flags::{self, OutputFlags, OutputKind};

pub fn registry() -> Result<Registry, RegistryError> {
    Registry::new()
        .with_leaf(
            "search",
            "Search for any dependency that is being used in your organization",
            run_search,
        )?
        .with_leaf(
            "upload",
            "Upload manifest files to create a dependency snapshot",
            run_upload,
        )
}

/// Search for any dependency that is being used in your organization
#[derive(Parser, Debug)]
struct SearchArgs {
    /// Maximum number of dependencies returned
    #[arg(long, default_value_t = 50)]
    limit: u32,

    /// Page number
    #[arg(long, default_value_t = 0)]
    offset: u32,

    #[command(flatten)]
    output: OutputFlags,
}

fn package_name(row: &DependencyRow) -> String {
    match &row.namespace {
        Some(ns) if !ns.is_empty() => format!("{}/{}", ns, row.name),
        _ => row.name.clone(),
    }
}

fn search_rows(deps: &[DependencyRow]) -> Vec<Vec<String>> {
    deps.iter()
        .map(|d| {
            vec![
                package_name(d),
                d.version.clone(),
                d.ecosystem.clone(),
                if d.direct { "yes" } else { "no" }.to_string(),
                d.repository.clone().unwrap_or_default(),
            ]
        })
        .collect()
}

async fn search(args: Vec<String>, inv: Invocation, ctx: &mut CommandContext) -> Result<()> {
    let Some(args) = flags::parse::<SearchArgs>(&inv.command_path(), &args)? else {
        return Ok(());
    };

    let sdk = ctx.setup_sdk()?;
    let progress = ctx.progress("Searching dependencies...");
    let response = handle_api_call(
        sdk.search_dependencies(args.limit, args.offset),
        &progress,
        "searching dependencies",
    )
    .await
    .into_result()?;
    progress.stop();

    let rendered = render_rows(
        &ctx.output,
        args.output.kind(),
        &["Package", "Version", "Ecosystem", "Direct", "Repository"],
        &search_rows(&response.rows),
        &response,
    )?;
    emit(&ctx.output, &rendered, None)?;

    if !response.end {
        ctx.output.info(&format!(
            "More results available: rerun with --offset {}",
            args.offset.saturating_add(args.limit)
        ));
    }
    Ok(())
}

fn run_search<'a>(args: Vec<String>, inv: Invocation, ctx: &'a mut CommandContext) -> RunFuture<'a> {
    Box::pin(search(args, inv, ctx))
}

/// Upload manifest files to create a dependency snapshot
#[derive(Parser, Debug)]
struct UploadArgs {
    /// Manifest files (package.json, package-lock.json, ...)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Repository name
    #[arg(long)]
    repo: Option<String>,

    /// Branch name
    #[arg(long)]
    branch: Option<String>,

    /// Output result as json
    #[arg(short, long)]
    json: bool,
}

fn read_upload_files(paths: &[PathBuf]) -> Result<Vec<UploadFile>> {
    paths
        .iter()
        .map(|path| -> Result<UploadFile> {
            if !path.is_file() {
                return Err(CliError::input(format!("No such file: {}", path.display())).into());
            }
            let content =
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(UploadFile {
                name: path.to_string_lossy().to_string(),
                content,
            })
        })
        .collect()
}

async fn upload(args: Vec<String>, inv: Invocation, ctx: &mut CommandContext) -> Result<()> {
    let Some(args) = flags::parse::<UploadArgs>(&inv.command_path(), &args)? else {
        return Ok(());
    };
    let files = read_upload_files(&args.files)?;

    let sdk = ctx.setup_sdk()?;
    let progress = ctx.progress("Uploading dependencies...");
    let response = handle_api_call(
        sdk.upload_dependencies(files, args.repo.as_deref(), args.branch.as_deref()),
        &progress,
        "uploading dependencies",
    )
    .await
    .into_result()?;
    progress.succeed("Dependencies uploaded");

    if args.json {
        let rendered = render_rows(&ctx.output, OutputKind::Json, &[], &[], &response)?;
        emit(&ctx.output, &rendered, None)?;
    }
    Ok(())
}

fn run_upload<'a>(args: Vec<String>, inv: Invocation, ctx: &'a mut CommandContext) -> RunFuture<'a> {
    Box::pin(upload(args, inv, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    use crate::testing::test_context;

    fn invocation(name: &str) -> Invocation {
        Invocation {
            parent_name: "socket dependencies".into(),
            name: name.into(),
        }
    }

    #[test]
    fn test_search_rows_join_namespace() {
        let deps = vec![DependencyRow {
            namespace: Some("@babel".into()),
            name: "core".into(),
            version: "7.24.0".into(),
            ecosystem: "npm".into(),
            direct: true,
            repository: None,
        }];
        assert_eq!(
            search_rows(&deps),
            vec![vec!["@babel/core", "7.24.0", "npm", "yes", ""]]
        );
    }

    #[tokio::test]
    async fn test_search_posts_limit_and_offset() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/dependencies/search")
            .match_body(Matcher::Json(json!({"limit": 10, "offset": 20})))
            .with_status(200)
            .with_body(r#"{"rows":[],"limit":10,"offset":20,"end":true}"#)
            .create_async()
            .await;

        let mut ctx = test_context();
        ctx.config.api_key = Some("sk-test".into());
        ctx.config.api_base_url = Some(server.url());

        let argv = vec!["--limit".into(), "10".into(), "--offset".into(), "20".into()];
        run_search(argv, invocation("search"), &mut ctx).await?;
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_next_offset_hint_at_u32_max() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/dependencies/search")
            .with_status(200)
            .with_body(r#"{"rows":[],"end":false}"#)
            .create_async()
            .await;

        let mut ctx = test_context();
        ctx.config.api_key = Some("sk-test".into());
        ctx.config.api_base_url = Some(server.url());

        let argv = vec!["--offset".into(), u32::MAX.to_string()];
        run_search(argv, invocation("search"), &mut ctx).await?;
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_input_error() {
        let mut ctx = test_context();
        ctx.config.api_key = Some("sk-test".into());

        let err = run_upload(
            vec!["/definitely/not/here/package.json".into()],
            invocation("upload"),
            &mut ctx,
        )
        .await
        .unwrap_err();
        assert!(err.downcast_ref::<CliError>().is_some_and(CliError::is_input));
    }

    #[tokio::test]
    async fn test_upload_sends_repo_and_branch() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let manifest = dir.path().join("package.json");
        fs::write(&manifest, r#"{"name":"demo"}"#)?;

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/dependencies/upload")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("repository".into(), "web".into()),
                Matcher::UrlEncoded("branch".into(), "main".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"id":"snap-1"}"#)
            .create_async()
            .await;

        let mut ctx = test_context();
        ctx.config.api_key = Some("sk-test".into());
        ctx.config.api_base_url = Some(server.url());

        let argv = vec![
            manifest.to_string_lossy().to_string(),
            "--repo".into(),
            "web".into(),
            "--branch".into(),
            "main".into(),
        ];
        run_upload(argv, invocation("upload"), &mut ctx).await?;
        mock.assert_async().await;
        Ok(())
    }
}
