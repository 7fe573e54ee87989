//! CLI Commands Module
//!
//! This module contains all CLI subcommand implementations and the command
//! tree that routes to them. Package-manager commands proxy to a wrapped
//! executable; the rest talk to the Socket API.

pub mod analytics;
pub mod audit_log;
pub mod dependencies;
pub mod diff_scan;
pub mod login;
pub mod logout;
pub mod organizations;
pub mod wrapped;
pub mod wrapper;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::dispatch::Registry;
use crate::errors::RegistryError;
use crate::flags::OutputKind;
use crate::output::{OutputWriter, markdown_table};

/// The full `socket` command tree
pub fn root_registry() -> Result<Registry, RegistryError> {
    Registry::new()
        .with_leaf("npm", "npm wrapper functionality", wrapped::run_npm)?
        .with_leaf("npx", "npx wrapper functionality", wrapped::run_npx)?
        .with_leaf("pnpm", "pnpm wrapper functionality", wrapped::run_pnpm)?
        .with_leaf(
            "raw-npx",
            "Temporarily disable the Socket npm/npx wrapper",
            wrapped::run_raw_npx,
        )?
        .with_leaf(
            "wrapper",
            "Enable or disable the Socket npm/npx wrapper",
            wrapper::run,
        )?
        .with_leaf("login", "Socket API login", login::run)?
        .with_leaf("logout", "Socket API logout", logout::run)?
        .with_leaf(
            "organizations",
            "List organizations associated with the API key used",
            organizations::run,
        )?
        .with_leaf("analytics", "Look up analytics data", analytics::run)?
        .with_leaf(
            "audit-log",
            "Look up the audit log for an organization",
            audit_log::run,
        )?
        .with_group(
            "dependencies",
            "Search and upload dependencies",
            dependencies::registry()?,
        )?
        .with_group("diff-scan", "Diffs of full scans", diff_scan::registry()?)
}

/// Render rows as a terminal table, markdown table, or `data` as JSON
pub(crate) fn render_rows<T: Serialize + ?Sized>(
    output: &OutputWriter,
    kind: OutputKind,
    headers: &[&str],
    rows: &[Vec<String>],
    data: &T,
) -> Result<String> {
    match kind {
        OutputKind::Json => {
            serde_json::to_string_pretty(data).context("Failed to serialize results")
        }
        OutputKind::Markdown => Ok(markdown_table(headers, rows)),
        OutputKind::Text => {
            let mut table = output.create_table_with_headers(headers);
            for row in rows {
                table.add_row(row.clone());
            }
            Ok(table.to_string())
        }
    }
}

/// Print rendered results, or write them to `file` when given
pub(crate) fn emit(output: &OutputWriter, rendered: &str, file: Option<&Path>) -> Result<()> {
    match file {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output.success(&format!("Data successfully written to {}", path.display()));
        }
        None => output.data(rendered),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Node;
    use serde_json::json;

    #[test]
    fn test_groups_have_their_leaves() -> anyhow::Result<()> {
        let root = root_registry()?;

        let Some(Node::Group(deps)) = root.get("dependencies") else {
            panic!("dependencies should be a group");
        };
        assert!(deps.registry.get("search").is_some());
        assert!(deps.registry.get("upload").is_some());

        let Some(Node::Group(diff)) = root.get("diff-scan") else {
            panic!("diff-scan should be a group");
        };
        assert!(diff.registry.get("get").is_some());
        Ok(())
    }

    #[test]
    fn test_render_rows_formats() -> anyhow::Result<()> {
        let output = OutputWriter::new(true);
        let rows = vec![vec!["acme".to_string(), "team".to_string()]];
        let data = json!([{"name": "acme", "plan": "team"}]);

        let md = render_rows(&output, OutputKind::Markdown, &["Name", "Plan"], &rows, &data)?;
        assert!(md.starts_with("| Name | Plan |"));

        let js = render_rows(&output, OutputKind::Json, &["Name", "Plan"], &rows, &data)?;
        let parsed: serde_json::Value = serde_json::from_str(&js)?;
        assert_eq!(parsed, data);

        let text = render_rows(&output, OutputKind::Text, &["Name", "Plan"], &rows, &data)?;
        assert!(text.contains("acme"));
        Ok(())
    }

    #[test]
    fn test_emit_writes_file() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("out.md");
        emit(&OutputWriter::new(true), "| a |", Some(&path))?;
        assert_eq!(fs::read_to_string(&path)?, "| a |");
        Ok(())
    }
}
