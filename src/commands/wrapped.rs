//! Wrapped package managers - `npm`, `npx`, `pnpm` and `raw-npx`
//!
//! Arguments are handed to the wrapped tool verbatim, `--help` included.
//! The process then ends exactly like the wrapped tool did.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::context::CommandContext;
use crate::dispatch::{Invocation, RunFuture};
use crate::proxy::{self, ProxySpec};

/// Executable name of the shadow wrapper for `tool`
pub fn shadow_bin_name(tool: &str) -> String {
    format!("socket-{}", tool)
}

/// Path of the shadow wrapper for `tool` inside `dir`
pub fn shadow_bin_path(dir: PathBuf, tool: &str) -> PathBuf {
    dir.join(shadow_bin_name(tool))
}

async fn run_shadow(tool: &'static str, args: Vec<String>, ctx: &CommandContext) -> Result<()> {
    let executable = shadow_bin_path(ctx.shadow_dir()?, tool);
    tracing::debug!("Wrapping {} via {}", tool, executable.display());

    let termination = proxy::run_wrapped(&ProxySpec::new(executable, args)).await?;
    termination.apply()
}

pub fn run_npm<'a>(args: Vec<String>, _inv: Invocation, ctx: &'a mut CommandContext) -> RunFuture<'a> {
    Box::pin(run_shadow("npm", args, ctx))
}

pub fn run_npx<'a>(args: Vec<String>, _inv: Invocation, ctx: &'a mut CommandContext) -> RunFuture<'a> {
    Box::pin(run_shadow("npx", args, ctx))
}

pub fn run_pnpm<'a>(args: Vec<String>, _inv: Invocation, ctx: &'a mut CommandContext) -> RunFuture<'a> {
    Box::pin(run_shadow("pnpm", args, ctx))
}

async fn raw_npx(args: Vec<String>) -> Result<()> {
    let npx = which::which("npx").context("Could not find `npx` on PATH")?;
    tracing::debug!("Running raw npx at {}", npx.display());

    let termination = proxy::run_wrapped_sync(&ProxySpec::new(npx, args))?;
    termination.apply()
}

pub fn run_raw_npx<'a>(
    args: Vec<String>,
    _inv: Invocation,
    _ctx: &'a mut CommandContext,
) -> RunFuture<'a> {
    Box::pin(raw_npx(args))
}
