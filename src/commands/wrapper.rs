//! Wrapper Command - install or remove the npm/npx shell aliases
//!
//! Only rc files that already exist are touched.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use directories::BaseDirs;

use crate::constants::WRAPPER_ALIASES;
use crate::context::CommandContext;
use crate::dispatch::{Invocation, RunFuture};
use crate::flags;

const RC_FILES: [&str; 2] = [".bashrc", ".zshrc"];

/// Enable or disable the Socket npm/npx wrapper
#[derive(Parser, Debug)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["enable", "disable", "postinstall"])
))]
struct WrapperArgs {
    /// Enables the Socket npm/npx wrapper
    #[arg(long)]
    enable: bool,

    /// Disables the Socket npm/npx wrapper
    #[arg(long)]
    disable: bool,

    /// Asks before enabling the wrapper (used by package install hooks)
    #[arg(long, hide = true)]
    postinstall: bool,
}

/// Shell rc files in the home directory that exist
pub fn existing_rc_files(home: &Path) -> Vec<PathBuf> {
    RC_FILES
        .iter()
        .map(|name| home.join(name))
        .filter(|path| path.is_file())
        .collect()
}

/// Whether every alias line is present in the file
pub fn has_aliases(path: &Path) -> Result<bool> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(WRAPPER_ALIASES
        .iter()
        .all(|alias| content.lines().any(|line| line.trim() == *alias)))
}

/// Append the missing alias lines; returns whether the file changed
pub fn add_aliases(path: &Path) -> Result<bool> {
    let mut content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let missing: Vec<&str> = WRAPPER_ALIASES
        .iter()
        .copied()
        .filter(|alias| !content.lines().any(|line| line.trim() == *alias))
        .collect();
    if missing.is_empty() {
        return Ok(false);
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    for alias in missing {
        content.push_str(alias);
        content.push('\n');
    }

    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Drop every alias line; returns whether the file changed
pub fn remove_aliases(path: &Path) -> Result<bool> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let kept: Vec<&str> = content
        .lines()
        .filter(|line| !WRAPPER_ALIASES.contains(&line.trim()))
        .collect();
    if kept.len() == content.lines().count() {
        return Ok(false);
    }

    let mut updated = kept.join("\n");
    if !updated.is_empty() {
        updated.push('\n');
    }
    fs::write(path, updated).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

fn home_dir() -> Result<PathBuf> {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .context("Could not determine the home directory")
}

fn enable(ctx: &CommandContext, rc_files: &[PathBuf]) -> Result<()> {
    for path in rc_files {
        if add_aliases(path)? {
            ctx.output
                .success(&format!("Added npm/npx aliases to {}", path.display()));
        } else {
            ctx.output
                .info(&format!("Aliases already present in {}", path.display()));
        }
    }
    ctx.output
        .info("Restart your shell or source your rc file for the wrapper to take effect");
    Ok(())
}

fn disable(ctx: &CommandContext, rc_files: &[PathBuf]) -> Result<()> {
    for path in rc_files {
        if remove_aliases(path)? {
            ctx.output
                .success(&format!("Removed npm/npx aliases from {}", path.display()));
        }
    }
    Ok(())
}

async fn wrapper(args: Vec<String>, inv: Invocation, ctx: &mut CommandContext) -> Result<()> {
    let Some(args) = flags::parse::<WrapperArgs>(&inv.command_path(), &args)? else {
        return Ok(());
    };

    let rc_files = existing_rc_files(&home_dir()?);
    if rc_files.is_empty() {
        ctx.output
            .warn("No .bashrc or .zshrc found in the home directory; nothing to do");
        return Ok(());
    }

    if args.enable {
        enable(ctx, &rc_files)
    } else if args.disable {
        disable(ctx, &rc_files)
    } else {
        let mut already = false;
        for path in &rc_files {
            already |= has_aliases(path)?;
        }
        if already {
            return Ok(());
        }

        let install = ctx
            .prompter
            .confirm(
                "Do you want to install the Socket npm wrapper (this will create an alias to the socket npm command)?",
                false,
            )
            .context("Failed to read confirmation")?;
        if install {
            enable(ctx, &rc_files)?;
        }
        Ok(())
    }
}

pub fn run<'a>(args: Vec<String>, inv: Invocation, ctx: &'a mut CommandContext) -> RunFuture<'a> {
    Box::pin(wrapper(args, inv, ctx))
}
