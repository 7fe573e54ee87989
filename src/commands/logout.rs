//! Logout Command - forget stored credentials

use anyhow::Result;
use clap::Parser;

use crate::application::use_cases::auth::LogoutUseCase;
use crate::context::CommandContext;
use crate::dispatch::{Invocation, RunFuture};
use crate::flags;

/// Socket API logout
#[derive(Parser, Debug)]
struct LogoutArgs {}

async fn logout(args: Vec<String>, inv: Invocation, ctx: &mut CommandContext) -> Result<()> {
    if flags::parse::<LogoutArgs>(&inv.command_path(), &args)?.is_none() {
        return Ok(());
    }

    LogoutUseCase::execute(ctx)?;
    ctx.output.success("Successfully logged out");
    Ok(())
}

pub fn run<'a>(args: Vec<String>, inv: Invocation, ctx: &'a mut CommandContext) -> RunFuture<'a> {
    Box::pin(logout(args, inv, ctx))
}
