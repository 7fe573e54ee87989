//! Organizations Command - list organizations visible to the API key

use anyhow::Result;
use clap::Parser;

use crate::api_call::handle_api_call;
use crate::api_client::Organization;
use crate::commands::{emit, render_rows};
use crate::context::CommandContext;
use crate::dispatch::{Invocation, RunFuture};
use crate::flags::{self, OutputFlags};

/// List organizations associated with the API key used
#[derive(Parser, Debug)]
struct OrganizationsArgs {
    #[command(flatten)]
    output: OutputFlags,
}

fn rows(orgs: &[Organization]) -> Vec<Vec<String>> {
    orgs.iter()
        .map(|org| {
            vec![
                org.name.clone(),
                org.id.clone(),
                org.plan.clone().unwrap_or_default(),
            ]
        })
        .collect()
}

async fn organizations(args: Vec<String>, inv: Invocation, ctx: &mut CommandContext) -> Result<()> {
    let Some(args) = flags::parse::<OrganizationsArgs>(&inv.command_path(), &args)? else {
        return Ok(());
    };

    let sdk = ctx.setup_sdk()?;
    let progress = ctx.progress("Fetching organizations...");
    let orgs = handle_api_call(sdk.get_organizations(), &progress, "fetching organizations")
        .await
        .into_result()?
        .into_sorted();
    progress.stop();

    let rendered = render_rows(
        &ctx.output,
        args.output.kind(),
        &["Name", "ID", "Plan"],
        &rows(&orgs),
        &orgs,
    )?;
    emit(&ctx.output, &rendered, None)
}

pub fn run<'a>(args: Vec<String>, inv: Invocation, ctx: &'a mut CommandContext) -> RunFuture<'a> {
    Box::pin(organizations(args, inv, ctx))
}
