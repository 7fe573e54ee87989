//! Login Command - store a verified API key

use anyhow::{Context, Result};
use clap::Parser;

use crate::application::use_cases::auth::{LoginRequest, LoginUseCase};
use crate::context::CommandContext;
use crate::dispatch::{Invocation, RunFuture};
use crate::errors::CliError;
use crate::flags;

/// Socket API login
#[derive(Parser, Debug)]
struct LoginArgs {
    /// API server to connect to for login
    #[arg(long)]
    api_base_url: Option<String>,

    /// Proxy to use when making connection to API server
    #[arg(long)]
    api_proxy: Option<String>,
}

async fn login(args: Vec<String>, inv: Invocation, ctx: &mut CommandContext) -> Result<()> {
    let Some(args) = flags::parse::<LoginArgs>(&inv.command_path(), &args)? else {
        return Ok(());
    };

    ctx.output
        .info("Enter your Socket.dev API key (find it under Settings > API Tokens)");
    let api_key = ctx
        .prompter
        .password("API key")
        .context("Failed to read API key")?;
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(CliError::input("An API key is required to log in").into());
    }

    let outcome = LoginUseCase::execute(
        ctx,
        LoginRequest {
            api_key,
            api_base_url: args.api_base_url,
            api_proxy: args.api_proxy,
        },
    )
    .await?;

    ctx.output.success("API credentials set");
    if !outcome.enforced_orgs.is_empty() {
        ctx.output.info(&format!(
            "Enforcing policies of {} organization(s)",
            outcome.enforced_orgs.len()
        ));
    }
    Ok(())
}

pub fn run<'a>(args: Vec<String>, inv: Invocation, ctx: &'a mut CommandContext) -> RunFuture<'a> {
    Box::pin(login(args, inv, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePrompter, context_with_prompter};

    fn invocation() -> Invocation {
        Invocation {
            parent_name: "socket".into(),
            name: "login".into(),
        }
    }

    #[tokio::test]
    async fn test_blank_key_is_input_error() {
        let prompter = FakePrompter {
            passwords: ["   ".to_string()].into(),
            ..Default::default()
        };
        let mut ctx = context_with_prompter(prompter);

        let err = run(vec![], invocation(), &mut ctx).await.unwrap_err();
        assert!(err.downcast_ref::<CliError>().is_some_and(CliError::is_input));
    }

    #[tokio::test]
    async fn test_login_with_flags_stores_base_url() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/organizations")
            .with_status(200)
            .with_body(r#"{"organizations":{}}"#)
            .create_async()
            .await;

        let prompter = FakePrompter {
            passwords: ["sk-live".to_string()].into(),
            ..Default::default()
        };
        let log = prompter.log.clone();
        let mut ctx = context_with_prompter(prompter);

        let argv = vec!["--api-base-url".to_string(), server.url()];
        run(argv, invocation(), &mut ctx).await?;

        assert_eq!(ctx.api_key(), Some("sk-live".into()));
        assert_eq!(ctx.api_base_url(), server.url());
        // No organizations, so no selection prompt
        assert_eq!(log.borrow().prompts, vec!["API key"]);
        Ok(())
    }
}
