//! Socket CLI - package-manager wrapper and security API client
//!
//! This crate provides the `socket` command line tool. It routes a tree of
//! named subcommands, transparently wraps `npm`, `npx` and `pnpm` so their
//! exit codes and signals reach the calling shell unchanged, and talks to the
//! Socket security API with uniform error reporting.
//!
//! ## Features
//! - **Subcommand Registry**: nested, ordered routing with generated help
//! - **Process Proxy**: exact exit-code and signal fidelity for wrapped tools
//! - **API Call Layer**: status codes classified into input, auth and HTTP errors
//! - **Settings Store**: API key and enforced organizations persisted per user

pub mod api_call;
pub mod api_client;
pub mod application;
pub mod commands;
pub mod constants;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod flags;
pub mod output;
pub mod proxy;
pub mod settings;

pub use context::{CliConfig, CommandContext};
pub use dispatch::{DispatchOutcome, Registry};
pub use errors::CliError;
pub use output::OutputWriter;

use crate::constants::ROOT_COMMAND;

/// CLI application runner
pub struct CliApp {
    registry: Registry,
    context: CommandContext,
}

impl CliApp {
    /// Create the application with the full command tree and the real environment
    pub fn new() -> anyhow::Result<Self> {
        let registry = commands::root_registry()?;
        let context = CommandContext::from_environment()?;
        Ok(Self::with_parts(registry, context))
    }

    pub fn with_parts(registry: Registry, context: CommandContext) -> Self {
        Self { registry, context }
    }

    /// Run one invocation; `argv` excludes the program name
    pub async fn run(&mut self, argv: &[String]) -> anyhow::Result<i32> {
        if let Some(first) = argv.first() {
            if first == "--version" || first == "-V" {
                println!("{} {}", ROOT_COMMAND, env!("CARGO_PKG_VERSION"));
                return Ok(exit_codes::SUCCESS);
            }
        }

        let outcome =
            dispatch::dispatch(&self.registry, argv, ROOT_COMMAND, &mut self.context).await?;
        Ok(outcome.exit_code())
    }
}

/// Process exit codes
pub mod exit_codes {
    /// Command completed
    pub const SUCCESS: i32 = 0;
    /// Any failure, including a missing or unknown subcommand
    pub const FAILURE: i32 = 1;
}
