//! Error Taxonomy - typed failures shared by every subcommand
//!
//! Commands return `anyhow::Result`; the kinds below travel inside
//! `anyhow::Error` unchanged until the entry point, which is the only place
//! that prints them and picks the exit code.

use std::error::Error as StdError;

use console::style;
use thiserror::Error;

use crate::constants::ROOT_COMMAND;

/// Hint appended to authentication failures
pub const LOGIN_HINT: &str = "run `socket login` to authenticate";

/// Typed error kinds surfaced to the user
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user-supplied arguments or flags
    #[error("{message}")]
    Input {
        message: String,
        /// Command whose `--help` explains the expected input
        command_path: Option<String>,
    },

    /// Missing or rejected credential
    #[error("{message}")]
    Auth { message: String },

    /// Remote call failed or returned a non-success status
    #[error("{message} (status {status})")]
    Http {
        status: u16,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },
}

impl CliError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            command_path: None,
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// The standard "not authenticated" error
    pub fn unauthenticated() -> Self {
        Self::auth(format!("User must be authenticated: {}", LOGIN_HINT))
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            source: None,
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Tag an input error with the command that rejected it; the first tag wins
    pub fn set_command_path(&mut self, path: &str) {
        if let Self::Input { command_path, .. } = self {
            command_path.get_or_insert_with(|| path.to_string());
        }
    }

    /// Command an input error belongs to, if known
    pub fn command_path(&self) -> Option<&str> {
        match self {
            Self::Input { command_path, .. } => command_path.as_deref(),
            Self::Auth { .. } | Self::Http { .. } => None,
        }
    }
}

/// Registry construction failures (configuration errors, fail fast)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("subcommand `{0}` is registered twice")]
    Duplicate(String),
}

/// Collect the messages of an error and all of its causes, outermost first
pub fn cause_chain(err: &(dyn StdError + 'static)) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut current = err.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    chain
}

/// Usage hint for input errors, pointing at the failing command's help
pub fn usage_hint(err: &anyhow::Error) -> Option<String> {
    let cli_err = err.downcast_ref::<CliError>().filter(|e| e.is_input())?;
    let command_path = cli_err.command_path().unwrap_or(ROOT_COMMAND);
    Some(format!("run `{} --help` for usage", command_path))
}

/// Print an uncaught error with its full cause chain to stderr
pub fn report(err: &anyhow::Error) {
    let chain = cause_chain(&**err);
    let mut chain = chain.iter();
    if let Some(top) = chain.next() {
        eprintln!("{} {}", style("✗").red().bold(), top);
    }
    for cause in chain {
        eprintln!("  {} {}", style("caused by:").dim(), cause);
    }

    if let Some(hint) = usage_hint(err) {
        eprintln!("{} {}", style("ℹ").cyan().bold(), hint);
    }
}
