//! Socket CLI - Main entry point
//!
//! Wraps package managers and talks to the Socket security API.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use socket_cli::{errors, exit_codes};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let argv: Vec<String> = std::env::args().skip(1).collect();

    let exit_code = match run(&argv).await {
        Ok(code) => code,
        Err(err) => {
            errors::report(&err);
            exit_codes::FAILURE
        }
    };

    std::process::exit(exit_code);
}

async fn run(argv: &[String]) -> anyhow::Result<i32> {
    let mut app = socket_cli::CliApp::new()?;
    app.run(argv).await
}

/// Initialize tracing/logging for the CLI
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,socket_cli=info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
