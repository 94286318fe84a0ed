//! Binary crate for the `weather-etl` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Turning failures into a single diagnostic line and an exit status

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the progress lines and summary.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "error".into()))
        .with_writer(std::io::stderr)
        .init();

    let cmd = cli::Cli::parse_from(cli::normalize_args(std::env::args_os()));

    match cmd.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!("{err:#}");
            println!("{err}");
            ExitCode::FAILURE
        }
    }
}
