//! # DocFX Remote CLI
//!
//! This is the binary entry point for the `docfx-remote` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Reporting any error as a single `Error: <message>` line with exit code 1.
//!
//! The pipeline itself lives in the `docfx_remote` library crate; the binary
//! is a thin wrapper around it.

mod cli;
mod commands;

use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
