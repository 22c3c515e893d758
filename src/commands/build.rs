//! Build command implementation
//!
//! Materializes the repository, runs `docfx build` against the configuration
//! and removes the temporary workspace afterwards unless `--keep-temp` or
//! `--output` was given.

use anyhow::Result;
use clap::Args;
use std::time::Instant;

use super::SourceArgs;
use docfx_remote::fetch::GitSparseFetcher;
use docfx_remote::interrupt;
use docfx_remote::lifecycle::{Lifecycle, Mode};
use docfx_remote::output::{Marker, OutputConfig};
use docfx_remote::progress;

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Keep the temporary workspace after the build
    #[arg(long)]
    pub keep_temp: bool,
}

/// Execute the build command
pub async fn execute(args: BuildArgs, output: OutputConfig) -> Result<()> {
    let start_time = Instant::now();
    let invocation = args.source.into_invocation(Mode::Build {
        keep_temp: args.keep_temp,
    });

    let progress = progress::reporter(invocation.silent, output);
    let fetcher = GitSparseFetcher::new();
    let lifecycle = Lifecycle::new(&fetcher, progress.clone());

    lifecycle.run(&invocation, interrupt::never).await?;

    progress.step(
        Marker::Done,
        &format!(
            "Build completed in {:.2}s",
            start_time.elapsed().as_secs_f64()
        ),
    );
    Ok(())
}
