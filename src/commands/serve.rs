//! Serve command implementation
//!
//! Materializes the repository and runs `docfx --serve` until the generator
//! exits or the user presses Ctrl-C. An interrupt stops the server, removes
//! the temporary workspace and exits successfully.

use anyhow::Result;
use clap::Args;

use super::SourceArgs;
use docfx_remote::fetch::GitSparseFetcher;
use docfx_remote::interrupt;
use docfx_remote::lifecycle::{Lifecycle, Mode};
use docfx_remote::output::{Marker, OutputConfig};
use docfx_remote::progress;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Port for the preview server (DocFX default when omitted)
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, output: OutputConfig) -> Result<()> {
    let invocation = args
        .source
        .into_invocation(Mode::Serve { port: args.port });

    let progress = progress::reporter(invocation.silent, output);
    let fetcher = GitSparseFetcher::new();
    let lifecycle = Lifecycle::new(&fetcher, progress.clone());

    let completion = lifecycle.run(&invocation, interrupt::ctrl_c).await?;

    if completion.interrupted {
        progress.step(Marker::Done, "Server stopped");
    } else {
        progress.step(Marker::Done, "Server exited");
    }
    Ok(())
}
