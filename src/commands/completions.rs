//! # Completions Command Implementation
//!
//! Generates shell completion scripts for `docfx-remote` with
//! `clap_complete`.
//!
//! ```bash
//! docfx-remote completions bash > ~/.local/share/bash-completion/completions/docfx-remote
//! docfx-remote completions zsh > ~/.zfunc/_docfx-remote
//! ```

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use std::io;

use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Execute the `completions` command, writing the script to stdout.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "docfx-remote", &mut io::stdout());
    Ok(())
}
