//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `docfx-remote` command-line tool, one file per subcommand.
//!
//! `build` and `serve` share the [`SourceArgs`] describing which repository
//! and configuration to use; each adds its mode-specific options and turns
//! the result into an [`Invocation`] for the library's lifecycle.

pub mod build;
pub mod completions;
pub mod serve;

use clap::Args;
use std::path::PathBuf;

use docfx_remote::defaults;
use docfx_remote::lifecycle::{Invocation, Mode};

/// Arguments shared by `build` and `serve`
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// URL of the repository holding the documentation
    #[arg(value_name = "REPO_URL")]
    pub repo_url: String,

    /// Path of the DocFX configuration file, relative to the repository root
    #[arg(value_name = "CONFIG_PATH")]
    pub config_path: PathBuf,

    /// Branch to check out (defaults to the remote's default branch)
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Directory to materialize the repository into (kept after the run)
    ///
    /// Without it, a temporary directory is created and removed afterwards.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Suppress progress and generator output; errors are still shown
    #[arg(short, long)]
    pub silent: bool,

    /// DocFX executable to run
    #[arg(long, value_name = "PATH", env = "DOCFX_PATH", default_value_os_t = defaults::default_generator())]
    pub docfx: PathBuf,

    /// Root directory for temporary workspaces
    #[arg(long, value_name = "DIR", env = "DOCFX_REMOTE_TEMP", default_value_os_t = defaults::default_temp_root())]
    pub temp_root: PathBuf,
}

impl SourceArgs {
    /// Build the invocation for `mode`.
    pub fn into_invocation(self, mode: Mode) -> Invocation {
        Invocation {
            mode,
            repo_url: self.repo_url,
            config_path: self.config_path,
            branch: self.branch,
            output: self.output,
            silent: self.silent,
            generator: self.docfx,
            temp_root: self.temp_root,
        }
    }
}
