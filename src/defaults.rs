//! Default values for docfx-remote configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Name of the documentation generator executable, looked up on `PATH`.
///
/// This can be overridden by the `--docfx` CLI flag or the `DOCFX_PATH`
/// environment variable.
pub const GENERATOR_PROGRAM: &str = "docfx";

/// Returns the default root under which ephemeral workspaces are created.
///
/// This is the platform temporary directory (`$TMPDIR` or `/tmp` on Unix,
/// `%TEMP%` on Windows). It can be overridden by the `--temp-root` CLI flag
/// or the `DOCFX_REMOTE_TEMP` environment variable.
pub fn default_temp_root() -> PathBuf {
    std::env::temp_dir()
}

/// Returns the default generator executable.
pub fn default_generator() -> PathBuf {
    PathBuf::from(GENERATOR_PROGRAM)
}
