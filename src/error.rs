//! # Error Handling
//!
//! This module defines the centralized error type for `docfx-remote`. It uses
//! the `thiserror` library to build an `Error` enum that covers every failure
//! the build/serve pipeline can surface.
//!
//! ## Key Components
//!
//! - **`Error`**: One variant per failure mode, each carrying enough context
//!   (URL, command, path, exit code) to produce a single readable line.
//!
//! - **`ErrorKind`**: The coarse category of an error. Every variant belongs to
//!   exactly one stage of the pipeline:
//!   - `Configuration`: malformed input or an unusable workspace location,
//!     detected while resolving the invocation.
//!   - `Materialization`: the repository could not be fetched into the
//!     workspace; the generator never runs.
//!   - `Generator`: the generator (or the interrupt source watching it) could
//!     not be set up, or the generator exited unsuccessfully.
//!   - `Cleanup`: the ephemeral workspace could not be deleted.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for docfx-remote operations
#[derive(Error, Debug)]
pub enum Error {
    /// The repository URL is not a well-formed URI, or has no path segment a
    /// workspace name can be derived from.
    #[error("Invalid repository URL '{url}': {message}")]
    InvalidRepositoryUrl { url: String, message: String },

    /// The configuration path cannot be resolved inside a workspace.
    #[error("Invalid configuration path '{}': {message}", path.display())]
    InvalidConfigPath { path: PathBuf, message: String },

    /// A git command run by the fetch collaborator failed.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// The repository could not be materialized into the workspace.
    ///
    /// Includes an optional hint for resolution.
    #[error("Materialization of {url} failed: {message}{}", hint.as_ref().map(|h| format!(" (hint: {})", h)).unwrap_or_default())]
    Materialization {
        url: String,
        message: String,
        hint: Option<String>,
    },

    /// The workspace location could not be prepared during resolution.
    #[error("Could not prepare workspace {}: {source}", path.display())]
    WorkspaceSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The interrupt source for a serve run could not be installed.
    #[error("Could not install interrupt handler: {source}")]
    InterruptSetup {
        #[source]
        source: std::io::Error,
    },

    /// The generator executable could not be started or waited on.
    #[error("Could not run '{}': {source}", program.display())]
    GeneratorLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The generator exited with a non-zero status.
    #[error("`{command}` {}", match code { Some(code) => format!("failed with exit code {}", code), None => "was terminated by a signal".to_string() })]
    GeneratorFailed { command: String, code: Option<i32> },

    /// The ephemeral workspace could not be deleted.
    #[error("Could not remove workspace {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The pipeline stage an [`Error`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Materialization,
    Generator,
    Cleanup,
}

impl Error {
    /// Classify this error by the stage that raised it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRepositoryUrl { .. }
            | Error::InvalidConfigPath { .. }
            | Error::WorkspaceSetup { .. } => ErrorKind::Configuration,
            Error::GitCommand { .. } | Error::Materialization { .. } | Error::Io(_) => {
                ErrorKind::Materialization
            }
            Error::InterruptSetup { .. }
            | Error::GeneratorLaunch { .. }
            | Error::GeneratorFailed { .. } => ErrorKind::Generator,
            Error::Cleanup { .. } => ErrorKind::Cleanup,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
