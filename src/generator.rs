//! Command-line contract of the DocFX generator.
//!
//! ```text
//! docfx build <config-file-name>          (cwd = config directory)
//! docfx --serve <config-absolute-path> [--port N]
//! ```
//!
//! The configuration file is always resolved against the workspace that was
//! actually materialized, and the generator always runs in the directory that
//! contains it, since configurations may be nested below the repository root.

use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::workspace::Workspace;

/// Generator subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Build,
    Serve,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Build => write!(f, "build"),
            Verb::Serve => write!(f, "serve"),
        }
    }
}

/// One run of the generator against a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorInvocation {
    pub verb: Verb,
    /// Absolute path of the configuration file.
    pub config_file: PathBuf,
    /// Parent directory of `config_file`.
    pub working_dir: PathBuf,
    pub port: Option<u16>,
}

impl GeneratorInvocation {
    /// Resolve `config_path` (relative to the repository root) inside
    /// `workspace`.
    pub fn new(
        verb: Verb,
        workspace: &Workspace,
        config_path: &Path,
        port: Option<u16>,
    ) -> Result<Self> {
        validate_config_path(config_path)?;

        let config_file = workspace.path().join(config_path);
        let working_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| workspace.path().to_path_buf());

        Ok(Self {
            verb,
            config_file,
            working_dir,
            port,
        })
    }

    /// Arguments passed to the generator, one element per argument.
    pub fn args(&self) -> Vec<OsString> {
        match self.verb {
            Verb::Build => {
                let name = self
                    .config_file
                    .file_name()
                    .map(OsString::from)
                    .unwrap_or_else(|| self.config_file.clone().into_os_string());
                vec![OsString::from("build"), name]
            }
            Verb::Serve => {
                let mut args = vec![
                    OsString::from("--serve"),
                    self.config_file.clone().into_os_string(),
                ];
                if let Some(port) = self.port {
                    args.push(OsString::from("--port"));
                    args.push(OsString::from(port.to_string()));
                }
                args
            }
        }
    }

    /// Short human-readable name of the command, e.g. `docfx build`.
    pub fn command_name(&self, program: &Path) -> String {
        let program = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        match self.verb {
            Verb::Build => format!("{} build", program),
            Verb::Serve => format!("{} --serve", program),
        }
    }
}

/// Check that `config_path` names a file inside the repository.
pub fn validate_config_path(config_path: &Path) -> Result<()> {
    let invalid = |message: &str| Error::InvalidConfigPath {
        path: config_path.to_path_buf(),
        message: message.to_string(),
    };

    if config_path.as_os_str().is_empty() {
        return Err(invalid("path is empty"));
    }
    if config_path.is_absolute() || config_path.has_root() {
        return Err(invalid("must be relative to the repository root"));
    }
    if config_path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(invalid("must not leave the repository"));
    }
    if config_path.file_name().is_none() {
        return Err(invalid("must name a file"));
    }
    Ok(())
}
