//! # Workspaces
//!
//! A workspace is the local directory a remote repository is materialized
//! into. It is either:
//!
//! - **explicit**: the user passed `--output DIR`. The directory belongs to the
//!   user and is never deleted.
//! - **ephemeral**: created by this tool under the temporary root as
//!   `<repo-name>-<random>`. It belongs to the current invocation and is
//!   deleted when the invocation ends unless retention was requested.
//!
//! Deletion goes through a [`CleanupGuard`], a one-shot action shared between
//! the normal completion path and the interrupt path. Whichever triggers it
//! first performs the cleanup; later triggers are no-ops.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// A resolved working-copy location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    path: PathBuf,
    ephemeral: bool,
}

impl Workspace {
    /// The absolute path of the workspace root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this invocation created (and therefore owns) the directory.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }
}

/// Derive a directory name from a repository URL.
///
/// Takes the final non-empty path segment and strips its extension, so
/// `https://example.com/org/my-repo.git/` yields `my-repo`.
pub fn repository_base_name(repo_url: &str) -> Result<String> {
    let invalid = |message: String| Error::InvalidRepositoryUrl {
        url: repo_url.to_string(),
        message,
    };

    let url = Url::parse(repo_url).map_err(|e| invalid(e.to_string()))?;
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .ok_or_else(|| invalid("URL has no repository path".to_string()))?;

    let name = Path::new(segment)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| invalid(format!("cannot derive a name from '{}'", segment)))?;

    Ok(name)
}

/// Decide where the working copy for `repo_url` lives.
///
/// With an explicit `output`, the path is made absolute and returned as-is;
/// populating (and creating) it is the fetch collaborator's job. Without one,
/// a fresh uniquely named directory is created under `temp_root`.
///
/// The URL is validated in both cases so a malformed URL fails before any
/// side effect.
pub fn resolve(repo_url: &str, output: Option<&Path>, temp_root: &Path) -> Result<Workspace> {
    let base = repository_base_name(repo_url)?;

    let workspace = match output {
        Some(dir) => Workspace {
            path: std::path::absolute(dir).map_err(|source| setup_error(dir, source))?,
            ephemeral: false,
        },
        None => {
            fs::create_dir_all(temp_root).map_err(|source| setup_error(temp_root, source))?;
            let dir = tempfile::Builder::new()
                .prefix(&format!("{}-", base))
                .tempdir_in(temp_root)
                .map_err(|source| setup_error(temp_root, source))?;
            Workspace {
                // Lifetime is managed by CleanupGuard from here on
                path: dir.keep(),
                ephemeral: true,
            }
        }
    };

    debug!(
        "Resolved workspace {} (ephemeral: {})",
        workspace.path.display(),
        workspace.ephemeral
    );
    Ok(workspace)
}

fn setup_error(path: &Path, source: std::io::Error) -> Error {
    Error::WorkspaceSetup {
        path: path.to_path_buf(),
        source,
    }
}

/// Recursively delete a workspace directory.
///
/// A directory that is already gone counts as removed.
pub fn remove_workspace(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Workspace {} already removed", path.display());
            Ok(())
        }
        Err(source) => Err(Error::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// What a cleanup trigger did with the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The ephemeral workspace was deleted.
    Removed(PathBuf),
    /// The ephemeral workspace was kept on request.
    Kept(PathBuf),
    /// The workspace was user-specified and left alone.
    Preserved(PathBuf),
    /// Deletion failed on the interrupt path and was abandoned.
    Abandoned(PathBuf),
    /// An earlier trigger already handled the workspace.
    AlreadyHandled,
}

/// One-shot cleanup of a workspace.
#[derive(Debug)]
pub struct CleanupGuard {
    workspace: Workspace,
    retain: bool,
    fired: AtomicBool,
}

impl CleanupGuard {
    /// `retain` keeps an ephemeral workspace; it has no effect on explicit ones.
    pub fn new(workspace: Workspace, retain: bool) -> Self {
        Self {
            workspace,
            retain,
            fired: AtomicBool::new(false),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Perform the cleanup decision, surfacing deletion errors.
    pub fn run(&self) -> Result<Disposition> {
        if self.fired.swap(true, Ordering::SeqCst) {
            return Ok(Disposition::AlreadyHandled);
        }

        let path = self.workspace.path.clone();
        if !self.workspace.ephemeral {
            return Ok(Disposition::Preserved(path));
        }
        if self.retain {
            return Ok(Disposition::Kept(path));
        }

        debug!("Removing workspace {}", path.display());
        remove_workspace(&path)?;
        Ok(Disposition::Removed(path))
    }

    /// Perform the cleanup decision, swallowing deletion errors.
    ///
    /// Used on the interrupt path, where the process must exit promptly.
    pub fn run_quietly(&self) -> Disposition {
        match self.run() {
            Ok(disposition) => disposition,
            Err(e) => {
                warn!("Ignoring cleanup failure during shutdown: {}", e);
                Disposition::Abandoned(self.workspace.path.clone())
            }
        }
    }
}
