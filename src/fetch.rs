//! # Repository Fetching
//!
//! The fetch collaborator populates a workspace with the part of a remote
//! repository a documentation configuration needs. The rest of the pipeline
//! only sees the [`RepositoryFetcher`] trait, so the strategy can be swapped
//! out (tests use in-memory stubs).
//!
//! [`GitSparseFetcher`] is the default implementation. It shells out to the
//! system `git` binary, which automatically handles:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Personal access tokens
//! - Any authentication configured in ~/.gitconfig
//!
//! It performs a shallow, blob-less fetch and a cone-mode sparse checkout of
//! the directory that holds the configuration file.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::progress::Progress;

/// What to fetch and where to put it.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// Workspace root; created if missing.
    pub workspace: &'a Path,
    pub repo_url: &'a str,
    /// Configuration file path relative to the repository root.
    pub config_path: &'a Path,
    /// Branch to fetch; the remote's default branch when `None`.
    pub branch: Option<&'a str>,
}

/// A file the configuration is known to need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    /// Path relative to the workspace root.
    pub path: PathBuf,
    /// Whether the file is present in the workspace.
    pub checked_out: bool,
}

/// The files known to a configuration after a fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedFiles {
    files: Vec<RepoFile>,
}

impl FetchedFiles {
    pub fn new(files: Vec<RepoFile>) -> Self {
        Self { files }
    }

    pub fn total(&self) -> usize {
        self.files.len()
    }

    /// The subset actually present in the workspace.
    pub fn checked_out(&self) -> impl Iterator<Item = &RepoFile> {
        self.files.iter().filter(|f| f.checked_out)
    }

    pub fn checked_out_count(&self) -> usize {
        self.checked_out().count()
    }
}

/// The repository-fetch collaborator.
#[async_trait]
pub trait RepositoryFetcher: Send + Sync {
    /// Populate `request.workspace` and report which files the configuration
    /// needs. Progress goes to `progress`.
    async fn clone_and_parse(
        &self,
        request: &FetchRequest<'_>,
        progress: &dyn Progress,
    ) -> Result<FetchedFiles>;
}

/// Fetches through the system `git` binary with a sparse checkout.
#[derive(Debug, Clone)]
pub struct GitSparseFetcher {
    git: PathBuf,
}

impl Default for GitSparseFetcher {
    fn default() -> Self {
        Self {
            git: PathBuf::from("git"),
        }
    }
}

impl GitSparseFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable.
    pub fn with_git(mut self, git: impl Into<PathBuf>) -> Self {
        self.git = git.into();
        self
    }

    async fn run_git(&self, args: &[&str], cwd: &Path, url: &str) -> Result<String> {
        debug!("Running git {:?} in {}", args, cwd.display());

        let output = Command::new(&self.git)
            .args(args)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|e| Error::Materialization {
                url: url.to_string(),
                message: format!("could not run {}: {}", self.git.display(), e),
                hint: Some("Make sure git is installed and on PATH".to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_git_failure(args, url, stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl RepositoryFetcher for GitSparseFetcher {
    async fn clone_and_parse(
        &self,
        request: &FetchRequest<'_>,
        progress: &dyn Progress,
    ) -> Result<FetchedFiles> {
        let url = request.repo_url;
        let root = request.workspace;
        let config_dir = config_directory(request.config_path);

        tokio::fs::create_dir_all(root).await?;

        self.run_git(&["init", "--quiet"], root, url).await?;

        // An explicit workspace may hold a checkout from an earlier run
        let remotes = self.run_git(&["remote"], root, url).await?;
        let reused = remotes.lines().any(|remote| remote.trim() == "origin");
        if reused {
            debug!("Reusing existing checkout in {}", root.display());
            self.run_git(&["remote", "set-url", "origin", url], root, url)
                .await?;
        } else {
            self.run_git(&["remote", "add", "origin", url], root, url)
                .await?;
        }

        match &config_dir {
            Some(dir) => {
                progress.report(&format!("Sparse checkout of {}", dir));
                self.run_git(&["sparse-checkout", "set", "--cone", dir.as_str()], root, url)
                    .await?;
            }
            None => {
                progress.report("Configuration is at the repository root; checking out everything");
                if reused {
                    self.run_git(&["sparse-checkout", "disable"], root, url)
                        .await?;
                }
            }
        }

        let target = request.branch.unwrap_or("HEAD");
        progress.report(&format!("Fetching {} from {}", target, url));
        self.run_git(
            &["fetch", "--quiet", "--depth=1", "--filter=blob:none", "origin", target],
            root,
            url,
        )
        .await?;
        self.run_git(&["checkout", "--quiet", "--force", "FETCH_HEAD"], root, url)
            .await?;

        let mut ls_tree = vec!["ls-tree", "-r", "--name-only", "FETCH_HEAD"];
        if let Some(dir) = &config_dir {
            ls_tree.push("--");
            ls_tree.push(dir.as_str());
        }
        let listing = self.run_git(&ls_tree, root, url).await?;

        let files: Vec<RepoFile> = listing
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                let path = PathBuf::from(line);
                let checked_out = root.join(&path).is_file();
                RepoFile { path, checked_out }
            })
            .collect();

        if !root.join(request.config_path).is_file() {
            return Err(Error::Materialization {
                url: url.to_string(),
                message: format!(
                    "configuration file {} not found in {}",
                    request.config_path.display(),
                    target
                ),
                hint: Some("Check the configuration path and --branch".to_string()),
            });
        }

        Ok(FetchedFiles::new(files))
    }
}

/// The repository-relative directory of a configuration file, in git's `/`
/// form, or `None` when the file sits at the repository root.
fn config_directory(config_path: &Path) -> Option<String> {
    let parent = config_path.parent()?;
    let parts: Vec<String> = parent
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn classify_git_failure(args: &[&str], url: &str, stderr: String) -> Error {
    let command = args.first().copied().unwrap_or_default();

    // Provide a helpful error message for common auth failures
    if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
    {
        return Error::Materialization {
            url: url.to_string(),
            message: format!("authentication failed: {}", stderr),
            hint: Some(
                "For private repos, check your SSH agent, git credentials or access token"
                    .to_string(),
            ),
        };
    }

    if command == "fetch" && stderr.contains("couldn't find remote ref") {
        return Error::Materialization {
            url: url.to_string(),
            message: stderr,
            hint: Some("Check the branch name passed with --branch".to_string()),
        };
    }

    Error::GitCommand {
        command: args.join(" "),
        url: url.to_string(),
        stderr,
    }
}
