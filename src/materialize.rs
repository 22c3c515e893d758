//! Materialization of a remote repository into a workspace.
//!
//! Thin orchestration around a [`RepositoryFetcher`]: echo the inputs, call
//! the fetcher exactly once, summarize what it checked out. Fetch errors are
//! returned unchanged and nothing is retried here.

use std::path::Path;

use log::info;

use crate::error::Result;
use crate::fetch::{FetchRequest, RepositoryFetcher};
use crate::output::Marker;
use crate::progress::Progress;

/// Summary of one materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializationResult {
    /// Files known to the configuration.
    pub total_files: usize,
    /// Files actually present in the workspace.
    pub checked_out: usize,
}

/// Populate `workspace` with what `config_path` needs from `repo_url`.
pub async fn materialize(
    fetcher: &dyn RepositoryFetcher,
    workspace: &Path,
    repo_url: &str,
    config_path: &Path,
    branch: Option<&str>,
    progress: &dyn Progress,
) -> Result<MaterializationResult> {
    progress.step(Marker::Fetch, &format!("Repository: {}", repo_url));
    if let Some(branch) = branch {
        progress.step(Marker::Fetch, &format!("Branch: {}", branch));
    }
    progress.step(
        Marker::Fetch,
        &format!("Configuration: {}", config_path.display()),
    );
    progress.step(Marker::Fetch, &format!("Workspace: {}", workspace.display()));

    let request = FetchRequest {
        workspace,
        repo_url,
        config_path,
        branch,
    };
    let files = fetcher.clone_and_parse(&request, progress).await?;

    let result = MaterializationResult {
        total_files: files.total(),
        checked_out: files.checked_out_count(),
    };
    info!(
        "Materialized {} of {} files into {}",
        result.checked_out,
        result.total_files,
        workspace.display()
    );
    progress.step(
        Marker::Summary,
        &format!("Total files: {}", result.total_files),
    );
    progress.step(
        Marker::Summary,
        &format!("Files checked out: {}", result.checked_out),
    );

    Ok(result)
}
