//! # DocFX Remote Library
//!
//! This library builds or serves a DocFX documentation site straight from a
//! remote repository. It is used by the `docfx-remote` command-line tool but
//! can be embedded in other tools that need the same pipeline.
//!
//! ## Quick Example
//!
//! ```
//! use docfx_remote::workspace;
//!
//! let name = workspace::repository_base_name("https://example.com/org/my-repo.git").unwrap();
//! assert_eq!(name, "my-repo");
//! ```
//!
//! ## Core Concepts
//!
//! - **Workspaces (`workspace`)**: where a working copy lives. Ephemeral
//!   workspaces are created under the temporary root and owned by one run;
//!   explicit ones belong to the user and are never deleted.
//! - **Fetching (`fetch`, `materialize`)**: the `RepositoryFetcher` trait and
//!   its default sparse-checkout implementation on top of the system `git`.
//! - **Generator (`generator`, `process`)**: the DocFX command-line contract
//!   and a child-process runner that streams output and can be interrupted.
//! - **Lifecycle (`lifecycle`)**: the state machine tying it together, with
//!   exactly-once cleanup of ephemeral workspaces.
//! - **Progress (`progress`, `output`)**: the sink for human-readable progress,
//!   chosen once from the `--silent` flag.
//!
//! ## Execution Flow
//!
//! 1. **Resolve** the workspace from `--output` or a fresh temporary directory.
//! 2. **Materialize** the repository into it.
//! 3. **Invoke** `docfx build` or `docfx --serve` in the configuration's
//!    directory; in serve mode an interrupt stops the server.
//! 4. **Clean up** the ephemeral workspace unless it was kept.

pub mod defaults;
pub mod error;
pub mod fetch;
pub mod generator;
pub mod interrupt;
pub mod lifecycle;
pub mod materialize;
pub mod output;
pub mod process;
pub mod progress;
pub mod workspace;
