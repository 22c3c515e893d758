//! Shared test utilities for E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new().with_origin_repo().with_fake_docfx("exit 0");
//! fixture.command().arg("build").arg(fixture.repo_url()).arg("docs/docfx.json");
//! ```

use assert_fs::prelude::*;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::should_skip_git_tests;
    pub use super::TestFixture;
}

/// Check if tests needing a `git` binary should be skipped.
///
/// Returns `true` if the `SKIP_GIT_TESTS` environment variable is set.
pub fn should_skip_git_tests() -> bool {
    env::var("SKIP_GIT_TESTS").is_ok()
}

/// A temporary directory holding an origin repository, a fake generator, a
/// temp root for ephemeral workspaces and a record of generator calls.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with empty `tmp/` and `record/` directories.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("tmp")
            .create_dir_all()
            .expect("Failed to create temp root");
        temp_dir
            .child("record")
            .create_dir_all()
            .expect("Failed to create record directory");
        Self { temp_dir }
    }

    /// Create a git repository at `origin/` with a nested DocFX configuration.
    pub fn with_origin_repo(self) -> Self {
        let origin = self.temp_dir.child("origin");
        origin
            .child("docs/docfx.json")
            .write_str(r#"{ "build": { "content": [{ "files": ["**/*.md"] }] } }"#)
            .expect("Failed to write docfx.json");
        origin
            .child("docs/index.md")
            .write_str("# Handbook\n")
            .expect("Failed to write index.md");
        origin
            .child("src/lib.rs")
            .write_str("pub fn unrelated() {}\n")
            .expect("Failed to write source file");

        git(origin.path(), &["init", "--quiet"]);
        git(origin.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(origin.path(), &["add", "."]);
        git(
            origin.path(),
            &[
                "-c",
                "user.name=Test",
                "-c",
                "user.email=test@example.com",
                "commit",
                "--quiet",
                "-m",
                "Initial docs",
            ],
        );
        self
    }

    /// Commit one more file to the origin repository.
    pub fn commit_to_origin(&self, path: &str, contents: &str) {
        let origin = self.temp_dir.child("origin");
        origin
            .child(path)
            .write_str(contents)
            .expect("Failed to write origin file");
        git(origin.path(), &["add", "."]);
        git(
            origin.path(),
            &[
                "-c",
                "user.name=Test",
                "-c",
                "user.email=test@example.com",
                "commit",
                "--quiet",
                "-m",
                "Update docs",
            ],
        );
    }

    /// Install a fake `docfx` that records its cwd and arguments, then runs
    /// `tail` (e.g. `exit 3` or `exec sleep 30`).
    pub fn with_fake_docfx(self, tail: &str) -> Self {
        let script = format!(
            "#!/bin/sh\npwd -P > '{}'\nprintf '%s\\n' \"$@\" > '{}'\n{}\n",
            self.record("cwd").display(),
            self.record("args").display(),
            tail
        );
        let docfx = self.temp_dir.child("fake-docfx");
        docfx.write_str(&script).expect("Failed to write fake docfx");
        make_executable(docfx.path());
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// `file://` URL of the origin repository.
    pub fn repo_url(&self) -> String {
        format!("file://{}", self.path().join("origin").display())
    }

    /// Root under which ephemeral workspaces are created.
    pub fn temp_root(&self) -> PathBuf {
        self.path().join("tmp")
    }

    /// Entries currently under the temp root.
    pub fn temp_entries(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.temp_root())
            .expect("Failed to read temp root")
            .map(|entry| entry.expect("Failed to read entry").path())
            .collect()
    }

    /// Path of a file written by the fake generator.
    pub fn record(&self, name: &str) -> PathBuf {
        self.path().join("record").join(name)
    }

    /// Contents of a record file, if the generator ran.
    pub fn read_record(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.record(name)).ok()
    }

    pub fn docfx(&self) -> PathBuf {
        self.path().join("fake-docfx")
    }

    /// Create a command configured to run in this fixture's directory, using
    /// the fake generator and the fixture's temp root.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("docfx-remote");
        cmd.current_dir(self.path())
            .env("DOCFX_PATH", self.docfx())
            .env("DOCFX_REMOTE_TEMP", self.temp_root())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn git(cwd: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .status()
        .expect("Failed to run git");
    assert!(status.success(), "git {:?} failed", args);
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to make script executable");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
