//! # Invocation Lifecycle
//!
//! Drives one `build` or `serve` invocation end to end:
//!
//! ```text
//! Idle -> Resolving -> Materializing -> Invoking -> Cleaning -> Done
//!                                          |
//!                                          +-> Interrupted   (serve only)
//! ```
//!
//! 1. **Resolving**: validate the inputs and pick the workspace.
//! 2. **Materializing**: populate the workspace through the fetch collaborator.
//! 3. **Invoking**: run the generator in the configuration's directory. For
//!    `serve`, the interrupt source is armed right before the generator is
//!    spawned and raced against its exit.
//! 4. **Cleaning**: delete the workspace if it is ephemeral and was not kept.
//!
//! Cleanup goes through a single [`CleanupGuard`], so the workspace is
//! deleted at most once whichever path ends the run. On the interrupt path
//! deletion errors are swallowed; on the normal path they are returned. When
//! materialization or the generator fails, an ephemeral workspace is still
//! removed (errors logged) and the original failure is returned.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::fetch::RepositoryFetcher;
use crate::generator::{validate_config_path, GeneratorInvocation, Verb};
use crate::materialize::{materialize, MaterializationResult};
use crate::output::Marker;
use crate::process::{ProcessRunner, RunEnd};
use crate::progress::Progress;
use crate::workspace::{self, CleanupGuard, Disposition, Workspace};

/// Mode-specific options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One-shot build; `keep_temp` retains an ephemeral workspace.
    Build { keep_temp: bool },
    /// Long-running preview server.
    Serve { port: Option<u16> },
}

/// Everything that determines one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub mode: Mode,
    pub repo_url: String,
    /// Configuration file, relative to the repository root.
    pub config_path: PathBuf,
    pub branch: Option<String>,
    /// User-specified workspace; ephemeral when `None`.
    pub output: Option<PathBuf>,
    pub silent: bool,
    /// Generator executable.
    pub generator: PathBuf,
    /// Root for ephemeral workspaces.
    pub temp_root: PathBuf,
}

impl Invocation {
    fn verb(&self) -> Verb {
        match self.mode {
            Mode::Build { .. } => Verb::Build,
            Mode::Serve { .. } => Verb::Serve,
        }
    }

    fn port(&self) -> Option<u16> {
        match self.mode {
            Mode::Build { .. } => None,
            Mode::Serve { port } => port,
        }
    }

    fn retain(&self) -> bool {
        matches!(self.mode, Mode::Build { keep_temp: true })
    }
}

/// Lifecycle stage of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Resolving,
    Materializing,
    Invoking,
    Cleaning,
    Done,
    Interrupted,
}

impl Stage {
    /// Whether `next` may directly follow `self`.
    pub fn can_advance_to(self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Stage::Idle, Stage::Resolving)
                | (Stage::Resolving, Stage::Materializing)
                | (Stage::Materializing, Stage::Invoking)
                | (Stage::Invoking, Stage::Cleaning)
                | (Stage::Invoking, Stage::Interrupted)
                | (Stage::Cleaning, Stage::Done)
        )
    }
}

#[derive(Debug)]
struct StageTracker {
    current: Stage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            current: Stage::Idle,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.current.can_advance_to(next),
            "invalid transition {:?} -> {:?}",
            self.current,
            next
        );
        debug!("Lifecycle: {:?} -> {:?}", self.current, next);
        self.current = next;
    }
}

/// Outcome of a successful (or cleanly interrupted) invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub workspace: Workspace,
    pub materialized: MaterializationResult,
    pub disposition: Disposition,
    /// The serve process was stopped by an interrupt.
    pub interrupted: bool,
}

/// Sequences resolution, materialization, generation and cleanup.
pub struct Lifecycle<'a> {
    fetcher: &'a dyn RepositoryFetcher,
    progress: Arc<dyn Progress>,
}

impl<'a> Lifecycle<'a> {
    pub fn new(fetcher: &'a dyn RepositoryFetcher, progress: Arc<dyn Progress>) -> Self {
        Self { fetcher, progress }
    }

    /// Run `invocation` to completion.
    ///
    /// `arm_interrupt` is called only in serve mode, after materialization
    /// and before the generator starts; the future it returns stops the
    /// server when it completes.
    pub async fn run<A, F>(&self, invocation: &Invocation, arm_interrupt: A) -> Result<Completion>
    where
        A: FnOnce() -> std::io::Result<F>,
        F: Future<Output = ()>,
    {
        let mut stage = StageTracker::new();

        stage.advance(Stage::Resolving);
        validate_config_path(&invocation.config_path)?;
        let workspace = workspace::resolve(
            &invocation.repo_url,
            invocation.output.as_deref(),
            &invocation.temp_root,
        )?;
        let generator = GeneratorInvocation::new(
            invocation.verb(),
            &workspace,
            &invocation.config_path,
            invocation.port(),
        )?;
        let guard = CleanupGuard::new(workspace, invocation.retain());

        stage.advance(Stage::Materializing);
        let materialized = match materialize(
            self.fetcher,
            guard.workspace().path(),
            &invocation.repo_url,
            &invocation.config_path,
            invocation.branch.as_deref(),
            self.progress.as_ref(),
        )
        .await
        {
            Ok(result) => result,
            Err(e) => {
                self.abandon(&guard);
                return Err(e);
            }
        };

        stage.advance(Stage::Invoking);
        let command = generator.command_name(&invocation.generator);
        self.progress.step(
            Marker::Generate,
            &format!(
                "Running {} in {}",
                command,
                generator.working_dir.display()
            ),
        );

        let runner = ProcessRunner::new(Arc::clone(&self.progress), invocation.silent);
        let args = generator.args();
        let end = match invocation.mode {
            Mode::Build { .. } => runner
                .run(&invocation.generator, &args, &generator.working_dir)
                .await
                .map(RunEnd::Exited),
            Mode::Serve { .. } => match arm_interrupt() {
                Ok(interrupt) => {
                    runner
                        .run_until(
                            &invocation.generator,
                            &args,
                            &generator.working_dir,
                            interrupt,
                        )
                        .await
                }
                Err(source) => Err(Error::InterruptSetup { source }),
            },
        };

        let outcome = match end {
            Ok(RunEnd::Exited(outcome)) => outcome,
            Ok(RunEnd::Interrupted) => {
                stage.advance(Stage::Interrupted);
                self.progress.step(Marker::Stop, "Interrupted, stopping server");
                let disposition = guard.run_quietly();
                self.report(&disposition);
                return Ok(Completion {
                    workspace: guard.workspace().clone(),
                    materialized,
                    disposition,
                    interrupted: true,
                });
            }
            Err(e) => {
                self.abandon(&guard);
                return Err(e);
            }
        };

        if let Err(e) = outcome.check(&command) {
            self.abandon(&guard);
            return Err(e);
        }

        stage.advance(Stage::Cleaning);
        let disposition = guard.run()?;
        self.report(&disposition);

        stage.advance(Stage::Done);
        Ok(Completion {
            workspace: guard.workspace().clone(),
            materialized,
            disposition,
            interrupted: false,
        })
    }

    /// Cleanup on a failure path; the caller's error takes precedence.
    ///
    /// An explicit workspace is left alone without pointing the user at it,
    /// since the run produced nothing there.
    fn abandon(&self, guard: &CleanupGuard) {
        match guard.run() {
            Ok(Disposition::Preserved(path)) => {
                debug!("Leaving {} in place after failure", path.display())
            }
            Ok(disposition) => self.report(&disposition),
            Err(e) => warn!("{}", e),
        }
    }

    fn report(&self, disposition: &Disposition) {
        let (marker, message) = match disposition {
            Disposition::Removed(path) => (
                Marker::Cleanup,
                format!("Removed temporary workspace {}", path.display()),
            ),
            Disposition::Kept(path) => (
                Marker::Keep,
                format!("Temporary workspace kept at {}", path.display()),
            ),
            Disposition::Preserved(path) => {
                (Marker::Keep, format!("Output available at {}", path.display()))
            }
            Disposition::Abandoned(path) => (
                Marker::Cleanup,
                format!("Could not remove temporary workspace {}", path.display()),
            ),
            Disposition::AlreadyHandled => return,
        };
        self.progress.step(marker, &message);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fetch::{FetchRequest, FetchedFiles, RepoFile};
    use crate::progress::RecordingProgress;
    use async_trait::async_trait;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Writes the configuration file (and a page) into the workspace.
    #[derive(Default)]
    struct StubFetcher {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RepositoryFetcher for StubFetcher {
        async fn clone_and_parse(
            &self,
            request: &FetchRequest<'_>,
            _progress: &dyn Progress,
        ) -> Result<FetchedFiles> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Materialization {
                    url: request.repo_url.to_string(),
                    message: "branch not found".to_string(),
                    hint: None,
                });
            }
            let config = request.workspace.join(request.config_path);
            let dir = config.parent().unwrap().to_path_buf();
            fs::create_dir_all(&dir)?;
            fs::write(&config, "{}")?;
            fs::write(dir.join("index.md"), "# Hello")?;
            Ok(FetchedFiles::new(vec![
                RepoFile {
                    path: request.config_path.to_path_buf(),
                    checked_out: true,
                },
                RepoFile {
                    path: request.config_path.with_file_name("index.md"),
                    checked_out: true,
                },
            ]))
        }
    }

    struct Harness {
        temp: TempDir,
        fetcher: StubFetcher,
        progress: Arc<RecordingProgress>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_fetcher(StubFetcher::default())
        }

        fn with_fetcher(fetcher: StubFetcher) -> Self {
            let temp = TempDir::new().unwrap();
            fs::create_dir_all(temp.path().join("tmp")).unwrap();
            fs::create_dir_all(temp.path().join("record")).unwrap();
            Self {
                temp,
                fetcher,
                progress: Arc::new(RecordingProgress::default()),
            }
        }

        fn temp_root(&self) -> PathBuf {
            self.temp.path().join("tmp")
        }

        fn record(&self, name: &str) -> PathBuf {
            self.temp.path().join("record").join(name)
        }

        /// A fake generator that records its cwd and arguments, then runs `tail`.
        fn generator(&self, tail: &str) -> PathBuf {
            let path = self.temp.path().join("fake-docfx");
            let script = format!(
                "#!/bin/sh\npwd -P > '{}'\nprintf '%s\\n' \"$@\" > '{}'\n{}\n",
                self.record("cwd").display(),
                self.record("args").display(),
                tail
            );
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn invocation(&self, mode: Mode, generator: PathBuf) -> Invocation {
            Invocation {
                mode,
                repo_url: "https://example.com/org/my-repo.git".to_string(),
                config_path: PathBuf::from("docs/docfx.json"),
                branch: None,
                output: None,
                silent: true,
                generator,
                temp_root: self.temp_root(),
            }
        }

        fn lifecycle(&self) -> Lifecycle<'_> {
            let progress: Arc<dyn Progress> = self.progress.clone();
            Lifecycle::new(&self.fetcher, progress)
        }

        fn temp_entries(&self) -> usize {
            fs::read_dir(self.temp_root()).unwrap().count()
        }
    }

    #[tokio::test]
    async fn test_build_with_explicit_output() {
        let harness = Harness::new();
        let out = harness.temp.path().join("out");
        let mut invocation =
            harness.invocation(Mode::Build { keep_temp: false }, harness.generator("exit 0"));
        invocation.output = Some(out.clone());

        let completion = harness
            .lifecycle()
            .run(&invocation, crate::interrupt::never)
            .await
            .unwrap();

        assert_eq!(completion.disposition, Disposition::Preserved(out.clone()));
        assert!(out.join("docs/docfx.json").is_file());
        let cwd = fs::read_to_string(harness.record("cwd")).unwrap();
        assert_eq!(
            cwd.trim(),
            fs::canonicalize(out.join("docs")).unwrap().display().to_string()
        );
        let args = fs::read_to_string(harness.record("args")).unwrap();
        assert_eq!(args, "build\ndocfx.json\n");
        assert_eq!(completion.materialized.checked_out, 2);
    }

    #[tokio::test]
    async fn test_build_removes_ephemeral_workspace() {
        let harness = Harness::new();
        let invocation =
            harness.invocation(Mode::Build { keep_temp: false }, harness.generator("exit 0"));

        let completion = harness
            .lifecycle()
            .run(&invocation, crate::interrupt::never)
            .await
            .unwrap();

        assert!(completion.workspace.is_ephemeral());
        assert!(matches!(completion.disposition, Disposition::Removed(_)));
        assert!(!completion.workspace.path().exists());
        assert_eq!(harness.temp_entries(), 0);
        let name = completion.workspace.path().file_name().unwrap();
        assert!(name.to_string_lossy().starts_with("my-repo-"));
    }

    #[tokio::test]
    async fn test_build_keep_temp_reports_location() {
        let harness = Harness::new();
        let mut invocation =
            harness.invocation(Mode::Build { keep_temp: true }, harness.generator("exit 0"));
        invocation.silent = false;

        let completion = harness
            .lifecycle()
            .run(&invocation, crate::interrupt::never)
            .await
            .unwrap();

        let path = completion.workspace.path().to_path_buf();
        assert_eq!(completion.disposition, Disposition::Kept(path.clone()));
        assert!(path.join("docs/index.md").is_file());
        let expected = format!("Temporary workspace kept at {}", path.display());
        assert!(harness.progress.reports().contains(&expected));
    }

    #[tokio::test]
    async fn test_generator_failure_is_reported_and_workspace_removed() {
        let harness = Harness::new();
        let invocation =
            harness.invocation(Mode::Build { keep_temp: false }, harness.generator("exit 3"));

        let err = harness
            .lifecycle()
            .run(&invocation, crate::interrupt::never)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Generator);
        assert!(err.to_string().contains("failed with exit code 3"));
        assert_eq!(harness.temp_entries(), 0);
    }

    #[tokio::test]
    async fn test_materialization_failure_skips_generator() {
        let harness = Harness::with_fetcher(StubFetcher {
            fail: true,
            ..Default::default()
        });
        let invocation =
            harness.invocation(Mode::Build { keep_temp: false }, harness.generator("exit 0"));

        let err = harness
            .lifecycle()
            .run(&invocation, crate::interrupt::never)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Materialization);
        assert!(!harness.record("cwd").exists());
        assert_eq!(harness.temp_entries(), 0);
        assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_with_explicit_output_does_not_advertise_it() {
        let harness = Harness::with_fetcher(StubFetcher {
            fail: true,
            ..Default::default()
        });
        let out = harness.temp.path().join("out");
        let mut invocation =
            harness.invocation(Mode::Build { keep_temp: false }, harness.generator("exit 0"));
        invocation.output = Some(out);
        invocation.silent = false;

        let err = harness
            .lifecycle()
            .run(&invocation, crate::interrupt::never)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Materialization);
        assert!(harness
            .progress
            .reports()
            .iter()
            .all(|line| !line.contains("Output available")));
    }

    #[tokio::test]
    async fn test_serve_interrupt_setup_failure_is_generator_error() {
        let harness = Harness::new();
        let invocation =
            harness.invocation(Mode::Serve { port: None }, harness.generator("exit 0"));

        let err = harness
            .lifecycle()
            .run(&invocation, || {
                Err::<std::future::Pending<()>, _>(std::io::Error::other("no signal driver"))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InterruptSetup { .. }));
        assert_eq!(err.kind(), ErrorKind::Generator);
        assert!(!harness.record("cwd").exists());
        assert_eq!(harness.temp_entries(), 0);
    }

    #[tokio::test]
    async fn test_malformed_url_fails_before_side_effects() {
        let harness = Harness::new();
        let mut invocation =
            harness.invocation(Mode::Build { keep_temp: false }, harness.generator("exit 0"));
        invocation.repo_url = "not a url".to_string();

        let err = harness
            .lifecycle()
            .run(&invocation, crate::interrupt::never)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(harness.temp_entries(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_path_fails_before_side_effects() {
        let harness = Harness::new();
        let mut invocation =
            harness.invocation(Mode::Build { keep_temp: false }, harness.generator("exit 0"));
        invocation.config_path = PathBuf::from("../outside/docfx.json");

        let err = harness
            .lifecycle()
            .run(&invocation, crate::interrupt::never)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(harness.temp_entries(), 0);
    }

    #[tokio::test]
    async fn test_serve_interrupted_removes_workspace_once() {
        let harness = Harness::new();
        let mut invocation = harness.invocation(
            Mode::Serve { port: Some(9000) },
            harness.generator("exec sleep 30"),
        );
        invocation.config_path = PathBuf::from("docfx.json");

        let armed = AtomicUsize::new(0);
        let completion = harness
            .lifecycle()
            .run(&invocation, || {
                armed.fetch_add(1, Ordering::SeqCst);
                Ok(tokio::time::sleep(Duration::from_millis(500)))
            })
            .await
            .unwrap();

        assert!(completion.interrupted);
        assert_eq!(armed.load(Ordering::SeqCst), 1);
        assert!(matches!(completion.disposition, Disposition::Removed(_)));
        assert!(!completion.workspace.path().exists());
        assert_eq!(harness.temp_entries(), 0);

        let args = fs::read_to_string(harness.record("args")).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(args[0], "--serve");
        assert!(args[1].ends_with("docfx.json"));
        assert_eq!(&args[2..], &["--port", "9000"]);
    }

    #[tokio::test]
    async fn test_serve_normal_exit_cleans_up() {
        let harness = Harness::new();
        let invocation =
            harness.invocation(Mode::Serve { port: None }, harness.generator("exit 0"));

        let completion = harness
            .lifecycle()
            .run(&invocation, crate::interrupt::never)
            .await
            .unwrap();

        assert!(!completion.interrupted);
        assert!(matches!(completion.disposition, Disposition::Removed(_)));
        assert_eq!(harness.temp_entries(), 0);
    }

    #[tokio::test]
    async fn test_serve_interrupted_keeps_explicit_output() {
        let harness = Harness::new();
        let out = harness.temp.path().join("site");
        let mut invocation =
            harness.invocation(Mode::Serve { port: None }, harness.generator("exec sleep 30"));
        invocation.output = Some(out.clone());

        let completion = harness
            .lifecycle()
            .run(&invocation, || {
                Ok(tokio::time::sleep(Duration::from_millis(500)))
            })
            .await
            .unwrap();

        assert!(completion.interrupted);
        assert_eq!(completion.disposition, Disposition::Preserved(out.clone()));
        assert!(out.join("docs/docfx.json").is_file());
    }

    #[tokio::test]
    async fn test_build_never_arms_interrupt() {
        let harness = Harness::new();
        let invocation =
            harness.invocation(Mode::Build { keep_temp: false }, harness.generator("exit 0"));

        let completion = harness
            .lifecycle()
            .run(&invocation, || -> std::io::Result<std::future::Ready<()>> {
                panic!("build mode must not arm an interrupt")
            })
            .await
            .unwrap();

        assert!(!completion.interrupted);
    }

    #[test]
    fn test_stage_transitions() {
        assert!(Stage::Idle.can_advance_to(Stage::Resolving));
        assert!(Stage::Invoking.can_advance_to(Stage::Interrupted));
        assert!(!Stage::Interrupted.can_advance_to(Stage::Cleaning));
        assert!(!Stage::Resolving.can_advance_to(Stage::Invoking));
        assert!(!Stage::Done.can_advance_to(Stage::Cleaning));
    }
}
