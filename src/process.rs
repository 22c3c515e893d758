//! # Process Runner
//!
//! Runs an external executable as a child process and supervises it:
//!
//! - Arguments are passed as a discrete list; no shell is involved.
//! - Standard error is always piped and forwarded line by line to
//!   [`Progress::diagnostic`], including in silent runs.
//! - Standard output is forwarded to [`Progress::report`] unless silent, in
//!   which case it is discarded.
//! - [`ProcessRunner::run_until`] races process exit against an interrupt
//!   future. When the interrupt wins, the child's whole process tree is
//!   stopped and the child reaped before returning.
//!
//! On Unix the child leads its own process group, so a wrapper script that
//! starts the real generator without `exec` is stopped together with it:
//! the group gets `SIGTERM`, then `SIGKILL` once [`TERMINATE_GRACE`] has
//! passed. Generator stdin is detached; the group does not own the terminal.
//!
//! Output forwarding ends at EOF. A leftover process can keep the pipes open
//! after the child exits; forwarding is then cut off after [`DRAIN_TIMEOUT`].

use std::ffi::OsString;
use std::future::Future;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::progress::Progress;

/// How long an interrupted process tree gets to exit before it is killed.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// How long output is still forwarded after the child has exited.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub success: bool,
}

impl ProcessOutcome {
    /// Turn a failed outcome into [`Error::GeneratorFailed`] for `command`.
    pub fn check(&self, command: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(Error::GeneratorFailed {
                command: command.to_string(),
                code: self.code,
            })
        }
    }
}

impl From<ExitStatus> for ProcessOutcome {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
        }
    }
}

/// Result of [`ProcessRunner::run_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The process exited on its own.
    Exited(ProcessOutcome),
    /// The interrupt fired first and the process was killed.
    Interrupted,
}

/// Launches child processes and streams their output to a progress sink.
#[derive(Clone)]
pub struct ProcessRunner {
    progress: Arc<dyn Progress>,
    silent: bool,
}

impl ProcessRunner {
    pub fn new(progress: Arc<dyn Progress>, silent: bool) -> Self {
        Self { progress, silent }
    }

    /// Run `program` to completion.
    pub async fn run(&self, program: &Path, args: &[OsString], cwd: &Path) -> Result<ProcessOutcome> {
        let (mut child, forwarders) = self.spawn(program, args, cwd)?;
        let status = child.wait().await.map_err(|source| Error::GeneratorLaunch {
            program: program.to_path_buf(),
            source,
        })?;
        drain(forwarders).await;
        debug!("{} exited with {}", program.display(), status);
        Ok(status.into())
    }

    /// Run `program` until it exits or `interrupt` completes, whichever
    /// happens first. If both are ready at once, the interrupt wins.
    pub async fn run_until<F>(
        &self,
        program: &Path,
        args: &[OsString],
        cwd: &Path,
        interrupt: F,
    ) -> Result<RunEnd>
    where
        F: Future<Output = ()>,
    {
        let (mut child, forwarders) = self.spawn(program, args, cwd)?;
        tokio::pin!(interrupt);

        tokio::select! {
            biased;
            _ = &mut interrupt => {
                info!("Interrupt received, stopping {}", program.display());
                terminate(&mut child).await;
                for forwarder in &forwarders {
                    forwarder.abort();
                }
                Ok(RunEnd::Interrupted)
            }
            status = child.wait() => {
                let status = status.map_err(|source| Error::GeneratorLaunch {
                    program: program.to_path_buf(),
                    source,
                })?;
                drain(forwarders).await;
                debug!("{} exited with {}", program.display(), status);
                Ok(RunEnd::Exited(status.into()))
            }
        }
    }

    fn spawn(
        &self,
        program: &Path,
        args: &[OsString],
        cwd: &Path,
    ) -> Result<(Child, Vec<JoinHandle<()>>)> {
        debug!("Spawning {} {:?} in {}", program.display(), args, cwd.display());

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .stdout(if self.silent {
                Stdio::null()
            } else {
                Stdio::piped()
            })
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| Error::GeneratorLaunch {
            program: program.to_path_buf(),
            source,
        })?;

        let mut forwarders = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            let progress = Arc::clone(&self.progress);
            forwarders.push(tokio::spawn(forward_lines(stdout, move |line| {
                progress.report(line)
            })));
        }
        if let Some(stderr) = child.stderr.take() {
            let progress = Arc::clone(&self.progress);
            forwarders.push(tokio::spawn(forward_lines(stderr, move |line| {
                progress.diagnostic(line)
            })));
        }

        Ok((child, forwarders))
    }
}

/// Send `line` to `emit` for every line of `reader` until EOF.
///
/// Invalid UTF-8 is replaced rather than ending the stream.
async fn forward_lines<R, F>(reader: R, emit: F)
where
    R: AsyncRead + Unpin,
    F: Fn(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                emit(line.trim_end_matches(['\n', '\r']));
            }
            Err(e) => {
                debug!("Stopped reading child output: {}", e);
                break;
            }
        }
    }
}

async fn drain(mut forwarders: Vec<JoinHandle<()>>) {
    let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
    for forwarder in &mut forwarders {
        match tokio::time::timeout_at(deadline, forwarder).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Output forwarder ended abnormally: {}", e),
            Err(_) => {
                warn!("Child output still open after exit, no longer forwarding it");
                break;
            }
        }
    }
    for forwarder in &forwarders {
        forwarder.abort();
    }
}

#[cfg(unix)]
async fn terminate(child: &mut Child) {
    let Some(pid) = child.id() else {
        // Already reaped
        return;
    };
    let group = pid as libc::pid_t;

    signal_group(group, libc::SIGTERM);
    match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
        Ok(Ok(status)) => debug!("Child stopped with {}", status),
        Ok(Err(e)) => warn!("Could not reap child process: {}", e),
        Err(_) => debug!("Child {} ignored SIGTERM", pid),
    }

    // Whatever is left of the group, including the child if it is still up
    signal_group(group, libc::SIGKILL);
    if let Err(e) = child.wait().await {
        warn!("Could not reap child process: {}", e);
    }
}

#[cfg(unix)]
fn signal_group(group: libc::pid_t, signal: libc::c_int) {
    // SAFETY: killpg takes plain integers and touches no memory.
    let rc = unsafe { libc::killpg(group, signal) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!("Could not signal process group {}: {}", group, err);
        }
    }
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        // Already exited between the interrupt and the kill
        debug!("Kill request not delivered: {}", e);
    }
    match child.wait().await {
        Ok(status) => debug!("Child stopped with {}", status),
        Err(e) => warn!("Could not reap child process: {}", e),
    }
}
