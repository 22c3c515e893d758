//! # Progress Reporting
//!
//! Every component that produces human-readable progress text writes it to a
//! [`Progress`] sink handed to it by the caller. The sink is chosen once per
//! invocation by [`reporter`] from the `--silent` flag; no component decides
//! verbosity on its own.
//!
//! Two kinds of text flow through a sink:
//! - **Progress** (`report`/`step`): pipeline messages and the generator's
//!   standard output. Discarded by [`SilentProgress`].
//! - **Diagnostics** (`diagnostic`): the generator's standard error. Written to
//!   stderr by both variants so failures stay visible in silent runs.

use std::io::Write;
use std::sync::Arc;

use crate::output::{Marker, OutputConfig};

/// A sink for progress messages.
pub trait Progress: Send + Sync {
    /// Emit one line of progress text.
    fn report(&self, message: &str);

    /// Emit a progress message for a pipeline step.
    fn step(&self, marker: Marker, message: &str) {
        let _ = marker;
        self.report(message);
    }

    /// Emit one line of diagnostic output.
    fn diagnostic(&self, line: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", line);
    }
}

/// Writes progress to standard output.
#[derive(Debug, Clone, Default)]
pub struct ConsoleProgress {
    output: OutputConfig,
}

impl ConsoleProgress {
    pub fn new(output: OutputConfig) -> Self {
        Self { output }
    }
}

impl Progress for ConsoleProgress {
    fn report(&self, message: &str) {
        // A closed stdout (e.g. piped into `head`) must not abort the run
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", message);
    }

    fn step(&self, marker: Marker, message: &str) {
        self.report(&format!("{} {}", marker.render(&self.output), message));
    }
}

/// Discards progress; diagnostics still reach stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn report(&self, _message: &str) {}
}

/// Select the progress sink for one invocation.
pub fn reporter(silent: bool, output: OutputConfig) -> Arc<dyn Progress> {
    if silent {
        Arc::new(SilentProgress)
    } else {
        Arc::new(ConsoleProgress::new(output))
    }
}

/// Collects everything it receives, for assertions in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingProgress {
    pub reports: std::sync::Mutex<Vec<String>>,
    pub diagnostics: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingProgress {
    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Progress for RecordingProgress {
    fn report(&self, message: &str) {
        self.reports.lock().unwrap().push(message.to_string());
    }

    fn diagnostic(&self, line: &str) {
        self.diagnostics.lock().unwrap().push(line.to_string());
    }
}
