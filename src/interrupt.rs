//! Interrupt sources for long-running generator processes.
//!
//! An interrupt source is armed with a plain function call that registers the
//! OS signal handler immediately; the returned future completes when the
//! signal arrives. Arming synchronously means there is no window between
//! spawning the generator and the handler being in place.
//!
//! Once registered, tokio keeps the handler for the rest of the process, so
//! repeated signals after the first are absorbed rather than killing the
//! process halfway through cleanup.

use std::future::Future;
use std::io;

/// Arm Ctrl-C (and `SIGTERM` on Unix) as an interrupt.
#[cfg(unix)]
pub fn ctrl_c() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
    })
}

/// Arm Ctrl-C as an interrupt.
#[cfg(windows)]
pub fn ctrl_c() -> io::Result<impl Future<Output = ()>> {
    let mut ctrl_c = tokio::signal::windows::ctrl_c()?;
    Ok(async move {
        ctrl_c.recv().await;
    })
}

/// An interrupt that never fires.
pub fn never() -> io::Result<std::future::Pending<()>> {
    Ok(std::future::pending())
}
