//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers at startup
//! - Translate the first signal into a shutdown request
//! - Escalate a repeated signal to a forced shutdown
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (no work in signal context)
//! - Handler installation failure is a startup error
//! - A forced shutdown still flushes the event log; the process exits on its
//!   own only if the controller fails to return within the grace period

use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};

/// Time the controller gets to flush after a forced shutdown.
pub const FORCE_GRACE: Duration = Duration::from_secs(5);

/// Exit status used when the grace period runs out.
const FORCED_EXIT_CODE: i32 = 130;

/// What a received signal did to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: stop after the current cycle.
    Graceful,
    /// Repeated signal: abandon the current cycle.
    Forced,
}

/// Apply one received signal to the coordinator.
pub fn handle_signal(shutdown: &Shutdown, reason: ShutdownReason) -> SignalAction {
    if shutdown.is_triggered() {
        tracing::warn!(signal = %reason, "Received another signal, forcing shutdown");
        shutdown.force(reason);
        SignalAction::Forced
    } else {
        tracing::info!(signal = %reason, "Received signal, stopping after the current cycle");
        shutdown.trigger(reason);
        SignalAction::Graceful
    }
}

async fn escalate(shutdown: &Shutdown, reason: ShutdownReason) {
    if handle_signal(shutdown, reason) == SignalAction::Graceful {
        return;
    }
    tokio::time::sleep(FORCE_GRACE).await;
    tracing::error!(grace = ?FORCE_GRACE, "Controller did not stop in time, exiting");
    std::process::exit(FORCED_EXIT_CODE);
}

/// Install the termination handlers and spawn a task that triggers
/// `shutdown` on the first signal and forces it on the next.
#[cfg(unix)]
pub fn spawn_signal_listener(shutdown: Arc<Shutdown>) -> io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let reason = tokio::select! {
                _ = interrupt.recv() => ShutdownReason::Interrupt,
                _ = terminate.recv() => ShutdownReason::Terminate,
            };
            escalate(&shutdown, reason).await;
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_signal_listener(shutdown: Arc<Shutdown>) -> io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            escalate(&shutdown, ShutdownReason::Interrupt).await;
        }
    }))
}
