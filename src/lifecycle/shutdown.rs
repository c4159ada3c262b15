//! Shutdown coordination for the sentinel.

use std::fmt;
use std::sync::Mutex;
use tokio::sync::watch;

/// Why the control loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// The loop ran its requested number of cycles.
    Completed,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ShutdownReason::Interrupt => "interrupt",
            ShutdownReason::Terminate => "terminate",
            ShutdownReason::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Coordinator for graceful shutdown.
///
/// Triggering only records the request and wakes subscribers; the controller
/// performs the actual flush on its own task. Forcing additionally asks the
/// controller to abandon a cycle in progress.
pub struct Shutdown {
    tx: watch::Sender<bool>,
    forced: watch::Sender<bool>,
    reason: Mutex<Option<ShutdownReason>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        let (forced, _) = watch::channel(false);
        Self {
            tx,
            forced,
            reason: Mutex::new(None),
        }
    }

    /// Subscribe to the shutdown signal. A receiver created after the
    /// trigger still observes it.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Request shutdown. The first reason wins.
    pub fn trigger(&self, reason: ShutdownReason) {
        if let Ok(mut current) = self.reason.lock() {
            current.get_or_insert(reason);
        }
        self.tx.send_replace(true);
    }

    /// Request shutdown without waiting for the current cycle to finish.
    pub fn force(&self, reason: ShutdownReason) {
        self.trigger(reason);
        self.forced.send_replace(true);
    }

    /// Subscribe to forced shutdown.
    pub fn subscribe_forced(&self) -> watch::Receiver<bool> {
        self.forced.subscribe()
    }

    pub fn is_forced(&self) -> bool {
        *self.forced.borrow()
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// The reason shutdown was requested, if it was.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.lock().ok().and_then(|r| *r)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_reason_wins() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        assert_eq!(shutdown.reason(), None);

        shutdown.trigger(ShutdownReason::Terminate);
        shutdown.trigger(ShutdownReason::Interrupt);

        assert!(shutdown.is_triggered());
        assert_eq!(shutdown.reason(), Some(ShutdownReason::Terminate));
    }

    #[test]
    fn test_force_implies_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownReason::Terminate);
        assert!(!shutdown.is_forced());

        shutdown.force(ShutdownReason::Interrupt);
        assert!(shutdown.is_forced());
        assert!(shutdown.is_triggered());
        assert_eq!(shutdown.reason(), Some(ShutdownReason::Terminate));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownReason::Interrupt);

        let mut rx = shutdown.subscribe();
        let woke = tokio::time::timeout(Duration::from_millis(100), rx.wait_for(|stop| *stop)).await;
        assert!(woke.is_ok());
    }
}
