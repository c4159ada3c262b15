//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging/metrics → Install signals → Run loop
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown.rs trigger (flag + wake)
//!     repeated       → shutdown.rs force (abandon the running cycle)
//!
//! Shutdown (control::Controller::shutdown):
//!     Loop observes flag between cycles → Flush event log → Exit 0
//! ```
//!
//! # Design Decisions
//! - A first signal never interrupts a cycle; it only ends the inter-cycle sleep
//! - A second signal abandons the running cycle, then flushes and exits
//! - One shutdown routine for both normal exit and signals

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownReason};
pub use signals::{handle_signal, spawn_signal_listener, SignalAction};
