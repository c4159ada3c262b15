//! Load balancer reload subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream file changed
//!     → command.rs (spawn reload argv, bounded by timeout)
//!     → exit status 0 → true, anything else → false + stderr logged
//! ```
//!
//! # Design Decisions
//! - Dry-run never spawns a process
//! - Failures are converted to a boolean and a log line at this boundary

pub mod command;

pub use command::{ReloadError, ReloadTrigger};
