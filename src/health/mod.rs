//! Health evaluation subsystem.
//!
//! # Data Flow
//! ```text
//! instance → value map (from feed)
//!     → state.rs (advance counters, apply hysteresis)
//!     → Decision list (RemoveInstance / RestoreInstance)
//!     → controller drives the upstream edit
//!     → controller confirms via mark_removed / mark_restored
//! ```
//!
//! # Design Decisions
//! - One owned tracker, no process-wide state
//! - Transitions committed only after the edit is confirmed
//! - Stale instances purged after a bounded number of cycles

pub mod state;

pub use state::{Decision, InstanceRuntimeState, InstanceTracker};
