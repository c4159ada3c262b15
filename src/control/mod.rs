//! Control loop.
//!
//! # Data Flow
//! ```text
//! every poll_interval:
//!     feed.fetch()            → instance → value
//!     tracker.advance()       → [RemoveInstance | RestoreInstance]
//!     for each decision:
//!         events.record(DEGRADATION_CONFIRMED | HEALTHY_AGAIN)
//!         editor.disable/enable(commit)
//!         if changed: reloader.reload(commit)
//!                     tracker.mark_removed/mark_restored
//!                     events.record(REMOVED_FROM_UPSTREAM | RESTORED_TO_UPSTREAM)
//! on shutdown:
//!     events.persist()
//! ```
//!
//! # Design Decisions
//! - Cycles never overlap and are never interrupted
//! - A failed edit leaves the tracker consistent with the file on disk

pub mod controller;

pub use controller::{Controller, CycleReport};
