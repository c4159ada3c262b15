//! Upstream configuration subsystem.
//!
//! # Data Flow
//! ```text
//! Decision (remove / restore instance)
//!     → editor.rs (read file, rewrite matching lines)
//!     → entry.rs (classify lines: active / disabled / other)
//!     → storage (atomic replace, skipped in dry-run)
//!     → changed: bool back to the controller
//! ```
//!
//! # Design Decisions
//! - Disabled entries stay in the file as comments, so the load balancer
//!   ignores them and restoring needs no external state
//! - Matching is on the address field, never on raw substrings
//! - Single writer assumed; no file locking

pub mod editor;
pub mod entry;

pub use editor::{rewrite_disable, rewrite_enable, UpstreamEditor, UpstreamError};
pub use entry::{EntryGrammar, EntryState, UpstreamEntry, UpstreamLine};
