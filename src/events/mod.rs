//! Event log subsystem.
//!
//! # Data Flow
//! ```text
//! Controller decision / remediation outcome
//!     → log.rs record() (append + narrate via tracing)
//!     → ... for the whole run ...
//!     → shutdown: persist() → single JSON array, atomic write
//! ```
//!
//! # Design Decisions
//! - Insertion order is the only order; records are never reordered
//! - No incremental persistence; the file is rewritten once at shutdown

pub mod log;

pub use log::{EventKind, EventLog, EventLogError, EventRecord};
