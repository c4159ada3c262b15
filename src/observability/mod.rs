//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Operator terminal / log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (instance, action, outcome)
//! - JSON format for production, pretty format for development
//! - Metrics are cheap and silently dropped when no exporter is installed

pub mod logging;
pub mod metrics;
