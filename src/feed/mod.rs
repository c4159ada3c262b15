//! Health feed subsystem.
//!
//! # Data Flow
//! ```text
//! Poll cycle
//!     → client.rs (GET <backend>/api/v1/query?query=<metric>)
//!     → response.rs (envelope → HealthSample list)
//!     → instance → value map handed to the state machine
//! ```
//!
//! # Design Decisions
//! - Backend failures mean "no information", never "all unhealthy"
//! - Individual bad series are skipped, not fatal for the batch
//! - Results ordered by instance key for deterministic cycles

pub mod client;
pub mod response;

pub use client::{to_health_map, FeedError, HealthFeedClient};
pub use response::{parse_samples, HealthSample, InstanceLabels};
