//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (flags win over file values)
//!     → validation.rs (semantic checks)
//!     → SentinelConfig (validated, immutable)
//!     → handed to the controller at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError, ConfigOverrides};
pub use schema::SentinelConfig;
pub use schema::{
    DetectionConfig, EventsConfig, FeedConfig, ObservabilityConfig, ReloadConfig, UpstreamConfig,
};
