//! Self-healing upstream sentinel library.

pub mod config;
pub mod control;
pub mod events;
pub mod feed;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod reload;
pub mod storage;
pub mod upstream;

pub use config::schema::SentinelConfig;
pub use control::Controller;
pub use lifecycle::Shutdown;
