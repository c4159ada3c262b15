//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sentinel.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the sentinel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Metrics backend query settings.
    pub feed: FeedConfig,

    /// Detection policy (interval, hysteresis, staleness).
    pub detection: DetectionConfig,

    /// Upstream configuration file grammar and location.
    pub upstream: UpstreamConfig,

    /// Load balancer reload command.
    pub reload: ReloadConfig,

    /// Event log output.
    pub events: EventsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Run detection and logging without mutating the upstream file or
    /// invoking the reload command.
    pub dry_run: bool,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            detection: DetectionConfig::default(),
            upstream: UpstreamConfig::default(),
            reload: ReloadConfig::default(),
            events: EventsConfig::default(),
            observability: ObservabilityConfig::default(),
            dry_run: false,
        }
    }
}

impl SentinelConfig {
    /// Whether mutations should actually be written / executed.
    pub fn commit(&self) -> bool {
        !self.dry_run
    }
}

/// Metrics backend (health feed) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the Prometheus-compatible backend.
    pub backend_url: String,

    /// Instant query expression, usually the name of the exported gauge.
    pub metric: String,

    /// Query timeout in seconds.
    pub timeout_secs: f64,

    /// Label holding the instance key.
    pub instance_label: String,

    /// Label used when the primary one is missing.
    pub fallback_label: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:9090".to_string(),
            metric: "inventory_service_state".to_string(),
            timeout_secs: 5.0,
            instance_label: "instance".to_string(),
            fallback_label: "job".to_string(),
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

/// Detection policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Seconds between poll cycles.
    pub poll_interval_secs: f64,

    /// Consecutive unhealthy samples required before removal.
    pub consecutive: u32,

    /// Health value at or above which a sample counts as unhealthy.
    pub threshold: f64,

    /// Purge runtime state of instances unseen for this many cycles (0 = never).
    pub stale_after_cycles: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3.0,
            consecutive: 2,
            threshold: 1.0,
            stale_after_cycles: 200,
        }
    }
}

impl DetectionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }
}

/// Upstream configuration file settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Path to the load balancer upstream file.
    pub path: PathBuf,

    /// Keyword that starts a live routing entry (e.g., "server").
    pub entry_keyword: String,

    /// Comment-style prefix of the disable marker. The instance key and a
    /// single space follow it.
    pub marker_prefix: String,

    /// Indentation applied to restored entries.
    pub restore_indent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./monitoring/nginx/upstream.conf"),
            entry_keyword: "server".to_string(),
            marker_prefix: "# disabled-by:".to_string(),
            restore_indent: "    ".to_string(),
        }
    }
}

/// Reload command configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Argument vector; the first element is the program.
    pub command: Vec<String>,

    /// Maximum time the reload command may run, in seconds.
    pub timeout_secs: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            command: ["docker", "compose", "exec", "-T", "nginx", "nginx", "-s", "reload"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_secs: 30,
        }
    }
}

/// Event log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// File the event log is written to at shutdown.
    pub path: PathBuf,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("monitoring/events.json"),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Expose the sentinel's own metrics for scraping.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}
