//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, consecutive >= 1)
//! - Check the upstream grammar can round-trip entries
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SentinelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::SentinelConfig;

/// Longest accepted poll interval or query timeout, in seconds.
pub const MAX_INTERVAL_SECS: f64 = 86_400.0;

/// A single semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &SentinelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.feed.backend_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "feed.backend_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "feed.backend_url",
            format!("invalid URL '{}': {}", config.feed.backend_url, e),
        )),
    }

    if config.feed.metric.trim().is_empty() {
        errors.push(ValidationError::new("feed.metric", "must not be empty"));
    }
    if !interval(config.feed.timeout_secs) {
        errors.push(ValidationError::new("feed.timeout_secs", interval_message()));
    }
    if config.feed.instance_label.is_empty() {
        errors.push(ValidationError::new("feed.instance_label", "must not be empty"));
    }

    if !interval(config.detection.poll_interval_secs) {
        errors.push(ValidationError::new("detection.poll_interval_secs", interval_message()));
    }
    if config.detection.consecutive == 0 {
        errors.push(ValidationError::new("detection.consecutive", "must be >= 1"));
    }
    if !config.detection.threshold.is_finite() {
        errors.push(ValidationError::new("detection.threshold", "must be a finite number"));
    }

    let keyword = &config.upstream.entry_keyword;
    if keyword.is_empty() || keyword.chars().any(char::is_whitespace) {
        errors.push(ValidationError::new(
            "upstream.entry_keyword",
            "must be a single non-empty word",
        ));
    }
    if !config.upstream.marker_prefix.starts_with('#') {
        errors.push(ValidationError::new(
            "upstream.marker_prefix",
            "must start with '#' so the load balancer ignores disabled entries",
        ));
    }
    if config.upstream.restore_indent.chars().any(|c| c != ' ' && c != '\t') {
        errors.push(ValidationError::new(
            "upstream.restore_indent",
            "may only contain spaces and tabs",
        ));
    }

    match config.reload.command.first() {
        Some(program) if !program.trim().is_empty() => {}
        _ => errors.push(ValidationError::new("reload.command", "must name a program")),
    }
    if config.reload.timeout_secs == 0 {
        errors.push(ValidationError::new("reload.timeout_secs", "must be > 0"));
    }

    if config.events.path.as_os_str().is_empty() {
        errors.push(ValidationError::new("events.path", "must not be empty"));
    }

    let format = config.observability.log_format.as_str();
    if format != "pretty" && format != "json" {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected 'pretty' or 'json', got '{}'", format),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn interval(secs: f64) -> bool {
    secs.is_finite() && secs > 0.0 && secs <= MAX_INTERVAL_SECS
}

fn interval_message() -> String {
    format!("must be > 0 and at most {} seconds", MAX_INTERVAL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SentinelConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = SentinelConfig::default();
        config.feed.backend_url = "not a url".to_string();
        config.detection.consecutive = 0;
        config.detection.poll_interval_secs = 0.0;
        config.reload.command.clear();
        config.upstream.marker_prefix = "disabled:".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "feed.backend_url",
                "detection.poll_interval_secs",
                "detection.consecutive",
                "upstream.marker_prefix",
                "reload.command",
            ]
        );
    }

    #[test]
    fn test_rejects_oversized_intervals() {
        let mut config = SentinelConfig::default();
        config.detection.poll_interval_secs = 1e30;
        config.feed.timeout_secs = MAX_INTERVAL_SECS + 1.0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["feed.timeout_secs", "detection.poll_interval_secs"]);

        config.detection.poll_interval_secs = MAX_INTERVAL_SECS;
        config.feed.timeout_secs = 30.0;
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.detection.poll_interval().as_secs(), 86_400);
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let mut config = SentinelConfig::default();
        config.feed.backend_url = "ftp://metrics:21".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("ftp"));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = SentinelConfig::default();
        config.observability.metrics_address = "nowhere".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
