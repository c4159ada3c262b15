//! Upstream file line grammar.
//!
//! ```text
//!     server api-1:8000 max_fails=0;               active entry
//! # disabled-by:api-1:8000 server api-1:8000 ...;  disabled entry
//!     # keepalive 16;                              anything else
//! ```
//!
//! The instance key of an active entry is its address field: the token after
//! the keyword with any trailing `;` removed.

use serde::Serialize;

use crate::config::UpstreamConfig;

/// Keyword, marker and indentation used to read and rewrite entries.
#[derive(Debug, Clone)]
pub struct EntryGrammar {
    pub keyword: String,
    pub marker_prefix: String,
    pub restore_indent: String,
}

impl Default for EntryGrammar {
    fn default() -> Self {
        Self::from(&UpstreamConfig::default())
    }
}

impl From<&UpstreamConfig> for EntryGrammar {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            keyword: config.entry_keyword.clone(),
            marker_prefix: config.marker_prefix.clone(),
            restore_indent: config.restore_indent.clone(),
        }
    }
}

/// Classification of one line of the upstream file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamLine<'a> {
    /// A live routing entry with its address field.
    Active { address: &'a str },
    /// A marked entry: the instance it was disabled for and the original
    /// entry text (line ending included).
    Disabled { instance: &'a str, payload: &'a str },
    /// Comments, braces, directives, blank lines.
    Other,
}

impl EntryGrammar {
    /// Full marker for an instance, including the separating space.
    pub fn marker(&self, instance: &str) -> String {
        format!("{}{} ", self.marker_prefix, instance)
    }

    /// Classify a single line (with or without its line ending).
    pub fn classify<'a>(&self, line: &'a str) -> UpstreamLine<'a> {
        let trimmed = line.trim_start();

        if let Some(rest) = trimmed.strip_prefix(self.marker_prefix.as_str()) {
            if let Some((instance, payload)) = rest.split_once(' ') {
                if !instance.is_empty() {
                    return UpstreamLine::Disabled { instance, payload };
                }
            }
            return UpstreamLine::Other;
        }

        let mut tokens = trimmed.split_whitespace();
        if tokens.next() != Some(self.keyword.as_str()) {
            return UpstreamLine::Other;
        }
        match tokens.next().map(|t| t.trim_end_matches(';')) {
            Some(address) if !address.is_empty() => UpstreamLine::Active { address },
            _ => UpstreamLine::Other,
        }
    }

    /// Disabled form of an active line.
    pub fn disable_line(&self, instance: &str, line: &str) -> String {
        format!("{}{}", self.marker(instance), line.trim_start())
    }

    /// Active form of a disabled entry's payload.
    pub fn enable_line(&self, payload: &str) -> String {
        format!("{}{}", self.restore_indent, payload.trim_start())
    }
}

/// Whether an entry currently participates in routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Active,
    Disabled,
}

/// One routing entry as found in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamEntry {
    /// 1-based line number.
    pub line: usize,
    pub instance: String,
    pub state: EntryState,
    /// Line text without its ending.
    pub text: String,
}
