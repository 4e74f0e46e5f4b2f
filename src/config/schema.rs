//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a fetch stack.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::observability::timer::{MonotonicClock, SystemClock, TimerSource};

/// Root configuration for a decorated fetch.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    /// Headers applied to every request unless the request sets them.
    pub default_headers: BTreeMap<String, String>,

    /// Request ID tagging.
    pub request_id: RequestIdConfig,

    /// Fetch logging and log output.
    pub logging: LoggingConfig,

    /// Clock used to time fetches.
    pub timer: TimerKind,

    /// Settings for the built-in HTTP client.
    pub client: ClientConfig,
}

/// Request ID configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RequestIdConfig {
    /// Tag every request with a generated ID.
    pub enabled: bool,

    /// Header carrying the ID (case-insensitive).
    pub header_name: String,
}

impl Default for RequestIdConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header_name: "X-Request-Id".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log fetch lifecycle events.
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error, off).
    pub level: String,

    /// Output format of the log subscriber.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Which clock times fetches.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    /// Wall clock, millisecond marks.
    #[default]
    System,
    /// Monotonic high-resolution clock.
    Monotonic,
}

impl TimerKind {
    pub fn source(self) -> Arc<dyn TimerSource> {
        match self {
            TimerKind::System => Arc::new(SystemClock),
            TimerKind::Monotonic => Arc::new(MonotonicClock::new()),
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// `User-Agent` sent by the built-in client.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
