//! Connection settings for a remote guardrail service

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request timeout, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Where a guardrail service lives and how long to wait for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Service host (for `nask_guard`, the full endpoint URL)
    #[serde(default)]
    pub host: String,

    /// HTTP request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl GuardrailConfig {
    /// Settings for `host` with the default timeout
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether a host has been configured
    pub fn has_host(&self) -> bool {
        !self.host.trim().is_empty()
    }
}
