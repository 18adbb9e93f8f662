//! Service Configuration

use serde::Deserialize;
use std::time::Duration;

use crate::observability::{ReasonLabels, DEFAULT_PREFIX};

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Metrics endpoint port
    pub listen_port: u16,

    /// Seconds between check iterations
    #[serde(rename = "pool_interval", alias = "poll_interval")]
    pub poll_interval: u64,

    /// Prefix of the metric family names
    pub metrics_prefix: String,

    /// Probes run at once within an iteration (1 = sequential)
    pub max_concurrent_probes: usize,

    /// Per-request timeout in seconds
    pub request_timeout: u64,

    /// How the histogram `reason` label is filled
    pub reason_labels: ReasonLabels,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_port: 8080,
            poll_interval: 60,
            metrics_prefix: DEFAULT_PREFIX.to_string(),
            max_concurrent_probes: 1,
            request_timeout: 30,
            reason_labels: ReasonLabels::Raw,
        }
    }
}

impl ServiceConfig {
    /// Set the listen port
    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Replace zero or empty values with their defaults
    pub(crate) fn normalize(&mut self) {
        let defaults = Self::default();
        if self.listen_port == 0 {
            self.listen_port = defaults.listen_port;
        }
        if self.poll_interval == 0 {
            self.poll_interval = defaults.poll_interval;
        }
        if self.metrics_prefix.is_empty() {
            self.metrics_prefix = defaults.metrics_prefix;
        }
        if self.max_concurrent_probes == 0 {
            self.max_concurrent_probes = defaults.max_concurrent_probes;
        }
        if self.request_timeout == 0 {
            self.request_timeout = defaults.request_timeout;
        }
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}
