use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default worker count per stage.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Configuration for [`StagedSender`](crate::StagedSender).
///
/// The ladder has `1 + retry_delays.len()` stages. Stage 0 attempts
/// immediately; stage `i` waits `retry_delays[i - 1]` after escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Worker pool size, applied to every stage independently.
    pub max_concurrency: usize,

    /// Delay preceding each retry stage.
    pub retry_delays: Vec<Duration>,

    /// How long `shutdown` waits for in-flight attempts.
    pub shutdown_grace: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry_delays: vec![Duration::from_secs(60), Duration::from_secs(4 * 60)],
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

impl SenderConfig {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_retry_delays(mut self, retry_delays: impl Into<Vec<Duration>>) -> Self {
        self.retry_delays = retry_delays.into();
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Total number of attempts a failing item receives.
    pub fn stage_count(&self) -> usize {
        1 + self.retry_delays.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

/// Configuration for the reqwest-backed transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-request timeout, covering connect through response headers.
    pub timeout: Duration,

    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("webhook-notifier/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
