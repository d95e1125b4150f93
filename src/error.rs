use std::time::Duration;

use thiserror::Error;

/// Errors returned synchronously by [`NotificationManager::notify`].
///
/// Delivery problems never show up here: once work is accepted the caller
/// only learns how many endpoints were fanned out to.
///
/// [`NotificationManager::notify`]: crate::NotificationManager::notify
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Caller input was missing or empty. Nothing was dispatched.
    #[error("invalid notification: {field} must not be empty")]
    Validation {
        field: &'static str,
    },

    /// Looking up the subject's endpoints failed. Nothing was dispatched.
    #[error("endpoint lookup failed: {0}")]
    Collaborator(#[from] DirectoryError),

    /// The pipeline has been shut down and accepts no more work.
    #[error("sender is shut down")]
    Shutdown,
}

impl NotifyError {
    pub fn validation(field: &'static str) -> Self {
        Self::Validation { field }
    }
}

impl From<DispatchError> for NotifyError {
    fn from(_: DispatchError) -> Self {
        Self::Shutdown
    }
}

/// Failure reported by an endpoint directory.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DirectoryError {
    pub message: String,
}

impl DirectoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Errors returned by the dispatch pipeline itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Pipeline has been shut down.
    #[error("dispatcher is shut down")]
    Shutdown,

    /// Workers were still running when the shutdown grace period ran out.
    #[error("workers still running after {grace:?} shutdown grace period")]
    ShutdownTimeout {
        grace: Duration,
    },
}

/// Invalid sender configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Result of classifying one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 2xx response. The chain ends.
    Delivered(u16),

    /// 410 Gone. The receiver revoked the endpoint; the chain ends quietly.
    Gone,

    /// Anything else. The pipeline escalates or abandons.
    Retry(FailureReason),
}

impl DeliveryOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryOutcome::Retry(_))
    }
}

/// Why a single delivery attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("request could not be built: {0}")]
    Request(String),

    #[error("endpoint returned status {0}")]
    UnexpectedStatus(u16),
}
