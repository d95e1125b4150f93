//! In-process webhook fan-out with a staged retry ladder.
//!
//! A notification for a subject is turned into one work item per endpoint
//! the subject registered. Items run through a fixed ladder of stages: an
//! immediate attempt, then one attempt per configured retry delay (by
//! default 1 and 4 minutes). Every stage has its own bounded worker pool.
//!
//! ## Guarantees
//! - `notify` returns the fan-out count without waiting for delivery
//! - Bounded concurrency per stage
//! - Per-item attempts are strictly sequential
//! - A slow or dead endpoint does not block the others
//!
//! ## Non-Guarantees
//! - Durability across restarts
//! - At-least-once delivery: shutdown drops queued and delayed retries
//! - Delivery status reporting; outcomes are only logged
//!
//! ## Outcome policy
//! A 2xx response ends the chain. A 410 Gone ends it quietly, as the
//! receiver revoking the hook. Everything else (any other status, timeouts,
//! network errors) moves the item to the next stage, and the item is
//! abandoned after the last one.

mod classify;
mod config;
mod directory;
mod error;
mod manager;
mod pipeline;
mod request;
mod transport;
mod types;

pub use classify::{classify, STATUS_GONE};
pub use config::{ClientConfig, SenderConfig, DEFAULT_MAX_CONCURRENCY};
pub use directory::{EndpointDirectory, InMemoryDirectory};
pub use error::{
    ConfigError,
    DeliveryOutcome,
    DirectoryError,
    DispatchError,
    FailureReason,
    NotifyError,
};
pub use manager::NotificationManager;
pub use pipeline::{StagedSender, WorkItemSender};
pub use request::{build_request, HeaderPlacement, OutboundRequest, JSON_CONTENT_TYPE};
pub use transport::{HttpTransport, Transport};
pub use types::{Endpoint, EndpointId, SubjectKey, WorkItem, WorkItemId};
