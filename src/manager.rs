use std::sync::Arc;

use tracing::{debug, info};

use crate::directory::EndpointDirectory;
use crate::error::NotifyError;
use crate::pipeline::WorkItemSender;
use crate::types::{SubjectKey, WorkItem};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

/// Turns one notification into one work item per registered endpoint.
#[derive(Clone)]
pub struct NotificationManager {
    directory: Arc<dyn EndpointDirectory>,
    sender: Arc<dyn WorkItemSender>,
}

impl NotificationManager {
    pub fn new(directory: Arc<dyn EndpointDirectory>, sender: Arc<dyn WorkItemSender>) -> Self {
        Self { directory, sender }
    }

    /// Fan `payload` out to every endpoint registered by `subject`.
    ///
    /// Returns the number of endpoints dispatched to as soon as the work is
    /// queued. It says nothing about whether any delivery succeeds; outcomes
    /// are only visible in logs.
    ///
    /// # Errors
    ///
    /// - `Validation` if `subject` or `payload` is empty
    /// - `Collaborator` if the directory lookup fails
    /// - `Shutdown` if the sender no longer accepts work
    ///
    /// In every error case nothing has been dispatched.
    pub async fn notify(&self, subject: &str, payload: &str) -> Result<usize, NotifyError> {
        if subject.trim().is_empty() {
            return Err(NotifyError::validation("subject"));
        }
        if payload.is_empty() {
            return Err(NotifyError::validation("payload"));
        }

        let subject = SubjectKey::new(subject);
        let endpoints = self.directory.list_endpoints(&subject).await?;
        let count = endpoints.len();

        if count == 0 {
            debug!(subject = %subject, "no webhooks registered, nothing to notify");
            return Ok(0);
        }

        let payload: Arc<str> = Arc::from(payload);
        let items = endpoints
            .into_iter()
            .map(|endpoint| WorkItem::new(Arc::new(endpoint), payload.clone()))
            .collect();

        self.sender.submit(items).await?;

        metric_inc("webhook.notify.fanout");
        info!(subject = %subject, endpoints = count, "notification dispatched");
        Ok(count)
    }
}
