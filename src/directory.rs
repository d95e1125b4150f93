use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DirectoryError;
use crate::types::{Endpoint, EndpointId, SubjectKey};

/// Source of the endpoints registered for a subject.
///
/// Implementations own endpoint storage and validation; the notifier only
/// reads from them.
#[async_trait]
pub trait EndpointDirectory: Send + Sync {
    async fn list_endpoints(&self, subject: &SubjectKey) -> Result<Vec<Endpoint>, DirectoryError>;
}

/// In-memory directory for embedded deployments and tests.
#[derive(Default)]
pub struct InMemoryDirectory {
    endpoints: RwLock<HashMap<SubjectKey, Vec<Endpoint>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint under its owner, replacing one with the same id.
    pub async fn register(&self, endpoint: Endpoint) {
        let mut guard = self.endpoints.write().await;
        let entries = guard.entry(endpoint.owner.clone()).or_default();
        entries.retain(|e| e.id != endpoint.id);
        entries.push(endpoint);
    }

    /// Remove an endpoint. Returns whether anything was removed.
    pub async fn remove(&self, owner: &SubjectKey, id: &EndpointId) -> bool {
        let mut guard = self.endpoints.write().await;
        let Some(entries) = guard.get_mut(owner) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| &e.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            guard.remove(owner);
        }
        removed
    }
}

#[async_trait]
impl EndpointDirectory for InMemoryDirectory {
    async fn list_endpoints(&self, subject: &SubjectKey) -> Result<Vec<Endpoint>, DirectoryError> {
        let guard = self.endpoints.read().await;
        Ok(guard.get(subject).cloned().unwrap_or_default())
    }
}
