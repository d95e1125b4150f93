use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered HTTP callback target.
///
/// An `Endpoint` describes *where* a notification is delivered and which
/// extra headers accompany it. It is owned by the registration directory and
/// treated as immutable for the duration of a delivery chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Subject (user / tenant) that registered this endpoint.
    pub owner: SubjectKey,

    /// Logical identifier for the endpoint.
    pub id: EndpointId,

    /// Target URL for delivery.
    pub url: String,

    /// Optional free-text description.
    pub description: Option<String>,

    /// Extra headers sent with every delivery.
    ///
    /// Names are matched case-insensitively by the transport.
    pub headers: HashMap<String, String>,
}

impl Endpoint {
    /// Create an endpoint with a freshly generated id and no headers.
    pub fn new(owner: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            owner: SubjectKey(owner.into()),
            id: EndpointId::generate(),
            url: url.into(),
            description: None,
            headers: HashMap::new(),
        }
    }

    /// Use a caller-chosen id instead of a generated one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = EndpointId(id.into());
        self
    }

    /// Attach a free-text description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a header sent with every delivery to this endpoint.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Key identifying the subject that owns endpoints and triggers notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectKey(pub String);

impl SubjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for an endpoint.
///
/// This is a strongly-typed wrapper to avoid accidental mixing
/// of endpoint IDs with other string identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointId(pub String);

impl EndpointId {
    /// Generate a new random id in simple (hyphen-less) form.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkItemId(pub Uuid);

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// One in-flight delivery obligation for one endpoint.
///
/// A work item sits in exactly one pipeline stage at a time. `offset` is the
/// index of that stage; it only ever grows, and only the pipeline changes it.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub endpoint: Arc<Endpoint>,
    pub payload: Arc<str>,
    pub offset: usize,
}

impl WorkItem {
    /// Create a work item at offset 0.
    pub fn new(endpoint: Arc<Endpoint>, payload: Arc<str>) -> Self {
        Self {
            id: WorkItemId(Uuid::new_v4()),
            endpoint,
            payload,
            offset: 0,
        }
    }
}
