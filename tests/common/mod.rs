//! Shared helpers for the integration tests.
//!
//! `ScriptedTransport` answers each URL from a fixed script and records when
//! every attempt happened, which lets the retry ladder be tested with paused
//! tokio time instead of real minutes.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;
use webhook_notifier::{
    DispatchError, EndpointDirectory, FailureReason, OutboundRequest, SubjectKey, Transport,
    WorkItem, WorkItemSender, Endpoint, DirectoryError,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A log event emitted by the notifier.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
}

/// Layer that records every event it sees.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// Events from this crate only.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.target.starts_with("webhook_notifier"))
            .cloned()
            .collect()
    }

    pub fn at_least(&self, level: Level) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| e.level <= level).collect()
    }

    pub fn with_message(&self, message: &str) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| e.message == message).collect()
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldRecorder::default();
        event.record(&mut visitor);

        let message = visitor.fields.remove("message").unwrap_or_default();
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldRecorder {
    fields: HashMap<String, String>,
}

impl Visit for FieldRecorder {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.fields.insert(field.name().to_string(), format!("{value:?}"));
    }
}

/// Record events on the current thread until the guard is dropped.
///
/// Works with the default current-thread test runtime, where spawned
/// workers run on the test thread.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(logs.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

/// One scripted response.
#[derive(Debug, Clone)]
pub enum Step {
    Status(u16),
    Fail,
    /// Stay silent for the given time, then answer with the status.
    Slow(Duration, u16),
}

#[derive(Debug, Clone)]
pub struct Attempt {
    pub url: String,
    pub at: Instant,
    pub request: OutboundRequest,
}

/// Transport answering from per-URL scripts. The last step repeats once a
/// script runs out; URLs without a script get 200.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    attempts: Mutex<Vec<Attempt>>,
    completed: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, url: &str, steps: impl IntoIterator<Item = Step>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), steps.into_iter().collect());
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, url: &str) -> Vec<Attempt> {
        self.attempts().into_iter().filter(|a| a.url == url).collect()
    }

    /// Number of attempts that ran to completion.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    fn next_step(&self, url: &str) -> Step {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(url) {
            Some(steps) if steps.len() > 1 => steps.pop_front().unwrap(),
            Some(steps) => steps.front().cloned().unwrap_or(Step::Status(200)),
            None => Step::Status(200),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<u16, FailureReason> {
        self.attempts.lock().unwrap().push(Attempt {
            url: request.url.clone(),
            at: Instant::now(),
            request: request.clone(),
        });

        let step = self.next_step(&request.url);
        let result = match step {
            Step::Status(status) => Ok(status),
            Step::Fail => Err(FailureReason::Network("connection refused".into())),
            Step::Slow(delay, status) => {
                tokio::time::sleep(delay).await;
                Ok(status)
            }
        };

        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

/// Directory whose lookups always fail.
pub struct FailingDirectory;

#[async_trait]
impl EndpointDirectory for FailingDirectory {
    async fn list_endpoints(&self, _subject: &SubjectKey) -> Result<Vec<Endpoint>, DirectoryError> {
        Err(DirectoryError::new("registration store unavailable"))
    }
}

/// Sender that only records what it was given.
#[derive(Default)]
pub struct RecordingSender {
    pub submitted: Mutex<Vec<WorkItem>>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl WorkItemSender for RecordingSender {
    async fn submit(&self, items: Vec<WorkItem>) -> Result<(), DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().extend(items);
        Ok(())
    }
}
