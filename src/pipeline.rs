//! Staged retry dispatch.
//!
//! The pipeline is a ladder of stages. Stage 0 attempts immediately; every
//! later stage waits its configured delay, measured from the moment the item
//! was escalated into it, before attempting again. Each stage has its own
//! queue and its own pool of `max_concurrency` workers, so a backed-up retry
//! stage never holds up first attempts.
//!
//! Delivery is best effort and in memory only. Shutdown drops anything that
//! is queued or waiting out a delay; at most the attempts already on the wire
//! get to finish.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::classify::classify;
use crate::config::SenderConfig;
use crate::error::{ConfigError, DeliveryOutcome, DispatchError};
use crate::request::build_request;
use crate::transport::Transport;
use crate::types::WorkItem;

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

/// Capability to accept work items for delivery.
///
/// The notification manager only depends on this trait, so another dispatch
/// strategy can replace [`StagedSender`] without touching it.
#[async_trait]
pub trait WorkItemSender: Send + Sync {
    /// Enqueue items for their first attempt. Does not wait for delivery.
    async fn submit(&self, items: Vec<WorkItem>) -> Result<(), DispatchError>;
}

/// A work item waiting in a stage queue.
#[derive(Debug)]
struct Queued {
    enqueued_at: Instant,
    item: WorkItem,
}

type StageQueue = Arc<Mutex<mpsc::UnboundedReceiver<Queued>>>;

/// Shared, read-only context for the workers of one stage.
struct StageContext {
    index: usize,
    delay: Duration,
    next: Option<mpsc::UnboundedSender<Queued>>,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}

/// The staged retry pipeline.
///
/// One instance is meant to live as long as the hosting process and be
/// shared by reference. Workers are spawned on the current tokio runtime
/// when the sender is created.
pub struct StagedSender {
    intake: mpsc::UnboundedSender<Queued>,
    queues: Vec<StageQueue>,
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
    config: SenderConfig,
}

impl StagedSender {
    /// Build the ladder and start `max_concurrency` workers per stage.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: SenderConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        config.validate()?;

        let cancel = CancellationToken::new();
        let stage_count = config.stage_count();

        let mut senders = Vec::with_capacity(stage_count);
        let mut queues = Vec::with_capacity(stage_count);
        for _ in 0..stage_count {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            queues.push(Arc::new(Mutex::new(rx)));
        }

        let delays = std::iter::once(Duration::ZERO).chain(config.retry_delays.iter().copied());

        let mut worker_handles = Vec::with_capacity(stage_count * config.max_concurrency);
        for (index, (queue, delay)) in queues.iter().zip(delays).enumerate() {
            let ctx = Arc::new(StageContext {
                index,
                delay,
                next: senders.get(index + 1).cloned(),
                transport: transport.clone(),
                cancel: cancel.clone(),
            });

            for _ in 0..config.max_concurrency {
                worker_handles.push(tokio::spawn(stage_worker(queue.clone(), ctx.clone())));
            }
        }

        let intake = senders.swap_remove(0);

        info!(
            stages = stage_count,
            workers_per_stage = config.max_concurrency,
            "started webhook sender with {} attempt(s) per delivery",
            stage_count
        );

        Ok(Self {
            intake,
            queues,
            worker_handles: Mutex::new(worker_handles),
            cancel,
            config,
        })
    }

    /// Number of attempts a failing item receives before it is abandoned.
    pub fn stage_count(&self) -> usize {
        self.queues.len()
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop accepting work and wait for in-flight attempts.
    ///
    /// Delay waits are aborted and their items dropped. Queued items that
    /// have not started are dropped. Attempts already on the wire may finish
    /// within `shutdown_grace`; they are never escalated. Calling this again
    /// after a completed shutdown is a no-op.
    pub async fn shutdown(&self) -> Result<(), DispatchError> {
        self.cancel.cancel();

        for queue in &self.queues {
            queue.lock().await.close();
        }

        let handles = std::mem::take(&mut *self.worker_handles.lock().await);
        if handles.is_empty() {
            return Ok(());
        }

        let grace = self.config.shutdown_grace;
        info!(
            workers = handles.len(),
            grace_seconds = grace.as_secs(),
            "shutting down webhook sender"
        );

        let join_all = async {
            for handle in handles {
                if let Err(join_error) = handle.await {
                    error!(error = %join_error, "webhook worker panicked during shutdown");
                }
            }
        };

        let result = match tokio::time::timeout(grace, join_all).await {
            Ok(()) => Ok(()),
            Err(_elapsed) => {
                error!(
                    grace_seconds = grace.as_secs(),
                    "webhook sender shutdown timed out, some attempts may still be running"
                );
                Err(DispatchError::ShutdownTimeout { grace })
            }
        };

        for (stage, queue) in self.queues.iter().enumerate() {
            let mut queue = queue.lock().await;
            while let Ok(queued) = queue.try_recv() {
                drop_on_shutdown(&queued.item, stage);
            }
        }

        if result.is_ok() {
            info!("webhook sender shut down");
        }
        result
    }
}

#[async_trait]
impl WorkItemSender for StagedSender {
    async fn submit(&self, items: Vec<WorkItem>) -> Result<(), DispatchError> {
        if self.cancel.is_cancelled() {
            return Err(DispatchError::Shutdown);
        }

        let enqueued_at = Instant::now();
        for mut item in items {
            item.offset = 0;
            self.intake
                .send(Queued { enqueued_at, item })
                .map_err(|_| DispatchError::Shutdown)?;
        }
        Ok(())
    }
}

impl Drop for StagedSender {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() {
            warn!("webhook sender dropped without shutdown, cancelling workers");
            self.cancel.cancel();

            for (stage, queue) in self.queues.iter().enumerate() {
                // A worker holding the lock is parked on an empty queue.
                let Ok(mut queue) = queue.try_lock() else { continue };
                queue.close();
                while let Ok(queued) = queue.try_recv() {
                    drop_on_shutdown(&queued.item, stage);
                }
            }
        }
    }
}

/// Worker loop for one stage.
///
/// Pulls items off the stage queue, waits out the stage delay, then makes one
/// attempt. Cancellation is observed while waiting for work, during the
/// delay, and right before the attempt; an attempt that has started runs to
/// completion.
async fn stage_worker(queue: StageQueue, ctx: Arc<StageContext>) {
    loop {
        let queued = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            queued = async { queue.lock().await.recv().await } => queued,
        };

        let Some(queued) = queued else { break };

        if !ctx.delay.is_zero() {
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => {
                    drop_on_shutdown(&queued.item, ctx.index);
                    break;
                }
                _ = sleep_until(queued.enqueued_at + ctx.delay) => {}
            }
        }

        if ctx.cancel.is_cancelled() {
            drop_on_shutdown(&queued.item, ctx.index);
            break;
        }

        attempt(queued.item, &ctx).await;
    }
}

/// Make one delivery attempt and act on the outcome.
async fn attempt(item: WorkItem, ctx: &StageContext) {
    let request = build_request(&item);
    let outcome = classify(ctx.transport.send(request).await);

    match outcome {
        DeliveryOutcome::Delivered(status) => {
            metric_inc("webhook.delivery.delivered");
            info!(
                work_item_id = %item.id,
                endpoint_id = %item.endpoint.id,
                stage = ctx.index,
                status,
                "webhook delivered"
            );
        }
        DeliveryOutcome::Gone => {
            metric_inc("webhook.delivery.gone");
            info!(
                work_item_id = %item.id,
                endpoint_id = %item.endpoint.id,
                stage = ctx.index,
                "endpoint responded 410 Gone, stopping delivery"
            );
        }
        DeliveryOutcome::Retry(reason) => {
            warn!(
                work_item_id = %item.id,
                endpoint_id = %item.endpoint.id,
                stage = ctx.index,
                error = %reason,
                "webhook delivery attempt failed"
            );

            if ctx.cancel.is_cancelled() {
                drop_on_shutdown(&item, ctx.index);
                return;
            }

            escalate(item, ctx);
        }
    }
}

/// Move a failed item to the next stage, or give up after the last one.
fn escalate(mut item: WorkItem, ctx: &StageContext) {
    item.offset = ctx.index + 1;

    let Some(next) = ctx.next.as_ref() else {
        metric_inc("webhook.delivery.abandoned");
        error!(
            work_item_id = %item.id,
            endpoint_id = %item.endpoint.id,
            attempts = item.offset,
            "giving up on webhook after final attempt"
        );
        return;
    };

    let queued = Queued {
        enqueued_at: Instant::now(),
        item,
    };

    match next.send(queued) {
        Ok(()) => metric_inc("webhook.delivery.retry_scheduled"),
        Err(mpsc::error::SendError(queued)) => drop_on_shutdown(&queued.item, ctx.index + 1),
    }
}

fn drop_on_shutdown(item: &WorkItem, stage: usize) {
    metric_inc("webhook.delivery.shutdown_dropped");
    warn!(
        work_item_id = %item.id,
        endpoint_id = %item.endpoint.id,
        stage,
        "dropping pending webhook attempt on shutdown"
    );
}
