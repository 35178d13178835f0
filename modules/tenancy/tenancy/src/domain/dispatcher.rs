//! In-process publish/subscribe for tenant lifecycle events.
//!
//! Handlers are registered per [`EventKind`] at startup and invoked in
//! registration order. A failing handler never stops the remaining handlers
//! for the same event; its failure is reported back to the publisher in the
//! [`PublishReport`].
//!
//! Each subscription picks a [`DeliveryMode`]. Synchronous handlers run
//! inline and the publisher waits for them. Deferred handlers are handed to
//! the [`JobQueue`] and executed by the background [`JobWorker`](super::jobs::JobWorker).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::events::{EventKind, LifecycleEvent};
use super::jobs::{JobId, JobQueue};

/// How a subscription receives events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Run inline; the publisher blocks until the handler returns.
    #[default]
    Synchronous,
    /// Enqueue for out-of-band execution by the job worker.
    Deferred,
}

/// A subscriber to lifecycle events.
///
/// Handlers may be invoked more than once for the same event (deferred
/// delivery retries failed jobs), so they must be idempotent.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    /// Any error is recorded as a handler failure for this delivery.
    async fn handle(
        &self,
        event: &LifecycleEvent,
        publisher: &dyn EventPublisher,
    ) -> anyhow::Result<()>;
}

/// Publishing side of the dispatcher, handed to handlers so they can emit
/// follow-up events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: LifecycleEvent) -> PublishReport;
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("handler '{handler}' requests deferred delivery but no job queue is configured")]
    NoJobQueue { handler: String },

    #[error("job queue is closed")]
    QueueClosed,
}

/// Result of delivering one event to one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    Failed(String),
    Enqueued(JobId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub handler: String,
    pub status: DeliveryStatus,
}

/// Aggregate per-handler outcomes of a single `publish` call.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub kind: EventKind,
    pub correlation_id: Uuid,
    pub outcomes: Vec<HandlerOutcome>,
}

impl PublishReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| !matches!(o.status, DeliveryStatus::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &HandlerOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, DeliveryStatus::Failed(_)))
    }

    pub fn enqueued(&self) -> impl Iterator<Item = JobId> + '_ {
        self.outcomes.iter().filter_map(|o| match o.status {
            DeliveryStatus::Enqueued(id) => Some(id),
            _ => None,
        })
    }
}

#[derive(Clone)]
struct Subscription {
    handler: Arc<dyn EventHandler>,
    mode: DeliveryMode,
}

/// Event dispatcher with explicit, per-kind handler registration.
#[derive(Default)]
pub struct EventDispatcher {
    subscriptions: RwLock<HashMap<EventKind, Vec<Subscription>>>,
    queue: Option<JobQueue>,
}

impl EventDispatcher {
    /// Dispatcher supporting synchronous subscriptions only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher that can also defer handlers onto `queue`.
    #[must_use]
    pub fn with_queue(queue: JobQueue) -> Self {
        Self {
            subscriptions: RwLock::default(),
            queue: Some(queue),
        }
    }

    /// Register `handler` for `kind`.
    ///
    /// # Errors
    /// Returns [`DispatchError::NoJobQueue`] for a deferred subscription on a
    /// dispatcher built without a job queue.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: Arc<dyn EventHandler>,
        mode: DeliveryMode,
    ) -> Result<(), DispatchError> {
        if mode == DeliveryMode::Deferred && self.queue.is_none() {
            return Err(DispatchError::NoJobQueue {
                handler: handler.name().to_owned(),
            });
        }
        debug!(event = %kind, handler = handler.name(), ?mode, "Subscribing handler");
        self.subscriptions
            .write()
            .entry(kind)
            .or_default()
            .push(Subscription { handler, mode });
        Ok(())
    }

    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscriptions.read().get(&kind).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn job_queue(&self) -> Option<&JobQueue> {
        self.queue.as_ref()
    }

    async fn deliver(&self, sub: &Subscription, event: &LifecycleEvent) -> DeliveryStatus {
        match sub.mode {
            DeliveryMode::Synchronous => match sub.handler.handle(event, self).await {
                Ok(()) => DeliveryStatus::Delivered,
                Err(e) => {
                    warn!(
                        event = %event.kind,
                        handler = sub.handler.name(),
                        correlation_id = %event.correlation_id,
                        error = %format!("{e:#}"),
                        "Event handler failed"
                    );
                    DeliveryStatus::Failed(format!("{e:#}"))
                }
            },
            DeliveryMode::Deferred => {
                let Some(queue) = self.queue.as_ref() else {
                    return DeliveryStatus::Failed(
                        DispatchError::NoJobQueue {
                            handler: sub.handler.name().to_owned(),
                        }
                        .to_string(),
                    );
                };
                match queue.enqueue(Arc::clone(&sub.handler), event.clone()).await {
                    Ok(id) => DeliveryStatus::Enqueued(id),
                    Err(e) => {
                        warn!(handler = sub.handler.name(), error = %e, "Failed to enqueue job");
                        DeliveryStatus::Failed(e.to_string())
                    }
                }
            }
        }
    }
}

#[async_trait]
impl EventPublisher for EventDispatcher {
    #[instrument(
        name = "tenancy.publish",
        skip(self, event),
        fields(
            event = %event.kind,
            tenant_id = %event.tenant.id,
            correlation_id = %event.correlation_id
        )
    )]
    async fn publish(&self, event: LifecycleEvent) -> PublishReport {
        let subscriptions = self
            .subscriptions
            .read()
            .get(&event.kind)
            .cloned()
            .unwrap_or_default();

        let mut outcomes = Vec::with_capacity(subscriptions.len());
        for sub in &subscriptions {
            let status = self.deliver(sub, &event).await;
            outcomes.push(HandlerOutcome {
                handler: sub.handler.name().to_owned(),
                status,
            });
        }

        debug!(handlers = outcomes.len(), "Event published");
        PublishReport {
            kind: event.kind,
            correlation_id: event.correlation_id,
            outcomes,
        }
    }
}
