//! Ordered, fail-fast provisioning pipelines.
//!
//! A [`Pipeline`] is bound to the event kind that triggers it and runs its
//! steps strictly in declared order. The first failing step halts the run;
//! steps that already completed are not rolled back. After each successful
//! step its sub-event (if any) is published, and once the run is over the
//! configured terminal event is published.

use std::sync::Arc;

use async_trait::async_trait;
use tenancy_sdk::Tenant;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::dispatcher::{EventHandler, EventPublisher};
use super::events::{EventKind, LifecycleEvent};
use super::provisioner::ProvisionError;

/// Execution context shared by the steps of one run.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub correlation_id: Uuid,
    pub pipeline: String,
    pub started_at: OffsetDateTime,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepError {
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("{0}")]
    Failed(String),
}

/// A named unit of provisioning work. Steps own no per-run state.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    fn name(&self) -> &str;

    /// Sub-event published after the step succeeds.
    fn emits(&self) -> Option<EventKind> {
        None
    }

    /// # Errors
    /// A [`StepError`] halts the pipeline.
    async fn run(&self, tenant: &Tenant, ctx: &StepContext) -> Result<(), StepError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub index: usize,
    pub step: String,
    pub error: StepError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub pipeline: String,
    pub correlation_id: Uuid,
    pub completed_steps: Vec<String>,
    pub failure: Option<StepFailure>,
}

impl PipelineResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

pub struct Pipeline {
    name: String,
    trigger: EventKind,
    steps: Vec<Arc<dyn PipelineStep>>,
    queued: bool,
    on_success: Option<EventKind>,
    on_failure: Option<EventKind>,
}

impl Pipeline {
    #[must_use]
    pub fn new(name: impl Into<String>, trigger: EventKind) -> Self {
        Self {
            name: name.into(),
            trigger,
            steps: Vec::new(),
            queued: false,
            on_success: None,
            on_failure: None,
        }
    }

    #[must_use]
    pub fn step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Run on the background job worker instead of inline.
    #[must_use]
    pub fn queued(mut self, queued: bool) -> Self {
        self.queued = queued;
        self
    }

    #[must_use]
    pub fn on_success(mut self, kind: EventKind) -> Self {
        self.on_success = Some(kind);
        self
    }

    #[must_use]
    pub fn on_failure(mut self, kind: EventKind) -> Self {
        self.on_failure = Some(kind);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn trigger(&self) -> EventKind {
        self.trigger
    }

    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.queued
    }

    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step against the tenant carried by `event`.
    pub async fn run(
        &self,
        event: &LifecycleEvent,
        publisher: &dyn EventPublisher,
    ) -> PipelineResult {
        let span = info_span!(
            "tenancy.pipeline",
            pipeline = %self.name,
            tenant_id = %event.tenant.id,
            correlation_id = %event.correlation_id,
        );
        self.run_steps(event, publisher).instrument(span).await
    }

    async fn run_steps(
        &self,
        event: &LifecycleEvent,
        publisher: &dyn EventPublisher,
    ) -> PipelineResult {
        let ctx = StepContext {
            correlation_id: event.correlation_id,
            pipeline: self.name.clone(),
            started_at: OffsetDateTime::now_utc(),
        };
        let mut result = PipelineResult {
            pipeline: self.name.clone(),
            correlation_id: event.correlation_id,
            completed_steps: Vec::with_capacity(self.steps.len()),
            failure: None,
        };

        info!(steps = self.steps.len(), "Pipeline started");
        for (index, step) in self.steps.iter().enumerate() {
            if let Err(error) = step.run(&event.tenant, &ctx).await {
                error!(step = step.name(), index, %error, "Pipeline step failed");
                result.failure = Some(StepFailure {
                    index,
                    step: step.name().to_owned(),
                    error,
                });
                break;
            }
            result.completed_steps.push(step.name().to_owned());
            if let Some(kind) = step.emits() {
                let report = publisher.publish(event.derive(kind)).await;
                for failure in report.failures() {
                    warn!(
                        step = step.name(),
                        handler = %failure.handler,
                        "Sub-event handler failed"
                    );
                }
            }
        }

        let terminal = if result.is_success() {
            info!(completed = result.completed_steps.len(), "Pipeline completed");
            self.on_success
        } else {
            self.on_failure
        };
        if let Some(kind) = terminal {
            publisher.publish(event.derive(kind)).await;
        }
        result
    }
}

/// Dispatcher subscription running a pipeline for each triggering event.
pub struct PipelineListener {
    pipeline: Arc<Pipeline>,
}

impl PipelineListener {
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl EventHandler for PipelineListener {
    fn name(&self) -> &str {
        self.pipeline.name()
    }

    async fn handle(
        &self,
        event: &LifecycleEvent,
        publisher: &dyn EventPublisher,
    ) -> anyhow::Result<()> {
        let result = self.pipeline.run(event, publisher).await;
        match result.failure {
            None => Ok(()),
            Some(failure) => Err(anyhow::anyhow!(
                "pipeline '{}' failed at step {} ({}): {}",
                result.pipeline,
                failure.index,
                failure.step,
                failure.error
            )),
        }
    }
}
