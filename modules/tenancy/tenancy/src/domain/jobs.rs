//! Queue and background worker for deferred event delivery.
//!
//! Jobs are consumed from a bounded channel. Jobs for the same tenant run one
//! at a time in enqueue order. Jobs for different tenants run concurrently up
//! to the configured concurrency, and a tenant waiting on its own earlier job
//! never holds an execution slot. A job that fails is retried with linear
//! backoff until `max_attempts` is reached. Pending jobs can be cancelled; a
//! job that has started always runs to completion. Jobs still queued when the
//! worker stops end up cancelled.
//!
//! Final states are kept for the most recent `retained_jobs` finished jobs.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::dispatcher::{DispatchError, EventHandler, EventPublisher};
use super::events::LifecycleEvent;
use crate::config::WorkerConfig;

pub type JobId = Uuid;

const DEFAULT_RETAINED_JOBS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Running => f.write_str("running"),
            Self::Completed => f.write_str("completed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CancelError {
    #[error("job {0} not found")]
    UnknownJob(JobId),

    #[error("job {id} cannot be cancelled, it is {state}")]
    NotPending { id: JobId, state: JobState },
}

pub(crate) struct Job {
    id: JobId,
    handler: Arc<dyn EventHandler>,
    event: LifecycleEvent,
}

/// Receiving half handed to the [`JobWorker`].
pub struct JobReceiver(mpsc::Receiver<Job>);

/// Producer side of the job queue plus job state bookkeeping.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
    states: Arc<DashMap<JobId, JobState>>,
    finished: Arc<Mutex<VecDeque<JobId>>>,
    retained: usize,
}

impl JobQueue {
    #[must_use]
    pub fn new(capacity: usize) -> (Self, JobReceiver) {
        Self::with_retention(capacity, DEFAULT_RETAINED_JOBS)
    }

    /// Queue holding at most `capacity` undelivered jobs and remembering the
    /// final state of the last `retained` finished ones.
    #[must_use]
    pub fn with_retention(capacity: usize, retained: usize) -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                states: Arc::new(DashMap::new()),
                finished: Arc::new(Mutex::new(VecDeque::new())),
                retained,
            },
            JobReceiver(receiver),
        )
    }

    pub(crate) async fn enqueue(
        &self,
        handler: Arc<dyn EventHandler>,
        event: LifecycleEvent,
    ) -> Result<JobId, DispatchError> {
        let id = Uuid::now_v7();
        self.states.insert(id, JobState::Pending);
        debug!(job_id = %id, handler = handler.name(), event = %event.kind, "Enqueuing job");
        if self.sender.send(Job { id, handler, event }).await.is_err() {
            self.states.remove(&id);
            return Err(DispatchError::QueueClosed);
        }
        Ok(id)
    }

    /// Cancel a job that has not started yet.
    ///
    /// # Errors
    /// Returns [`CancelError`] if the job is unknown or no longer pending.
    pub fn cancel(&self, id: JobId) -> Result<(), CancelError> {
        let mut state = self.states.get_mut(&id).ok_or(CancelError::UnknownJob(id))?;
        if *state != JobState::Pending {
            return Err(CancelError::NotPending {
                id,
                state: state.clone(),
            });
        }
        *state = JobState::Cancelled;
        info!(job_id = %id, "Job cancelled");
        Ok(())
    }

    #[must_use]
    pub fn state(&self, id: JobId) -> Option<JobState> {
        self.states.get(&id).map(|s| s.clone())
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| *s.value() == JobState::Pending)
            .count()
    }

    /// Jobs whose state is still known, pending and running ones included.
    #[must_use]
    pub fn tracked_jobs(&self) -> usize {
        self.states.len()
    }

    /// Move a job from pending to running; false if it was cancelled.
    fn begin(&self, id: JobId) -> bool {
        match self.states.get_mut(&id) {
            Some(mut state) if *state == JobState::Pending => {
                *state = JobState::Running;
                true
            }
            _ => false,
        }
    }

    fn finish(&self, id: JobId, state: JobState) {
        self.states.insert(id, state);
        let mut finished = self.finished.lock();
        finished.push_back(id);
        while finished.len() > self.retained {
            if let Some(evicted) = finished.pop_front() {
                self.states.remove(&evicted);
            }
        }
    }
}

/// Background consumer executing deferred handlers.
pub struct JobWorker {
    receiver: JobReceiver,
    queue: JobQueue,
    publisher: Arc<dyn EventPublisher>,
    config: WorkerConfig,
}

impl JobWorker {
    #[must_use]
    pub fn new(
        receiver: JobReceiver,
        queue: JobQueue,
        publisher: Arc<dyn EventPublisher>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            receiver,
            queue,
            publisher,
            config,
        }
    }

    /// Consume jobs until `cancel` fires or every producer is gone, then wait
    /// for dispatched jobs to finish. Jobs left in the channel are cancelled.
    pub async fn run(mut self, cancel: CancellationToken) {
        let concurrency = self.config.concurrency.max(1);
        let backlog_size = self.config.queue_capacity.max(concurrency);
        info!(concurrency, "Starting tenancy job worker");
        // Execution slots, taken only once the tenant's previous job is done.
        let executing = Arc::new(Semaphore::new(concurrency));
        // Dispatched jobs, running or waiting on their tenant.
        let backlog = Arc::new(Semaphore::new(backlog_size));
        // Completion signal of the most recently dispatched job per tenant.
        let mut tails: HashMap<String, oneshot::Receiver<()>> = HashMap::new();

        loop {
            let slot = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                slot = Arc::clone(&backlog).acquire_owned() => match slot {
                    Ok(slot) => slot,
                    Err(_) => break,
                },
            };
            let job = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                job = self.receiver.0.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let (done, done_rx) = oneshot::channel::<()>();
            tails.retain(|_, tail| matches!(tail.try_recv(), Err(TryRecvError::Empty)));
            let previous = tails.insert(job.event.tenant_id().to_owned(), done_rx);

            let queue = self.queue.clone();
            let publisher = Arc::clone(&self.publisher);
            let config = self.config.clone();
            let executing = Arc::clone(&executing);
            tokio::spawn(async move {
                let _slot = slot;
                if let Some(previous) = previous {
                    // Resolves once the sender of the previous job is dropped.
                    previous.await.ok();
                }
                if let Ok(_permit) = executing.acquire().await {
                    execute(&job, &queue, publisher.as_ref(), &config).await;
                }
                drop(done);
            });
        }

        self.cancel_undelivered();
        let all = u32::try_from(backlog_size).unwrap_or(u32::MAX);
        if backlog.acquire_many(all).await.is_ok() {
            info!("Tenancy job worker drained");
        }
    }

    fn cancel_undelivered(&mut self) {
        self.receiver.0.close();
        let mut cancelled = 0_usize;
        while let Ok(job) = self.receiver.0.try_recv() {
            self.queue.finish(job.id, JobState::Cancelled);
            cancelled += 1;
        }
        if cancelled > 0 {
            warn!(cancelled, "Worker stopped with undelivered jobs, marked them cancelled");
        }
    }
}

async fn execute(
    job: &Job,
    queue: &JobQueue,
    publisher: &dyn EventPublisher,
    config: &WorkerConfig,
) {
    if !queue.begin(job.id) {
        debug!(job_id = %job.id, "Skipping cancelled job");
        queue.finish(job.id, JobState::Cancelled);
        return;
    }

    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match job.handler.handle(&job.event, publisher).await {
            Ok(()) => {
                debug!(job_id = %job.id, attempt, "Job completed");
                queue.finish(job.id, JobState::Completed);
                return;
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    job_id = %job.id,
                    handler = job.handler.name(),
                    attempt,
                    error = %format!("{e:#}"),
                    "Job failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(
                    config.retry_backoff_ms.saturating_mul(u64::from(attempt)),
                ))
                .await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    job_id = %job.id,
                    handler = job.handler.name(),
                    correlation_id = %job.event.correlation_id,
                    attempts = attempt,
                    error = %format!("{e:#}"),
                    "Job failed permanently"
                );
                queue.finish(job.id, JobState::Failed(format!("{e:#}")));
                return;
            }
        }
    }
}
