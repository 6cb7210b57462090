use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::outcome::Outcome;
use super::worker::{self, Job};
use crate::extract::Extractor;
use crate::observability::PoolMetrics;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("worker pool is not accepting jobs")]
    PoolUnavailable,
}

/// Pool lifecycle: `Uninitialized -> Running -> Draining -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    Uninitialized,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub worker_count: usize,
    /// Jobs buffered while every worker is busy; further submitters wait
    pub queue_capacity: usize,
}

impl PoolConfig {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            queue_capacity: worker_count,
        }
    }
}

/// Hands jobs to a fixed set of workers and routes each outcome back
/// to the caller that submitted it.
///
/// At most `worker_count` extractions run at any time. Jobs submitted while
/// all workers are busy wait in a FIFO queue; submitters beyond the queue
/// capacity wait for a slot in FIFO order as well.
pub struct Dispatcher {
    sender: RwLock<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    state: watch::Sender<PoolState>,
    metrics: Arc<PoolMetrics>,
}

impl Dispatcher {
    /// Start `config.worker_count` workers, building one extractor per worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<E, F>(config: &PoolConfig, metrics: Arc<PoolMetrics>, factory: F) -> Self
    where
        E: Extractor + 'static,
        F: FnMut(usize) -> E,
    {
        Self::with_extractors(
            config.queue_capacity,
            metrics,
            (0..config.worker_count).map(factory),
        )
    }

    /// Start one worker per extractor
    pub fn with_extractors<E, I>(queue_capacity: usize, metrics: Arc<PoolMetrics>, extractors: I) -> Self
    where
        E: Extractor + 'static,
        I: IntoIterator<Item = E>,
    {
        let state = watch::Sender::new(PoolState::Uninitialized);
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(rx));

        let workers: Vec<JoinHandle<()>> = extractors
            .into_iter()
            .enumerate()
            .map(|(worker_id, extractor)| {
                worker::spawn(worker_id, Arc::new(extractor), queue.clone(), metrics.clone())
            })
            .collect();

        let worker_count = workers.len();
        info!(worker_count, queue_capacity, "Worker pool running");
        state.send_replace(PoolState::Running);

        Self {
            sender: RwLock::new(Some(tx)),
            workers: Mutex::new(workers),
            worker_count,
            state,
            metrics,
        }
    }

    /// Submit a URL and wait for its outcome.
    ///
    /// The URL is treated as an opaque string. Domain failures come back as
    /// an [`Outcome`]; the only error is submitting after shutdown began.
    pub async fn submit(&self, url: impl Into<String>) -> Result<Outcome, DispatchError> {
        let Some(sender) = self.sender.read().await.clone() else {
            self.metrics.job_rejected();
            return Err(DispatchError::PoolUnavailable);
        };

        let (tx, rx) = oneshot::channel();
        let job = Job {
            id: Uuid::new_v4(),
            url: url.into(),
            respond_to: tx,
        };
        let job_id = job.id;

        debug!(%job_id, url = %job.url, "Submitting job");
        if sender.send(job).await.is_err() {
            warn!(%job_id, "Job queue closed, job not accepted");
            self.metrics.job_rejected();
            return Err(DispatchError::PoolUnavailable);
        }
        self.metrics.job_submitted();
        drop(sender);

        match rx.await {
            Ok(outcome) => Ok(outcome),
            Err(_) => {
                warn!(%job_id, "Worker dropped job without a result");
                Ok(Outcome::InternalError("worker dropped the job".to_string()))
            }
        }
    }

    /// Stop admitting new jobs. Queued and running jobs still complete.
    pub async fn begin_shutdown(&self) {
        if self.sender.write().await.take().is_some() {
            self.state.send_if_modified(|state| {
                if *state == PoolState::Running {
                    *state = PoolState::Draining;
                    true
                } else {
                    false
                }
            });
            info!("Worker pool draining");
        }
    }

    /// Close admission, wait for every worker to finish its queue, then stop.
    pub async fn shutdown(&self) {
        self.begin_shutdown().await;

        let mut workers = self.workers.lock().await;
        for handle in workers.drain(..) {
            if let Err(err) = handle.await {
                warn!(error = %err, "Worker task ended abnormally");
            }
        }

        if self.state.send_replace(PoolState::Stopped) != PoolState::Stopped {
            info!("Worker pool stopped");
        }
    }

    pub fn state(&self) -> PoolState {
        *self.state.borrow()
    }

    /// Configured number of workers
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn metrics(&self) -> &Arc<PoolMetrics> {
        &self.metrics
    }
}
