//! Worker loop
//!
//! Each worker is a supervised tokio task. The extractor call runs in its own
//! task so a panic surfaces as a `JoinError` and becomes an internal error
//! instead of taking the worker down.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::outcome::Outcome;
use crate::extract::Extractor;
use crate::observability::PoolMetrics;

/// One submitted URL and the channel its outcome goes back on
#[derive(Debug)]
pub(crate) struct Job {
    pub id: Uuid,
    pub url: String,
    pub respond_to: oneshot::Sender<Outcome>,
}

/// Receiving half of the job queue, shared by every worker
pub(crate) type JobQueue = Arc<Mutex<mpsc::Receiver<Job>>>;

/// Spawn a supervised worker.
///
/// The worker keeps its extractor for its whole life; if the loop itself
/// panics it is restarted with the same extractor.
pub(crate) fn spawn(
    worker_id: usize,
    extractor: Arc<dyn Extractor>,
    queue: JobQueue,
    metrics: Arc<PoolMetrics>,
) -> JoinHandle<()> {
    let loop_metrics = metrics.clone();
    tokio::spawn(supervise(worker_id, metrics, move || {
        run(
            worker_id,
            extractor.clone(),
            queue.clone(),
            loop_metrics.clone(),
        )
    }))
}

/// Run the loop built by `start` until it returns, starting a fresh one
/// after every panic.
async fn supervise<F, Fut>(worker_id: usize, metrics: Arc<PoolMetrics>, mut start: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    metrics.worker_started();

    loop {
        match tokio::spawn(start()).await {
            Ok(()) => break,
            Err(err) if err.is_panic() => {
                error!(worker_id, "Worker loop panicked, restarting");
                metrics.worker_restarted();
            }
            Err(err) => {
                warn!(worker_id, error = %err, "Worker loop cancelled");
                break;
            }
        }
    }

    metrics.worker_stopped();
    debug!(worker_id, "Worker stopped");
}

/// Pull jobs until the queue is closed and drained
async fn run(
    worker_id: usize,
    extractor: Arc<dyn Extractor>,
    queue: JobQueue,
    metrics: Arc<PoolMetrics>,
) {
    loop {
        // The lock is only held while idle; it is released before the job runs.
        let next = queue.lock().await.recv().await;
        let Some(job) = next else {
            debug!(worker_id, "Job queue closed");
            return;
        };

        metrics.job_started();
        let outcome = process(worker_id, &extractor, &job).await;
        metrics.job_finished(&outcome);

        if job.respond_to.send(outcome).is_err() {
            debug!(worker_id, job_id = %job.id, "Caller gone before result delivery");
        }
    }
}

async fn process(worker_id: usize, extractor: &Arc<dyn Extractor>, job: &Job) -> Outcome {
    let url = job.url.trim_matches(['\r', '\n']).to_string();
    debug!(worker_id, job_id = %job.id, url, "Got url");

    let extractor = Arc::clone(extractor);
    let target = url.clone();
    let task = tokio::spawn(async move { extractor.extract(&target).await });

    let outcome = match task.await {
        Ok(metadata) => Outcome::classify(metadata),
        Err(err) if err.is_panic() => {
            error!(worker_id, job_id = %job.id, url, "Extractor panicked");
            Outcome::InternalError("extractor panicked".to_string())
        }
        Err(err) => Outcome::InternalError(err.to_string()),
    };

    match &outcome {
        Outcome::Success(_) => info!(worker_id, job_id = %job.id, url, "Url parsed"),
        Outcome::NotFound => warn!(worker_id, job_id = %job.id, url, "No info for url"),
        Outcome::UpstreamError(status) => {
            warn!(worker_id, job_id = %job.id, url, status, "Upstream returned an error status")
        }
        Outcome::InternalError(reason) => {
            warn!(worker_id, job_id = %job.id, url, reason, "Extraction failed")
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Metadata;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Extractor for Echo {
        async fn extract(&self, url: &str) -> Option<Metadata> {
            if url == "panic" {
                panic!("boom");
            }
            Some(Metadata {
                status: 200,
                url: Some(url.to_string()),
                ..Default::default()
            })
        }
    }

    fn job(url: &str) -> (Job, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let job = Job {
            id: Uuid::new_v4(),
            url: url.to_string(),
            respond_to: tx,
        };
        (job, rx)
    }

    #[tokio::test]
    async fn process_trims_line_breaks() {
        let extractor: Arc<dyn Extractor> = Arc::new(Echo);
        let (job, _rx) = job("https://example.com/\r\n");

        let outcome = process(0, &extractor, &job).await;
        match outcome {
            Outcome::Success(body) => assert!(body.contains(r#""url":"https://example.com/""#)),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn panic_becomes_internal_error_and_worker_survives() {
        let metrics = Arc::new(PoolMetrics::new());
        let (tx, rx) = mpsc::channel(4);
        let queue = Arc::new(Mutex::new(rx));
        let handle = spawn(0, Arc::new(Echo), queue, metrics.clone());

        let (first, first_rx) = job("panic");
        let (second, second_rx) = job("https://example.com/");
        tx.send(first).await.unwrap();
        tx.send(second).await.unwrap();

        assert!(matches!(first_rx.await.unwrap(), Outcome::InternalError(_)));
        assert!(matches!(second_rx.await.unwrap(), Outcome::Success(_)));

        drop(tx);
        handle.await.unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.internal_errors, 1);
        assert_eq!(snapshot.succeeded, 1);
        assert_eq!(snapshot.live_workers, 0);
        assert_eq!(snapshot.worker_restarts, 0);
    }

    #[tokio::test]
    async fn panicked_loop_is_restarted() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::sync::Notify;

        let metrics = Arc::new(PoolMetrics::new());
        let starts = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());
        let restarted = Arc::new(Notify::new());

        let supervisor = {
            let (starts, release, restarted) = (starts.clone(), release.clone(), restarted.clone());
            tokio::spawn(supervise(7, metrics.clone(), move || {
                let attempt = starts.fetch_add(1, Ordering::SeqCst);
                let (release, restarted) = (release.clone(), restarted.clone());
                async move {
                    if attempt == 0 {
                        panic!("loop invariant broken");
                    }
                    restarted.notify_one();
                    release.notified().await;
                }
            }))
        };

        restarted.notified().await;
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.worker_restarts, 1);
        assert_eq!(snapshot.live_workers, 1);
        assert_eq!(starts.load(Ordering::SeqCst), 2);

        release.notify_one();
        supervisor.await.unwrap();
        assert_eq!(metrics.snapshot().live_workers, 0);
        assert_eq!(metrics.snapshot().worker_restarts, 1);
    }
}
