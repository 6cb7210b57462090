//! Pool counters and gauges

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

use crate::pool::Outcome;

/// Metrics handle shared by the dispatcher and its workers
#[derive(Debug, Default)]
pub struct PoolMetrics {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    not_found: AtomicU64,
    upstream_errors: AtomicU64,
    internal_errors: AtomicU64,
    rejected: AtomicU64,
    worker_restarts: AtomicU64,
    live_workers: AtomicUsize,
    busy_workers: AtomicUsize,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "rejected", "Metric incremented");
    }

    pub fn job_started(&self) {
        self.busy_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_finished(&self, outcome: &Outcome) {
        self.busy_workers.fetch_sub(1, Ordering::Relaxed);

        let counter = match outcome {
            Outcome::Success(_) => &self.succeeded,
            Outcome::NotFound => &self.not_found,
            Outcome::UpstreamError(_) => &self.upstream_errors,
            Outcome::InternalError(_) => &self.internal_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = outcome.kind(), "Metric incremented");
    }

    pub fn worker_started(&self) {
        self.live_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_stopped(&self) {
        self.live_workers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn worker_restarted(&self) {
        self.worker_restarts.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "worker_restarts", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            worker_restarts: self.worker_restarts.load(Ordering::Relaxed),
            live_workers: self.live_workers.load(Ordering::Relaxed),
            busy_workers: self.busy_workers.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub succeeded: u64,
    pub not_found: u64,
    pub upstream_errors: u64,
    pub internal_errors: u64,
    pub rejected: u64,
    pub worker_restarts: u64,
    pub live_workers: usize,
    pub busy_workers: usize,
}
