use serde::Serialize;

use crate::observability::MetricsSnapshot;
use crate::pool::PoolState;

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub state: PoolState,
    pub workers: usize,
    pub metrics: MetricsSnapshot,
    pub version: &'static str,
}
