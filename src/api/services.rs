use axum::{
    Json,
    extract::{RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use url::{ParseError, Url, form_urlencoded};

use super::{error::ApiError, models::HealthResponse, state::AppState};
use crate::pool::{Outcome, PoolState};

/// Link extraction endpoint (every path except /health)
///
/// Reads the `url` query parameter and hands it to the worker pool. A missing
/// or relative value is still submitted and ends up as "no result"; only input
/// that cannot be a URL reference at all is rejected up front. The outcome is
/// rendered as-is: the metadata JSON on success, an `{"status": "error", ...}`
/// body otherwise.
pub async fn extract_link(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Outcome, ApiError> {
    let url = query.as_deref().and_then(url_param).unwrap_or_default();

    if !is_url_reference(&url) {
        debug!(%url, "Rejecting invalid url");
        return Err(ApiError::InvalidUrl);
    }

    Ok(state.dispatcher.submit(url).await?)
}

/// First `url` value of a query string, percent-decoded
fn url_param(query: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
}

/// Whether `raw` is an absolute URL or a relative reference.
///
/// Scheme-less input such as `example.com` counts. Control characters,
/// malformed percent-escapes and broken authorities do not.
fn is_url_reference(raw: &str) -> bool {
    if raw.chars().any(|c| c.is_ascii_control()) || has_bad_escape(raw) {
        return false;
    }

    match Url::parse(raw) {
        Ok(_) | Err(ParseError::RelativeUrlWithoutBase) => true,
        Err(err) => {
            debug!(url = %raw, error = %err, "Unparseable url");
            false
        }
    }
}

/// A `%` not followed by two hex digits outside the query string.
/// The query is passed upstream untouched, so it is not checked.
fn has_bad_escape(raw: &str) -> bool {
    let (rest, fragment) = raw.split_once('#').unwrap_or((raw, ""));
    let before_query = rest.split_once('?').map_or(rest, |(head, _)| head);

    [before_query, fragment].iter().any(|part| {
        let bytes = part.as_bytes();
        bytes.iter().enumerate().any(|(i, &b)| {
            b == b'%'
                && !bytes
                    .get(i + 1..i + 3)
                    .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
        })
    })
}

/// Health check endpoint (GET /health)
///
/// Reports pool state and counters. Returns 503 Service Unavailable unless
/// the pool is running.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let dispatcher = &state.dispatcher;
    let pool_state = dispatcher.state();
    let running = pool_state == PoolState::Running;

    let response = HealthResponse {
        status: if running { "healthy" } else { "unhealthy" },
        state: pool_state,
        workers: dispatcher.worker_count(),
        metrics: dispatcher.metrics().snapshot(),
        version: env!("CARGO_PKG_VERSION"),
    };

    let status_code = if running {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
