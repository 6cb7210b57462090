use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer};
use tracing::info;

use super::{
    services::{extract_link, health},
    state::AppState,
};
use crate::config::Config;
use crate::extract::{OembedExtractor, ProviderRegistry};
use crate::observability::PoolMetrics;
use crate::pool::{Dispatcher, ErrorBody};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Routes plus the headers every response carries
///
/// Any path other than `/health` is served by the extraction handler.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(extract_link))
        .route("/oembed", get(extract_link))
        .route("/health", get(health))
        .fallback(extract_link)
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(middleware::map_response(timeout_as_json))
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static("ProcLink"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ))
}

/// Give the timeout layer's bare 408 an error body
async fn timeout_as_json(response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }

    (
        StatusCode::REQUEST_TIMEOUT,
        [(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())],
        ErrorBody::new("Request timed out").to_json(),
    )
        .into_response()
}

pub async fn run(config: Config) -> Result<(), AnyError> {
    let providers_file = &config.extractor.providers_file;
    info!(path = %providers_file.display(), "Loading oEmbed providers");
    let providers = Arc::new(
        ProviderRegistry::load(providers_file)
            .map_err(|e| format!("Failed to load providers: {}", e))?,
    );
    info!(count = providers.len(), "oEmbed providers loaded");

    let http_config = config.http_config()?;
    let pool_config = config.pool_config();

    let extractors = (0..pool_config.worker_count)
        .map(|_| OembedExtractor::new(http_config.clone(), Arc::clone(&providers)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Failed to build extractor: {}", e))?;

    let dispatcher = Arc::new(Dispatcher::with_extractors(
        pool_config.queue_capacity,
        Arc::new(PoolMetrics::new()),
        extractors,
    ));

    let app = router(AppState::new(Arc::clone(&dispatcher)), config.request_timeout());

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!(%address, "ProcLink listening");

    let draining = Arc::clone(&dispatcher);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            draining.begin_shutdown().await;
        })
        .await?;

    dispatcher.shutdown().await;
    info!("ProcLink stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
