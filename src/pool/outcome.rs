use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::extract::Metadata;

/// Classified result of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Serialized metadata, returned verbatim to the caller
    Success(String),
    NotFound,
    /// Upstream answered with a status code >= 300
    UpstreamError(u16),
    /// Anything unexpected; the string is for logs only
    InternalError(String),
}

/// JSON error body: `{"status": "error", "message": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub status: &'static str,
    pub message: &'a str,
}

impl<'a> ErrorBody<'a> {
    pub fn new(message: &'a str) -> Self {
        Self {
            status: "error",
            message,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"status":"error","message":"internal error"}"#.to_string())
    }
}

impl Outcome {
    /// Map an extractor answer onto the four outcome kinds
    pub fn classify(metadata: Option<Metadata>) -> Self {
        match metadata {
            None => Outcome::NotFound,
            Some(info) if info.status < 300 => match info.to_json() {
                Ok(payload) => Outcome::Success(payload),
                Err(err) => Outcome::InternalError(format!("failed to serialize metadata: {err}")),
            },
            Some(info) => Outcome::UpstreamError(info.status),
        }
    }

    /// HTTP status the request handler answers with.
    ///
    /// Upstream failures use 411 for compatibility with existing clients.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Outcome::Success(_) => StatusCode::OK,
            Outcome::NotFound => StatusCode::NOT_FOUND,
            Outcome::UpstreamError(_) => StatusCode::LENGTH_REQUIRED,
            Outcome::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> String {
        match self {
            Outcome::Success(payload) => payload.clone(),
            Outcome::NotFound => {
                ErrorBody::new("Unable to retrieve information from provided url").to_json()
            }
            Outcome::UpstreamError(code) => {
                ErrorBody::new(&format!("Unable to obtain data. Status code: {code}")).to_json()
            }
            Outcome::InternalError(_) => ErrorBody::new("Something weird happened").to_json(),
        }
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::NotFound => "not_found",
            Outcome::UpstreamError(_) => "upstream_error",
            Outcome::InternalError(_) => "internal_error",
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Outcome::Success(payload) => payload,
            other => other.body(),
        };

        (
            status,
            [(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())],
            body,
        )
            .into_response()
    }
}
