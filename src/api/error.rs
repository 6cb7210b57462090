use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::pool::{DispatchError, ErrorBody};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Service is shutting down")]
    PoolUnavailable,
}

impl ApiError {
    /// Both cases answer 500; existing clients rely on it.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<DispatchError> for ApiError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::PoolUnavailable => ApiError::PoolUnavailable,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let body = ErrorBody::new(&message).to_json();

        (
            self.status_code(),
            [(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn invalid_url_renders_error_body() {
        let response = ApiError::InvalidUrl.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"status":"error","message":"Invalid URL"}"#);
    }

    #[test]
    fn pool_unavailable_maps_from_dispatch_error() {
        let err: ApiError = DispatchError::PoolUnavailable.into();
        assert!(matches!(err, ApiError::PoolUnavailable));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
