//! Error types for the HTTP API layer.
//!
//! [`ApiError`] wraps the engine's error and maps its class to an HTTP
//! status via [`IntoResponse`]. Invariant-class failures are logged server
//! side and reported as an opaque 500; every other class is safe to state
//! verbatim.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use idlemint_engine::error::{EngineError, ErrorKind};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The engine rejected or failed the operation.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A path parameter could not be parsed.
    #[error("invalid path parameter: {0}")]
    InvalidPath(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Engine(err) => match err.kind() {
                ErrorKind::Validation => (StatusCode::BAD_REQUEST, err.to_string()),
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
                ErrorKind::Precondition => (StatusCode::CONFLICT, err.to_string()),
                ErrorKind::Quota => (StatusCode::TOO_MANY_REQUESTS, err.to_string()),
                ErrorKind::Transient => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
                ErrorKind::Invariant => {
                    tracing::error!(%err, "invariant violation in request handling");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        String::from("internal error"),
                    )
                }
            },
            Self::InvalidPath(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use idlemint_types::PlayerId;

    #[test]
    fn status_mapping_follows_error_class() {
        let cases = [
            (
                ApiError::Engine(EngineError::InvalidInput(String::from("bad"))),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Engine(EngineError::PlayerNotFound(PlayerId::new())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Engine(EngineError::NoIncomeAvailable),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Engine(EngineError::Banned),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                ApiError::Engine(EngineError::Contention),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn invariant_errors_are_opaque() {
        let response =
            ApiError::Engine(EngineError::Invariant(String::from("secret detail"))).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
