//! HTTP error type and JSON error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keel_ring::RingError;
use keel_router::RouterError;
use serde_json::json;

/// Errors returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// An error from the routing service.
    #[error("{0}")]
    Router(#[from] RouterError),

    /// A hostname in the request body is not a valid server id.
    #[error("invalid hostname {hostname:?}: expected a number or server-<n>")]
    InvalidHostname {
        /// The offending hostname.
        hostname: String,
    },

    /// The request body could not be parsed.
    #[error("invalid request body: {message}")]
    InvalidBody {
        /// Description of the problem.
        message: String,
    },
}

impl HttpError {
    /// Map to an HTTP status code.
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Router(e) => match e {
                RouterError::Ring(RingError::RingFull { .. }) => StatusCode::INSUFFICIENT_STORAGE,
                RouterError::Ring(RingError::AlreadyMember(_)) => StatusCode::CONFLICT,
                RouterError::Ring(RingError::InvalidConfig(_)) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                RouterError::InvalidRequest { .. }
                | RouterError::NotMember(_)
                | RouterError::WouldEmpty { .. } => StatusCode::BAD_REQUEST,
                RouterError::NoServerAvailable => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::InvalidHostname { .. } | Self::InvalidBody { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "message": self.to_string(),
            "status": "failure",
        });
        (status, Json(body)).into_response()
    }
}
