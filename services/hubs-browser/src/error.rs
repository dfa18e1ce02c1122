//! Service error type and HTTP mapping
//!
//! Locally produced errors render as a JSON envelope with a request id for
//! log correlation. Upstream provider errors are the exception: their status
//! and body pass through to the browser untranslated.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

/// Request-level errors surfaced to the browser.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No session cookie, or the cookie maps to no stored credentials
    #[error("Missing credentials")]
    Unauthenticated,

    /// The provider rejected a code exchange or token refresh
    #[error("auth exchange failed: {0}")]
    AuthExchange(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Provider error passed through with its original status and body
    #[error("upstream returned {status}")]
    Upstream { status: u16, body: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<aps_auth::Error> for ApiError {
    fn from(err: aps_auth::Error) -> Self {
        match err {
            aps_auth::Error::AuthExchange(msg) => ApiError::AuthExchange(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<aps_data::Error> for ApiError {
    fn from(err: aps_data::Error) -> Self {
        match err {
            aps_data::Error::Upstream { status, body } => ApiError::Upstream { status, body },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// JSON error envelope: {"error":{"type":...,"message":...,"request_id":"req_..."}}
fn error_body(kind: &str, message: &str, request_id: &str) -> String {
    serde_json::json!({
        "error": {
            "type": kind,
            "message": message,
            "request_id": request_id,
        }
    })
    .to_string()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());

        let (status, kind, message) = match self {
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "unauthenticated", self.to_string())
            }
            ApiError::AuthExchange(ref msg) => {
                warn!(request_id, error = %msg, "auth exchange rejected");
                (StatusCode::UNAUTHORIZED, "auth_exchange", msg.clone())
            }
            ApiError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Upstream { status, body } => {
                // Pass-through: provider status and body, no envelope
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                return (
                    status,
                    [(axum::http::header::CONTENT_TYPE, "application/json")],
                    body,
                )
                    .into_response();
            }
            ApiError::Internal(ref msg) => {
                error!(request_id, error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg.clone())
            }
        };

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            error_body(kind, &message, &request_id),
        )
            .into_response()
    }
}
