use std::time::Duration;

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

/// Failures on the forward path, plus the fail-closed store policy.
///
/// Denials never become a `GatewayError`; they are answered with a redirect.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend did not respond in time")]
    BackendTimeout,

    #[error("Request exceeded its {0:?} budget")]
    RequestTimeout(Duration),

    #[error("Request body rejected: {0}")]
    RequestBody(String),

    #[error("Backend response could not be relayed: {0}")]
    InvalidResponse(String),

    #[error("User id cannot be sent as a header value")]
    InvalidIdentity,

    #[error("Session store unavailable")]
    StoreUnavailable,

    #[error("Gateway setup failed: {0}")]
    Setup(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BackendUnavailable(_) | Self::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            Self::BackendTimeout | Self::RequestTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::RequestBody(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidIdentity | Self::Setup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::BackendTimeout
        } else {
            Self::BackendUnavailable(err.to_string())
        }
    }
}

impl IntoResponse for GatewayError {
    /// Only the generic status text reaches the client; details stay in logs.
    fn into_response(self) -> Response {
        let status = self.status();
        let body = status.canonical_reason().unwrap_or("Error");
        (status, body).into_response()
    }
}
