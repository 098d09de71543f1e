use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use http::HeaderValue;
use http::header::{CACHE_CONTROL, LOCATION};

use auth_token::{DenialReason, Verdict};

use super::backend::{BackendClient, ForwardOptions};
use super::config::{GatewayConfig, StoreFailurePolicy};
use super::error::GatewayError;

/// Turn a verdict into the response for `request`.
///
/// Admitted requests are forwarded and the backend's answer is relayed.
/// Every denial becomes the same redirect, except `StoreUnavailable` under the
/// fail-closed policy.
pub async fn route(
    verdict: Verdict,
    request: Request,
    backend: &BackendClient,
    config: &GatewayConfig,
    peer: Option<SocketAddr>,
) -> Response {
    match verdict {
        Verdict::Admitted(user_id) => {
            let options = ForwardOptions {
                user_header: &config.user_header,
                max_body_bytes: config.max_body_bytes,
                peer,
            };
            match backend.forward(request, &user_id, options).await {
                Ok(mut response) => {
                    if let Some(header) = &config.response_user_header {
                        if let Ok(value) = HeaderValue::from_str(user_id.as_str()) {
                            response.headers_mut().insert(header.clone(), value);
                        }
                    }
                    response
                }
                Err(err) => {
                    tracing::error!(error = %err, "Forward to backend failed");
                    err.into_response()
                }
            }
        }
        Verdict::Denied(DenialReason::StoreUnavailable)
            if config.store_failure_policy == StoreFailurePolicy::Error =>
        {
            tracing::warn!("Failing closed: session store unavailable");
            GatewayError::StoreUnavailable.into_response()
        }
        Verdict::Denied(reason) => {
            tracing::debug!(%reason, location = ?config.redirect_location, "Redirecting denied request");
            redirect_response(config)
        }
    }
}

/// The single redirect every denial maps to.
pub fn redirect_response(config: &GatewayConfig) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = config.redirect_status;
    response
        .headers_mut()
        .insert(LOCATION, config.redirect_location.clone());
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
