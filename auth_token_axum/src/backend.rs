use std::net::SocketAddr;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::response::Response;
use http::header::{
    CONNECTION, CONTENT_LENGTH, HOST, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER,
    TRANSFER_ENCODING, UPGRADE,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use auth_token::UserId;

use crate::error::GatewayError;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the protected application.
///
/// Wraps one pooled `reqwest::Client`; clones share the pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

/// Per-forward settings taken from the gateway configuration
#[derive(Debug, Clone, Copy)]
pub(crate) struct ForwardOptions<'a> {
    pub user_header: &'a HeaderName,
    pub max_body_bytes: usize,
    pub peer: Option<SocketAddr>,
}

impl BackendClient {
    /// `base_url` must already be normalized (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            // 3xx from the backend is relayed to the client, never followed
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Setup(format!("failed to build backend client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Send `request` to the backend on behalf of `user_id` and relay the answer.
    ///
    /// The backend's status, headers (minus hop-by-hop ones) and body come back
    /// unchanged, including 3xx, 4xx and 5xx answers.
    #[tracing::instrument(skip_all, fields(user_id = %user_id))]
    pub(crate) async fn forward(
        &self,
        request: Request,
        user_id: &UserId,
        options: ForwardOptions<'_>,
    ) -> Result<Response, GatewayError> {
        let (parts, body) = request.into_parts();
        let method = parts.method.clone();

        let body = axum::body::to_bytes(body, options.max_body_bytes)
            .await
            .map_err(|e| GatewayError::RequestBody(e.to_string()))?;

        let mut headers = strip_hop_by_hop(&parts.headers);
        headers.remove(HOST);
        headers.remove(CONTENT_LENGTH);
        // Identity comes from the gateway only
        headers.remove(options.user_header);
        let identity =
            HeaderValue::from_str(user_id.as_str()).map_err(|_| GatewayError::InvalidIdentity)?;
        headers.insert(options.user_header.clone(), identity);
        add_forwarded_headers(&mut headers, &parts.headers, options.peer);

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("{}{}", self.base_url, path_and_query);
        tracing::debug!(method = %parts.method, %url, "Forwarding request to backend");

        let mut upstream = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let mut response_headers = strip_hop_by_hop(upstream.headers());
        if !keeps_backend_length(&method, status) {
            response_headers.remove(CONTENT_LENGTH);
        }

        let bytes = read_capped(&mut upstream, options.max_body_bytes).await?;

        tracing::debug!(%status, len = bytes.len(), "Backend responded");

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Responses without a body keep the backend's `Content-Length`; any other
/// body is re-framed from the buffered bytes.
fn keeps_backend_length(method: &Method, status: StatusCode) -> bool {
    *method == Method::HEAD || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED
}

/// Buffer the backend's body, giving up once it grows past `limit` bytes.
async fn read_capped(upstream: &mut reqwest::Response, limit: usize) -> Result<Bytes, GatewayError> {
    let mut buf = Vec::new();
    while let Some(chunk) = upstream
        .chunk()
        .await
        .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?
    {
        if buf.len() + chunk.len() > limit {
            return Err(GatewayError::InvalidResponse(format!(
                "backend body exceeds {limit} bytes"
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    *name == CONNECTION
        || *name == PROXY_AUTHENTICATE
        || *name == PROXY_AUTHORIZATION
        || *name == TE
        || *name == TRAILER
        || *name == TRANSFER_ENCODING
        || *name == UPGRADE
        || matches!(name.as_str(), "keep-alive" | "proxy-connection")
}

/// Copy `headers` without hop-by-hop fields, including any listed in `Connection`.
fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name) || listed.iter().any(|l| l == name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

fn add_forwarded_headers(headers: &mut HeaderMap, original: &HeaderMap, peer: Option<SocketAddr>) {
    if let Some(peer) = peer {
        let chain = match original.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) if !existing.trim().is_empty() => format!("{existing}, {}", peer.ip()),
            _ => peer.ip().to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&chain) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    if !headers.contains_key(&X_FORWARDED_HOST) {
        if let Some(host) = original.get(HOST) {
            headers.insert(X_FORWARDED_HOST, host.clone());
        }
    }

    if !headers.contains_key(&X_FORWARDED_PROTO) {
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }
}
