use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Request, State},
    response::{IntoResponse, Response},
    routing::get,
};
use http::StatusCode;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use auth_token::{AdmissionEngine, SessionConfig, SessionStore, token_from_headers};

use super::backend::BackendClient;
use super::config::GatewayConfig;
use super::error::GatewayError;
use super::router::route;

/// Everything a request needs, shared read-only across requests
#[derive(Clone, Debug)]
pub struct GatewayState {
    engine: AdmissionEngine,
    backend: BackendClient,
    config: Arc<GatewayConfig>,
    cookie_name: Arc<str>,
}

impl GatewayState {
    pub fn new(
        session: &SessionConfig,
        config: GatewayConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, GatewayError> {
        let backend = BackendClient::new(config.backend_url.clone())?;
        Ok(Self {
            engine: AdmissionEngine::new(store, session.lookup_timeout),
            backend,
            config: Arc::new(config),
            cookie_name: Arc::from(session.cookie_name.as_str()),
        })
    }
}

/// Build the gateway application.
///
/// Every method and path goes through the admission pipeline, except `GET`
/// on the gateway's own health path when one is configured.
pub fn gateway_router(state: GatewayState) -> Router {
    let mut router = Router::new();
    if let Some(path) = state.config.health_path.as_deref() {
        // Other methods on the health path are gated like any request
        router = router.route(path, get(health).fallback(gate));
    }

    router.fallback(gate).with_state(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::DEBUG))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Serve the gateway on `listener` until `shutdown` resolves.
///
/// Peer addresses are recorded so admitted requests carry `X-Forwarded-For`.
pub async fn serve<F>(listener: TcpListener, state: GatewayState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = gateway_router(state);
    tracing::info!("Gateway listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

/// Fallback handler: extract, admit, route, all within the request budget.
async fn gate(State(state): State<GatewayState>, request: Request) -> Response {
    let budget = state.config.request_timeout;
    match tokio::time::timeout(budget, process(&state, request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::error!("Request exceeded its {:?} budget", budget);
            GatewayError::RequestTimeout(budget).into_response()
        }
    }
}

#[tracing::instrument(
    name = "admission",
    skip_all,
    fields(method = %request.method(), path = %request.uri().path())
)]
async fn process(state: &GatewayState, request: Request) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let token = token_from_headers(request.headers(), &state.cookie_name);
    let verdict = state.engine.admit(token.as_deref()).await;

    route(verdict, request, &state.backend, &state.config, peer).await
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    store: &'static str,
}

async fn health(State(state): State<GatewayState>) -> (StatusCode, Json<HealthReport>) {
    match state.engine.check_store().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthReport {
                status: "ok",
                store: "up",
            }),
        ),
        Err(e) => {
            tracing::warn!("Health check: session store unavailable: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthReport {
                    status: "degraded",
                    store: "down",
                }),
            )
        }
    }
}
