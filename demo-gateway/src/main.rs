use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use dotenvy::dotenv;

use auth_token::{InMemorySessionStore, StoreType};
use auth_token_axum::{
    GatewayConfig, GatewayState, SessionConfig, SessionStore, build_session_store, gateway_router,
};

mod demo_backend;
mod server;

use crate::{
    demo_backend::demo_backend_router,
    server::{init_tracing, spawn_http_server},
};

const DEFAULT_PORT: u16 = 8888;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing("demo_gateway");

    let session = SessionConfig::from_env()?;
    let gateway = GatewayConfig::from_env()?;
    let port = port_from_env("PORT")?.unwrap_or(DEFAULT_PORT);

    let store = session_store(&session)?;
    if let Err(e) = store.ping().await {
        // Requests are still served; lookups fail until the store comes back
        tracing::warn!("Session store not reachable at startup: {}", e);
    }

    tracing::info!(
        backend = %gateway.backend_url,
        redirect = ?gateway.redirect_location,
        policy = ?gateway.store_failure_policy,
        "Gateway configured"
    );
    let state = GatewayState::new(&session, gateway, store)?;

    let handle = Handle::new();
    let mut servers = vec![spawn_http_server(
        port,
        gateway_router(state),
        handle.clone(),
    )];
    if let Some(backend_port) = port_from_env("DEMO_BACKEND_PORT")? {
        servers.push(spawn_http_server(
            backend_port,
            demo_backend_router(),
            handle.clone(),
        ));
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down, draining in-flight requests");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));

    for server in servers {
        server.await?;
    }
    Ok(())
}

/// The memory store starts empty unless `DEMO_SESSIONS` seeds it.
fn session_store(
    session: &SessionConfig,
) -> Result<Arc<dyn SessionStore>, Box<dyn std::error::Error>> {
    if session.store_type == StoreType::Memory {
        let seeds = std::env::var("DEMO_SESSIONS").unwrap_or_default();
        let entries = parse_sessions(&seeds);
        tracing::info!("Seeding in-memory store with {} session(s)", entries.len());
        return Ok(Arc::new(InMemorySessionStore::with_entries(entries)));
    }
    Ok(build_session_store(session)?)
}

fn parse_sessions(value: &str) -> Vec<(String, String)> {
    value
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(token, user)| (token.trim().to_string(), user.trim().to_string()))
        .filter(|(token, user)| !token.is_empty() && !user.is_empty())
        .collect()
}

fn port_from_env(key: &str) -> Result<Option<u16>, Box<dyn std::error::Error>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{key} must be a port number, got '{value}': {e}").into()),
        Err(_) => Ok(None),
    }
}
