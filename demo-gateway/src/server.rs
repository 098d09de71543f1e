use axum::Router;
use axum_server::Handle;
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Serve `app` on all interfaces until `handle` is told to shut down.
///
/// Peer addresses are attached to each request as `ConnectInfo<SocketAddr>`.
pub(crate) fn spawn_http_server(port: u16, app: Router, handle: Handle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!("HTTP server listening on {}", addr);
        if let Err(e) = axum_server::bind(addr)
            .handle(handle)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
        {
            tracing::error!("HTTP server on port {} failed: {}", port, e);
        }
    })
}

pub(crate) fn init_tracing(app_name: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        #[cfg(debug_assertions)]
        {
            format!("auth_token=trace,auth_token_axum=trace,{}=trace,info", app_name).into()
        }

        #[cfg(not(debug_assertions))]
        {
            "info".into()
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    #[cfg(debug_assertions)]
    tracing::info!("Debug build: auth_token and {} log at trace level", app_name);
    tracing::info!("Set RUST_LOG to change verbosity, e.g. RUST_LOG=auth_token_axum=debug,info");
}
