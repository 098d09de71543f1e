//! auth_token_axum - Authenticating reverse proxy built on axum
//!
//! Every inbound request has its `auth-token` cookie checked against the
//! session store. Admitted requests are forwarded to the backend with the
//! user id attached; everything else is redirected to the login location.

mod backend;
mod config;
mod error;
mod gateway;
mod router;

pub use backend::BackendClient;
pub use config::{GatewayConfig, StoreFailurePolicy};
pub use error::GatewayError;
pub use gateway::{GatewayState, gateway_router, serve};
pub use router::{redirect_response, route};

// Re-export the session side so binaries need only one import path
pub use auth_token::{
    ConfigError, SessionConfig, SessionStore, StorageError, Verdict, build_session_store,
};
