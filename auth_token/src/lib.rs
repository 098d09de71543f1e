//! auth_token - Session-cookie admission for an authenticating reverse proxy
//!
//! This crate holds the decision core of the gateway: pulling the session token
//! out of the `Cookie` header, resolving it against a key-value session store,
//! and producing a [`Verdict`] for every request. It knows nothing about HTTP
//! servers or forwarding; see `auth_token_axum` for that.

mod config;
mod session;
mod storage;

pub use config::{ConfigError, SessionConfig, StoreType, parse_millis};

pub use session::{
    AdmissionEngine, DenialReason, UserId, Verdict, extract_token, token_from_headers,
};

pub use storage::{
    InMemorySessionStore, RedisSessionStore, SessionStore, StorageError, build_session_store,
};
