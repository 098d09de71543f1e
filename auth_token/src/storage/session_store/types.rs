use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use tokio::sync::RwLock;

use crate::storage::errors::StorageError;

/// Process-local token table, used by tests and local demos
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    pub(super) entries: RwLock<HashMap<String, String>>,
}

/// Redis-backed session lookup sharing one multiplexed connection
///
/// The connection is opened on first use and dropped after an I/O failure so
/// the next lookup reconnects.
pub struct RedisSessionStore {
    pub(super) client: redis::Client,
    pub(super) connection: RwLock<Option<Cached<redis::aio::MultiplexedConnection>>>,
    pub(super) generation: AtomicU64,
    pub(super) key_prefix: String,
}

/// A cached value tagged with the generation it was opened in
#[derive(Debug, Clone)]
pub(super) struct Cached<T> {
    pub(super) generation: u64,
    pub(super) value: T,
}

/// Read-only view of the session store.
///
/// The gateway never writes sessions; implementations only need to answer
/// whether a token is bound and to whom. Implementations are shared by every
/// in-flight request and must not serialize lookups behind a lock held across
/// I/O.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Resolve a token to the user id bound to it.
    ///
    /// `Ok(None)` means the key does not exist; `Err` means the store could not
    /// answer.
    async fn lookup(&self, token: &str) -> Result<Option<String>, StorageError>;
}
