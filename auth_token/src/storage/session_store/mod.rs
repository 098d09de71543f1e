mod memory;
mod redis;
mod types;

use std::sync::Arc;

use crate::config::{SessionConfig, StoreType};
use crate::storage::errors::StorageError;

pub use types::{InMemorySessionStore, RedisSessionStore, SessionStore};

/// Build the session store selected by `config`.
pub fn build_session_store(config: &SessionConfig) -> Result<Arc<dyn SessionStore>, StorageError> {
    tracing::info!(
        "Initializing session store with type: {:?}, url: {}",
        config.store_type,
        config.store_url
    );

    let store: Arc<dyn SessionStore> = match config.store_type {
        StoreType::Memory => Arc::new(InMemorySessionStore::new()),
        StoreType::Redis => Arc::new(RedisSessionStore::new(
            &config.store_url,
            config.key_prefix.clone(),
        )?),
    };

    Ok(store)
}
