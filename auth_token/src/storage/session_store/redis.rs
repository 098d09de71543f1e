use async_trait::async_trait;
use redis::{self, AsyncCommands, RedisError, aio::MultiplexedConnection};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::storage::errors::StorageError;

use super::types::{Cached, RedisSessionStore, SessionStore};

impl RedisSessionStore {
    /// Create a store for `url`. No connection is made until the first call.
    pub fn new(url: &str, key_prefix: impl Into<String>) -> Result<Self, StorageError> {
        let client = redis::Client::open(url)
            .map_err(|e| StorageError::Config(format!("invalid Redis URL: {e}")))?;
        Ok(Self {
            client,
            connection: RwLock::new(None),
            generation: AtomicU64::new(0),
            key_prefix: key_prefix.into(),
        })
    }

    fn make_key(&self, token: &str) -> String {
        format!("{}{token}", self.key_prefix)
    }

    async fn connection(&self) -> Result<Cached<MultiplexedConnection>, StorageError> {
        if let Some(cached) = self.connection.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let mut slot = self.connection.write().await;
        // Another task may have connected while we waited for the lock
        if let Some(cached) = slot.as_ref() {
            return Ok(cached.clone());
        }

        tracing::info!("Opening Redis connection");
        let value = self.client.get_multiplexed_async_connection().await?;
        let cached = Cached {
            generation: self.generation.fetch_add(1, Ordering::Relaxed) + 1,
            value,
        };
        *slot = Some(cached.clone());
        Ok(cached)
    }

    /// Forget the connection opened in `generation` if `err` shows it is broken.
    async fn discard_broken_connection(&self, generation: u64, err: &RedisError) {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            let mut slot = self.connection.write().await;
            if clear_if_current(&mut slot, generation) {
                tracing::warn!("Dropping Redis connection after failure: {err}");
            }
        }
    }
}

/// Empty `slot` only while it still holds the entry from `generation`.
fn clear_if_current<T>(slot: &mut Option<Cached<T>>, generation: u64) -> bool {
    if slot.as_ref().is_some_and(|c| c.generation == generation) {
        *slot = None;
        true
    } else {
        false
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn ping(&self) -> Result<(), StorageError> {
        let Cached {
            generation,
            value: mut conn,
        } = self.connection().await?;
        let result: Result<String, RedisError> = redis::cmd("PING").query_async(&mut conn).await;
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.discard_broken_connection(generation, &e).await;
                Err(e.into())
            }
        }
    }

    async fn lookup(&self, token: &str) -> Result<Option<String>, StorageError> {
        let Cached {
            generation,
            value: mut conn,
        } = self.connection().await?;

        let key = self.make_key(token);
        let result: Result<Option<String>, RedisError> = conn.get(&key).await;
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                self.discard_broken_connection(generation, &e).await;
                Err(e.into())
            }
        }
    }
}
