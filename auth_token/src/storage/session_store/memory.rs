use async_trait::async_trait;
use std::collections::HashMap;

use crate::storage::errors::StorageError;

use super::types::{InMemorySessionStore, SessionStore};

impl InMemorySessionStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory session store");
        Self {
            entries: Default::default(),
        }
    }

    /// Build a store pre-populated with `(token, user_id)` pairs.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: map.into(),
        }
    }

    pub async fn insert(&self, token: &str, user_id: &str) {
        self.entries
            .write()
            .await
            .insert(token.to_string(), user_id.to_string());
    }

    pub async fn remove(&self, token: &str) -> Option<String> {
        self.entries.write().await.remove(token)
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(()) // Always reachable
    }

    async fn lookup(&self, token: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(token).cloned())
    }
}
