use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::storage::{SessionStore, StorageError};

use super::types::{DenialReason, UserId, Verdict};

/// Decides whether a request carrying `token` may pass.
///
/// Cloning is cheap; every clone shares the same store handle.
#[derive(Clone)]
pub struct AdmissionEngine {
    store: Arc<dyn SessionStore>,
    lookup_timeout: Duration,
}

impl fmt::Debug for AdmissionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionEngine")
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}

impl AdmissionEngine {
    pub fn new(store: Arc<dyn SessionStore>, lookup_timeout: Duration) -> Self {
        Self {
            store,
            lookup_timeout,
        }
    }

    /// Produce the verdict for one request.
    ///
    /// An absent or empty token is denied without touching the store. A present
    /// token costs exactly one store read. Store failures, including running
    /// past the lookup timeout, become `Denied(StoreUnavailable)`.
    #[tracing::instrument(skip_all)]
    pub async fn admit(&self, token: Option<&str>) -> Verdict {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            tracing::debug!(reason = %DenialReason::MissingToken, "Request denied");
            return Verdict::Denied(DenialReason::MissingToken);
        };

        match self.lookup(token).await {
            Ok(Some(user_id)) => {
                tracing::debug!(user_id = %user_id, "Request admitted");
                Verdict::Admitted(UserId::new(user_id))
            }
            Ok(None) => {
                tracing::info!(reason = %DenialReason::UnknownToken, "Request denied");
                Verdict::Denied(DenialReason::UnknownToken)
            }
            Err(e) => {
                tracing::error!(
                    reason = %DenialReason::StoreUnavailable,
                    error = %e,
                    "Request denied: session store lookup failed"
                );
                Verdict::Denied(DenialReason::StoreUnavailable)
            }
        }
    }

    /// Ping the store within the lookup timeout.
    pub async fn check_store(&self) -> Result<(), StorageError> {
        match tokio::time::timeout(self.lookup_timeout, self.store.ping()).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(self.lookup_timeout)),
        }
    }

    async fn lookup(&self, token: &str) -> Result<Option<String>, StorageError> {
        match tokio::time::timeout(self.lookup_timeout, self.store.lookup(token)).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(self.lookup_timeout)),
        }
    }
}
