//! Single-slot snapshot persistence.
//!
//! Each entity has at most one snapshot: the latest materialized state and
//! the version it reflects. Snapshots only bound replay cost, so a missing
//! or unreadable snapshot is never fatal. The engine falls back to a full
//! replay from version 0.

use std::sync::Arc;

use async_trait::async_trait;
use grainstore_types::{EntityKey, StorableState};
use tokio::sync::OnceCell;

use crate::backend::BlobBackend;
use crate::error::DbError;

/// Default container name of the snapshot store.
pub const DEFAULT_CONTAINER_NAME: &str = "states";

/// Persistent latest-snapshot store keyed by entity.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Registration name of this store.
    fn name(&self) -> &str;

    /// Read the snapshot of `key`.
    ///
    /// Returns `Ok(None)` when there is no snapshot or the stored record
    /// cannot be decoded.
    async fn read(&self, key: &EntityKey) -> Result<Option<StorableState>, DbError>;

    /// Create or overwrite the snapshot of `key`.
    async fn write(&self, key: &EntityKey, state: &StorableState) -> Result<(), DbError>;
}

/// [`StateStore`] over a blob backend, one JSON record per key.
pub struct BlobStateStore {
    name: String,
    backend: Arc<dyn BlobBackend>,
    initialized: OnceCell<()>,
}

impl BlobStateStore {
    /// Create a store called `name` over `backend`.
    pub fn new(name: impl Into<String>, backend: Arc<dyn BlobBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
            initialized: OnceCell::new(),
        }
    }

    async fn container(&self) -> Result<&dyn BlobBackend, DbError> {
        self.initialized
            .get_or_try_init(|| async {
                self.backend.ensure_container().await?;
                tracing::debug!(store = self.name, "Snapshot container initialized");
                Ok::<(), DbError>(())
            })
            .await?;
        Ok(self.backend.as_ref())
    }
}

#[async_trait]
impl StateStore for BlobStateStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, key: &EntityKey) -> Result<Option<StorableState>, DbError> {
        let container = self.container().await?;
        let Some(body) = container.get(key.as_str()).await? else {
            return Ok(None);
        };

        match serde_json::from_slice::<StorableState>(&body) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                tracing::warn!(%key, error = %e, "Ignoring unreadable snapshot");
                Ok(None)
            }
        }
    }

    async fn write(&self, key: &EntityKey, state: &StorableState) -> Result<(), DbError> {
        let body = serde_json::to_vec(state)?;
        let container = self.container().await?;
        container.put(key.as_str(), body).await?;

        tracing::debug!(%key, version = %state.version, "Wrote snapshot");
        Ok(())
    }
}
