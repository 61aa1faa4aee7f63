//! `Dragonfly` (Redis-compatible) snapshot blob backend.
//!
//! Snapshots are small, read once per activation, and overwritten in place,
//! which is exactly the access pattern of a key-value store. Each blob lives
//! at a namespaced key.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `{container}:{entity key}` | Bytes | Serialized snapshot record |

use async_trait::async_trait;
use fred::prelude::*;

use crate::backend::BlobBackend;
use crate::error::DbError;

/// Snapshot container backed by a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyBlobs {
    client: Client,
    container: String,
}

impl DragonflyBlobs {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str, container: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!(container, "Connected to Dragonfly");
        Ok(Self {
            client,
            container: container.to_owned(),
        })
    }

    /// Key under which the blob `name` is stored.
    fn blob_key(&self, name: &str) -> String {
        format!("{}:{name}", self.container)
    }

}

#[async_trait]
impl BlobBackend for DragonflyBlobs {
    async fn ensure_container(&self) -> Result<(), DbError> {
        // Containers are key prefixes; nothing to create.
        tracing::debug!(container = self.container, "Dragonfly container ready");
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, DbError> {
        let body: Option<Vec<u8>> = self.client.get(self.blob_key(name)).await?;
        Ok(body)
    }

    async fn put(&self, name: &str, body: Vec<u8>) -> Result<(), DbError> {
        let _: () = self
            .client
            .set(self.blob_key(name), body, None, None, false)
            .await?;
        Ok(())
    }
}
