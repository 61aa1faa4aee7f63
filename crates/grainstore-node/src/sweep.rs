//! Unpublished-event recovery across a set of entity keys.
//!
//! A crashed writer can leave events durable in the log but never
//! published. The sweep republishes them without activating the entities,
//! which is useful after an outage for keys that may not be touched again
//! soon. It must not run concurrently with a live writer for the same key.

use futures::future::try_join_all;
use grainstore_engine::{EngineConfig, StoreRegistry, recover_unpublished};
use grainstore_types::EntityKey;
use tracing::info;

use crate::error::NodeError;

/// Republish pending events for every key. Returns the total published.
///
/// # Errors
///
/// Returns [`NodeError::Engine`] if a registration is missing or any key's
/// recovery fails. Keys that completed before the failure keep their
/// progress.
pub async fn sweep(
    registry: &StoreRegistry,
    config: &EngineConfig,
    keys: &[EntityKey],
) -> Result<usize, NodeError> {
    let event_store = registry.event_store(&config.event_store)?;
    let publisher = registry.publisher(&config.publisher)?;

    let counts = try_join_all(
        keys.iter()
            .map(|key| recover_unpublished(event_store.as_ref(), publisher.as_ref(), key)),
    )
    .await?;

    let total = counts.into_iter().fold(0_usize, usize::saturating_add);
    info!(keys = keys.len(), published = total, "sweep complete");
    Ok(total)
}
