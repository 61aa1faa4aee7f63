//! Builds the store registry from node configuration.

use std::sync::Arc;

use grainstore_db::{
    BlobBackend, BlobStateStore, DragonflyBlobs, PostgresBlobs, PostgresPool, PostgresTable,
    TableEventStore,
};
use grainstore_engine::{DataSerializer, JsonSerializer, MessagePackSerializer, StoreRegistry};
use tracing::info;

use crate::config::{NodeConfig, SerializerFormat, SnapshotBackend};
use crate::error::NodeError;
use crate::nats::NatsPublisher;

/// Connect the remaining configured backends and register them, together
/// with tables on `pool`, under the names the engine configuration refers to.
///
/// # Errors
///
/// Returns [`NodeError`] if a connection fails or a table name is invalid.
pub async fn build_registry(
    config: &NodeConfig,
    pool: &PostgresPool,
) -> Result<StoreRegistry, NodeError> {
    let names = &config.engine;

    let table = PostgresTable::new(pool, &config.event_store.table)?
        .with_page_size(config.event_store.page_size);
    let event_store = TableEventStore::new(names.event_store.as_str(), Arc::new(table));

    let blobs: Arc<dyn BlobBackend> = match config.state_store.backend {
        SnapshotBackend::Postgres => {
            Arc::new(PostgresBlobs::new(pool, &config.state_store.container)?)
        }
        SnapshotBackend::Dragonfly => Arc::new(
            DragonflyBlobs::connect(
                &config.state_store.dragonfly_url,
                &config.state_store.container,
            )
            .await?,
        ),
    };
    let state_store = BlobStateStore::new(names.state_store.as_str(), blobs);

    let serializer: Arc<dyn DataSerializer> = match config.serializer.format {
        SerializerFormat::Json => Arc::new(JsonSerializer::new(names.serializer.as_str())),
        SerializerFormat::Messagepack => {
            Arc::new(MessagePackSerializer::new(names.serializer.as_str()))
        }
    };

    let publisher =
        NatsPublisher::connect(&names.publisher, &config.nats.url, &config.nats.subject_prefix)
            .await?;

    info!(
        event_table = config.event_store.table,
        snapshot_backend = ?config.state_store.backend,
        serializer = ?config.serializer.format,
        "stores registered"
    );

    Ok(StoreRegistry::new()
        .with_event_store(Arc::new(event_store))
        .with_state_store(Arc::new(state_store))
        .with_serializer(serializer)
        .with_publisher(Arc::new(publisher)))
}
