//! Recovery node for the grainstore event-sourcing engine.
//!
//! Loads configuration, connects the configured event log, snapshot store,
//! and NATS publisher, then republishes any events that were written but
//! never confirmed as published for the entity keys given on the command
//! line.
//!
//! ```text
//! GRAINSTORE_CONFIG=grainstore.yaml grainstore-node Account_42 Account_43
//! ```
//!
//! Run it only while no live writer owns those keys.

mod config;
mod error;
mod nats;
mod sweep;
mod wiring;

use std::path::PathBuf;

use grainstore_db::{PostgresConfig, PostgresPool};
use grainstore_types::EntityKey;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::NodeConfig;
use crate::error::NodeError;

/// Config file used when `GRAINSTORE_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "grainstore.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, a backend connection, or recovery of
/// any key fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("grainstore-node starting");

    let path = std::env::var("GRAINSTORE_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = NodeConfig::load(&path)?;
    info!(
        path = %path.display(),
        event_store = config.engine.event_store,
        publisher = config.engine.publisher,
        "configuration loaded"
    );

    let keys: Vec<EntityKey> = std::env::args().skip(1).map(EntityKey::from).collect();
    if keys.is_empty() {
        info!("no entity keys given, nothing to recover");
        return Ok(());
    }

    let pool = PostgresPool::connect(
        &PostgresConfig::new(&config.postgres.url)
            .with_max_connections(config.postgres.max_connections),
    )
    .await?;

    let outcome = recover(&config, &pool, &keys).await;
    pool.close().await;
    let published = outcome?;

    info!(keys = keys.len(), published, "grainstore-node finished");
    Ok(())
}

/// Wire the stores onto `pool` and sweep `keys`.
async fn recover(
    config: &NodeConfig,
    pool: &PostgresPool,
    keys: &[EntityKey],
) -> Result<usize, NodeError> {
    let registry = wiring::build_registry(config, pool).await?;
    sweep::sweep(&registry, &config.engine, keys).await
}
