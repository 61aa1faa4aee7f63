//! Error types for the recovery node.

use grainstore_db::DbError;
use grainstore_engine::EngineError;

use crate::config::ConfigError;

/// Errors that can stop the node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A storage backend could not be reached or initialized.
    #[error("storage error: {0}")]
    Db(#[from] DbError),

    /// Recovery of an entity failed.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Failed to connect to the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),
}
