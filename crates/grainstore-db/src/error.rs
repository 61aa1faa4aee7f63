//! Error types for the storage layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] and [`fred`] errors with additional context about which
//! operation failed. Nothing in this crate retries; resilience belongs to
//! the backend client.

use crate::codec::CodecError;

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A payload could not be packed into or read from table cells.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A row with the same identity already exists.
    ///
    /// Appending an event at an existing (key, version) means two writers
    /// raced for the same entity. The whole batch is rejected.
    #[error("conflict: row {row_key} already exists in partition {partition}")]
    Conflict {
        /// Partition (entity key) of the colliding row.
        partition: String,
        /// Row key of the colliding row.
        row_key: String,
    },

    /// A row read back from a backend is malformed.
    #[error("corrupt row {row_key}: {reason}")]
    CorruptRow {
        /// Row key of the malformed row.
        row_key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A generic backend failure (in-memory backends, injected faults).
    #[error("backend error: {0}")]
    Backend(String),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
