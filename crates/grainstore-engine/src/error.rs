//! Error types for the entity engine.

use grainstore_db::DbError;
use grainstore_types::Version;

/// Kind of a named registration in the [`crate::StoreRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// An event log store.
    EventStore,
    /// A snapshot store.
    StateStore,
    /// A data serializer.
    Serializer,
    /// A downstream event publisher.
    Publisher,
}

impl core::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::EventStore => "EventStore",
            Self::StateStore => "StateStore",
            Self::Serializer => "DataSerializer",
            Self::Publisher => "EventPublisher",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while recovering or committing an entity.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A store operation failed. Propagated unmodified, never retried.
    #[error("storage error: {0}")]
    Db(#[from] DbError),

    /// No store, serializer, or publisher is registered under the name.
    #[error("{kind} by name `{name}` not configured")]
    StoreNotFound {
        /// Kind of the missing registration.
        kind: StoreKind,
        /// Requested name.
        name: String,
    },

    /// A value could not be converted to or from bytes.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The downstream sink rejected a batch.
    #[error("publish error: {0}")]
    Publish(String),

    /// Replay found an event that does not directly follow the last one.
    #[error("version gap in `{key}`: expected {expected}, found {found}")]
    VersionGap {
        /// Entity key being replayed.
        key: String,
        /// Version that should have come next.
        expected: Version,
        /// Version that was read.
        found: Version,
    },

    /// The entity is at [`Version::MAX`] and cannot take another event.
    #[error("version overflow in `{key}`: no version after {}", Version::MAX)]
    VersionOverflow {
        /// Entity key.
        key: String,
    },
}
