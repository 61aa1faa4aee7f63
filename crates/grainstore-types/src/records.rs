//! Records exchanged between the engine, the stores, and the publish sink.

use serde::{Deserialize, Serialize};

use crate::ids::Version;

/// One serialized event as it is persisted in the event log.
///
/// Immutable once written. Exactly one exists per (key, version) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorableEvent {
    /// Position of the event in its entity's history.
    pub version: Version,
    /// Type tag of the domain event.
    pub event_type: String,
    /// Serialized domain event.
    pub payload: Vec<u8>,
}

impl StorableEvent {
    /// Create a storable event.
    pub fn new(version: Version, event_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            version,
            event_type: event_type.into(),
            payload,
        }
    }
}

/// Materialized entity state as of `version` (a snapshot).
///
/// At most one snapshot exists per key; writing a new one replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorableState {
    /// Version of the last event folded into this state.
    pub version: Version,
    /// Type tag of the materialized state.
    pub state_type: String,
    /// Serialized state.
    pub payload: Vec<u8>,
}

impl StorableState {
    /// Create a snapshot record.
    pub fn new(version: Version, state_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            version,
            state_type: state_type.into(),
            payload,
        }
    }
}

/// One page of a paginated event query.
///
/// When `has_more` is set the backend truncated the results and the caller
/// must query again starting after the last returned event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slice {
    /// Events of this page, ascending by version.
    pub events: Vec<StorableEvent>,
    /// Whether a further page must be fetched.
    pub has_more: bool,
}

impl Slice {
    /// Create a page.
    pub const fn new(events: Vec<StorableEvent>, has_more: bool) -> Self {
        Self { events, has_more }
    }

    /// Version of the last event in this page, if any.
    pub fn last_version(&self) -> Option<Version> {
        self.events.last().map(|e| e.version)
    }

    /// Versions of every event in this page, in order.
    pub fn versions(&self) -> Vec<Version> {
        self.events.iter().map(|e| e.version).collect()
    }

    /// Whether the page holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// A domain event paired with its version, as held by a live entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedEvent<E> {
    /// Version assigned when the event was raised.
    pub version: Version,
    /// The domain event.
    pub event: E,
}

impl<E> VersionedEvent<E> {
    /// Pair an event with its version.
    pub const fn new(version: Version, event: E) -> Self {
        Self { version, event }
    }
}
