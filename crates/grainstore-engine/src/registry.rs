//! Named lookup of stores, serializers, and publishers.
//!
//! Entities name the capabilities they use through [`EngineConfig`]; the
//! registry resolves those names when an entity is constructed. A missing
//! name is a configuration error surfaced as
//! [`EngineError::StoreNotFound`], never a silent fallback.
//!
//! [`EngineConfig`]: crate::EngineConfig

use std::collections::HashMap;
use std::sync::Arc;

use grainstore_db::{EventStore, StateStore};

use crate::error::{EngineError, StoreKind};
use crate::publisher::EventPublisher;
use crate::serializer::{DataSerializer, JsonSerializer};

/// Registration name used when a configuration leaves a name unset.
pub const DEFAULT_NAME: &str = "Default";

/// Shared registry of named capabilities.
///
/// Registering a second entry under an existing name replaces the first.
#[derive(Clone, Default)]
pub struct StoreRegistry {
    event_stores: HashMap<String, Arc<dyn EventStore>>,
    state_stores: HashMap<String, Arc<dyn StateStore>>,
    serializers: HashMap<String, Arc<dyn DataSerializer>>,
    publishers: HashMap<String, Arc<dyn EventPublisher>>,
}

impl StoreRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with a JSON serializer registered as `"Default"`.
    #[must_use]
    pub fn with_default_serializer() -> Self {
        Self::new().with_serializer(Arc::new(JsonSerializer::new(DEFAULT_NAME)))
    }

    /// Register an event store under its own name.
    #[must_use]
    pub fn with_event_store(mut self, store: Arc<dyn EventStore>) -> Self {
        self.event_stores.insert(store.name().to_owned(), store);
        self
    }

    /// Register a snapshot store under its own name.
    #[must_use]
    pub fn with_state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.state_stores.insert(store.name().to_owned(), store);
        self
    }

    /// Register a serializer under its own name.
    #[must_use]
    pub fn with_serializer(mut self, serializer: Arc<dyn DataSerializer>) -> Self {
        self.serializers
            .insert(serializer.name().to_owned(), serializer);
        self
    }

    /// Register a publisher under its own name.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publishers.insert(publisher.name().to_owned(), publisher);
        self
    }

    /// Resolve an event store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::StoreNotFound`] if `name` is not registered.
    pub fn event_store(&self, name: &str) -> Result<Arc<dyn EventStore>, EngineError> {
        lookup(&self.event_stores, StoreKind::EventStore, name)
    }

    /// Resolve a snapshot store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::StoreNotFound`] if `name` is not registered.
    pub fn state_store(&self, name: &str) -> Result<Arc<dyn StateStore>, EngineError> {
        lookup(&self.state_stores, StoreKind::StateStore, name)
    }

    /// Resolve a serializer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::StoreNotFound`] if `name` is not registered.
    pub fn serializer(&self, name: &str) -> Result<Arc<dyn DataSerializer>, EngineError> {
        lookup(&self.serializers, StoreKind::Serializer, name)
    }

    /// Resolve a publisher.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::StoreNotFound`] if `name` is not registered.
    pub fn publisher(&self, name: &str) -> Result<Arc<dyn EventPublisher>, EngineError> {
        lookup(&self.publishers, StoreKind::Publisher, name)
    }
}

impl core::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("event_stores", &sorted_names(&self.event_stores))
            .field("state_stores", &sorted_names(&self.state_stores))
            .field("serializers", &sorted_names(&self.serializers))
            .field("publishers", &sorted_names(&self.publishers))
            .finish()
    }
}

fn sorted_names<T: ?Sized>(map: &HashMap<String, Arc<T>>) -> Vec<String> {
    let mut names: Vec<String> = map.keys().cloned().collect();
    names.sort();
    names
}

fn lookup<T: ?Sized>(
    map: &HashMap<String, Arc<T>>,
    kind: StoreKind,
    name: &str,
) -> Result<Arc<T>, EngineError> {
    map.get(name)
        .map(Arc::clone)
        .ok_or_else(|| EngineError::StoreNotFound {
            kind,
            name: name.to_owned(),
        })
}
