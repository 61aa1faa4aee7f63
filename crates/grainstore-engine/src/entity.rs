//! The event-sourced entity engine.
//!
//! An [`EventSourced`] value holds one entity's state in memory. It is
//! rebuilt at activation from the latest snapshot plus the events written
//! after it, and it persists new events on [`EventSourced::commit`].
//!
//! # Activation
//!
//! Two phases run concurrently:
//!
//! 1. State recovery: load the snapshot (a corrupt or undecodable one counts
//!    as absent), then replay the event log page by page from the version
//!    after it.
//! 2. Unpublished recovery: publish every event still carrying an
//!    unpublished marker, then delete those markers.
//!
//! # Commit
//!
//! Buffered events are written in one batch, published, have their markers
//! deleted, and finally a snapshot is written if the batch crossed a
//! multiple of the snapshot step. Delivery is at-least-once: a crash between
//! publish and marker deletion republishes on the next activation. If
//! publishing fails, the next commit first republishes the leftover markers
//! so the sink still sees events in version order.
//!
//! Callers must ensure a single writer per key.

use std::collections::BTreeSet;
use std::sync::Arc;

use grainstore_db::{EventStore, StateStore};
use grainstore_types::{EntityKey, StorableEvent, StorableState, Version, VersionedEvent};
use tracing::{debug, info, warn};

use crate::aggregate::{Aggregate, DomainEvent, Reducer, default_reducer};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::publisher::EventPublisher;
use crate::registry::StoreRegistry;
use crate::serializer::DataSerializer;

/// Live, event-sourced state for one entity key.
pub struct EventSourced<A: Aggregate> {
    key: EntityKey,
    state: A,
    version: Option<Version>,
    uncommitted: Vec<VersionedEvent<A::Event>>,
    reducer: Reducer<A, A::Event>,
    snapshot_config: EngineConfig,
    event_store: Arc<dyn EventStore>,
    state_store: Arc<dyn StateStore>,
    serializer: Arc<dyn DataSerializer>,
    publisher: Arc<dyn EventPublisher>,
    publish_pending: bool,
}

impl<A: Aggregate> EventSourced<A> {
    /// Resolve the configured registrations for `key` without touching
    /// storage. The entity starts at the default state with no version.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::StoreNotFound`] if any configured name is not
    /// registered.
    pub fn new(
        key: EntityKey,
        registry: &StoreRegistry,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            key,
            state: A::default(),
            version: None,
            uncommitted: Vec::new(),
            reducer: default_reducer::<A>(),
            snapshot_config: config.clone(),
            event_store: registry.event_store(&config.event_store)?,
            state_store: registry.state_store(&config.state_store)?,
            serializer: registry.serializer(&config.serializer)?,
            publisher: registry.publisher(&config.publisher)?,
            publish_pending: false,
        })
    }

    /// Resolve registrations and run recovery.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::StoreNotFound`] for missing registrations and
    /// propagates any failure from [`EventSourced::recover`].
    pub async fn activate(
        key: EntityKey,
        registry: &StoreRegistry,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let mut entity = Self::new(key, registry, config)?;
        entity.recover().await?;
        Ok(entity)
    }

    /// Use a reducer other than [`Aggregate::apply`].
    #[must_use]
    pub fn with_reducer(mut self, reducer: Reducer<A, A::Event>) -> Self {
        self.reducer = reducer;
        self
    }

    /// Run both recovery phases concurrently.
    ///
    /// # Errors
    ///
    /// Store and sink failures propagate unmodified. A gap in the replayed
    /// log yields [`EngineError::VersionGap`], an event past
    /// [`Version::MAX`] yields [`EngineError::VersionOverflow`].
    pub async fn recover(&mut self) -> Result<(), EngineError> {
        let event_store = Arc::clone(&self.event_store);
        let publisher = Arc::clone(&self.publisher);
        let key = self.key.clone();

        let ((), republished) = tokio::try_join!(
            self.recover_state(),
            recover_unpublished(event_store.as_ref(), publisher.as_ref(), &key),
        )?;

        info!(
            key = %self.key,
            version = ?self.version.map(Version::get),
            republished,
            "entity activated"
        );
        Ok(())
    }

    async fn recover_state(&mut self) -> Result<(), EngineError> {
        if let Some(snapshot) = self.state_store.read(&self.key).await? {
            match self.serializer.decode::<A>(&snapshot.payload) {
                Ok(state) => {
                    self.state = state;
                    self.version = Some(snapshot.version);
                }
                Err(e) => warn!(
                    key = %self.key,
                    version = snapshot.version.get(),
                    error = %e,
                    "undecodable snapshot, replaying from the beginning"
                ),
            }
        }

        let mut replayed: usize = 0;
        // Nothing can be stored past Version::MAX.
        while let Some(from) = Version::after(self.version) {
            let slice = self.event_store.read(&self.key, from).await?;
            let has_more = slice.has_more;
            if slice.is_empty() {
                break;
            }
            for stored in slice.events {
                let expected = self.next_version()?;
                if stored.version != expected {
                    return Err(EngineError::VersionGap {
                        key: self.key.to_string(),
                        expected,
                        found: stored.version,
                    });
                }
                let event: A::Event = self.serializer.decode(&stored.payload)?;
                self.apply(stored.version, &event);
                replayed = replayed.saturating_add(1);
            }
            if !has_more {
                break;
            }
        }

        debug!(key = %self.key, replayed, "state recovered");
        Ok(())
    }

    fn apply(&mut self, version: Version, event: &A::Event) {
        let state = std::mem::take(&mut self.state);
        self.state = (self.reducer)(state, event);
        self.version = Some(version);
    }

    fn next_version(&self) -> Result<Version, EngineError> {
        Version::after(self.version).ok_or_else(|| EngineError::VersionOverflow {
            key: self.key.to_string(),
        })
    }

    /// Apply `event` at the next version and buffer it for commit.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::VersionOverflow`] if the entity is already at
    /// [`Version::MAX`]. State and buffer are left untouched.
    pub fn raise(&mut self, event: A::Event) -> Result<(), EngineError> {
        let version = self.next_version()?;
        self.apply(version, &event);
        self.uncommitted.push(VersionedEvent::new(version, event));
        Ok(())
    }

    /// Persist, publish, and possibly snapshot the buffered events.
    ///
    /// The buffer is cleared as soon as the events are durable, so a later
    /// publish or snapshot failure does not cause them to be written twice.
    /// After a failed publish the next commit republishes everything that
    /// still carries an unpublished marker, older batches included, instead
    /// of publishing only its own batch.
    ///
    /// # Errors
    ///
    /// Serialization, store, and sink failures propagate unmodified.
    pub async fn commit(&mut self) -> Result<(), EngineError> {
        if self.uncommitted.is_empty() {
            return Ok(());
        }

        let batch = self
            .uncommitted
            .iter()
            .map(|e| {
                Ok(StorableEvent::new(
                    e.version,
                    e.event.event_type(),
                    self.serializer.encode(&e.event)?,
                ))
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        self.event_store.write(&self.key, &batch).await?;
        self.uncommitted.clear();

        let event_store = self.event_store.as_ref();
        let publisher = self.publisher.as_ref();
        let published = if self.publish_pending {
            recover_unpublished(event_store, publisher, &self.key)
                .await
                .map(|_| ())
        } else {
            publish_and_confirm(event_store, publisher, &self.key, &batch).await
        };
        self.publish_pending = published.is_err();
        published?;

        let batch_size = u64::try_from(batch.len()).unwrap_or(u64::MAX);
        let due = self
            .version
            .filter(|v| self.snapshot_config.snapshot_due(v.get(), batch_size));
        if let Some(version) = due {
            self.write_snapshot(version).await?;
        }

        debug!(key = %self.key, events = batch.len(), "committed");
        Ok(())
    }

    async fn write_snapshot(&self, version: Version) -> Result<(), EngineError> {
        let payload = self.serializer.encode(&self.state)?;
        let snapshot = StorableState::new(version, A::STATE_TYPE, payload);
        self.state_store.write(&self.key, &snapshot).await?;
        info!(key = %self.key, version = version.get(), "snapshot written");
        Ok(())
    }

    /// Entity key.
    pub const fn key(&self) -> &EntityKey {
        &self.key
    }

    /// Current in-memory state, including uncommitted events.
    pub const fn state(&self) -> &A {
        &self.state
    }

    /// Last applied version, or `None` before the first event.
    pub const fn version(&self) -> Option<Version> {
        self.version
    }

    /// Events raised since the last commit.
    pub fn uncommitted(&self) -> &[VersionedEvent<A::Event>] {
        &self.uncommitted
    }
}

impl<A: Aggregate + core::fmt::Debug> core::fmt::Debug for EventSourced<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventSourced")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("version", &self.version)
            .field("uncommitted", &self.uncommitted.len())
            .field("publish_pending", &self.publish_pending)
            .finish_non_exhaustive()
    }
}

/// Publish every event of `key` that still has an unpublished marker, then
/// delete those markers. Returns how many events were published.
///
/// Pages are re-read from the start of the marker range after each
/// deletion, so the loop ends once the markers are gone.
///
/// # Errors
///
/// Store and sink failures propagate unmodified; markers of a failed batch
/// stay in place for the next attempt.
pub async fn recover_unpublished(
    event_store: &dyn EventStore,
    publisher: &dyn EventPublisher,
    key: &EntityKey,
) -> Result<usize, EngineError> {
    let mut published: usize = 0;
    loop {
        let slice = event_store.read_unpublished(key).await?;
        if slice.is_empty() {
            break;
        }
        publish_and_confirm(event_store, publisher, key, &slice.events).await?;
        published = published.saturating_add(slice.events.len());
        if !slice.has_more {
            break;
        }
    }
    if published > 0 {
        info!(key = %key, published, "republished unpublished events");
    }
    Ok(published)
}

async fn publish_and_confirm(
    event_store: &dyn EventStore,
    publisher: &dyn EventPublisher,
    key: &EntityKey,
    events: &[StorableEvent],
) -> Result<(), EngineError> {
    publisher.publish_batch(key, events).await?;
    let versions: BTreeSet<Version> = events.iter().map(|e| e.version).collect();
    event_store.delete_published(key, &versions).await?;
    Ok(())
}
