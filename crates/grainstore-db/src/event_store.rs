//! Append-only, per-key event log with an unpublished shadow.
//!
//! Every appended event is written twice in one atomic batch: a permanent
//! row that is kept forever, and an `Unpublished_` shadow row that is
//! deleted once the event has been handed to the downstream sink. A shadow
//! row that survives a crash is how the next activation learns that an
//! event still has to be published.
//!
//! # Row Keys
//!
//! | Row | Row key |
//! |-----|---------|
//! | Permanent event | `{version:019}` |
//! | Unpublished marker | `Unpublished_{version:019}` |
//!
//! Versions are zero-padded to 19 digits so that lexicographic order equals
//! numeric order. All permanent rows sort below `9999999999999999999`, and
//! all markers sort between `Unpublished_` and `` Unpublished` `` (backtick
//! is the character after `_`), so each query is a single range scan.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use grainstore_types::{EntityKey, Slice, StorableEvent, Version};
use tokio::sync::OnceCell;

use crate::backend::{RowRange, TableBackend, TableRow};
use crate::codec;
use crate::error::DbError;

/// Upper bound of the permanent row key range.
const VERSION_ROW_KEY_UPPER_LIMIT: &str = "9999999999999999999";

/// Prefix of unpublished marker row keys.
const UNPUBLISHED_PREFIX: &str = "Unpublished_";

/// Upper bound of the unpublished marker row key range.
const UNPUBLISHED_PREFIX_UPPER_LIMIT: &str = "Unpublished`";

/// Default table name of the event log.
pub const DEFAULT_TABLE_NAME: &str = "event_store";

/// Row key of the permanent row for `version`.
pub fn version_row_key(version: Version) -> String {
    format!("{:019}", version.get())
}

/// Row key of the unpublished marker for `version`.
pub fn unpublished_row_key(version: Version) -> String {
    format!("{UNPUBLISHED_PREFIX}{:019}", version.get())
}

/// Recover the version from a permanent or marker row key.
fn parse_row_key(row_key: &str) -> Result<Version, DbError> {
    let digits = row_key.strip_prefix(UNPUBLISHED_PREFIX).unwrap_or(row_key);
    digits
        .parse::<u64>()
        .ok()
        .and_then(Version::new)
        .ok_or_else(|| DbError::CorruptRow {
            row_key: row_key.to_owned(),
            reason: "row key is not a zero-padded version".to_owned(),
        })
}

/// Persistent, paged event log keyed by entity.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Registration name of this store.
    fn name(&self) -> &str;

    /// Read events of `key` with version `>= from`, ascending, one page.
    async fn read(&self, key: &EntityKey, from: Version) -> Result<Slice, DbError>;

    /// Read the events of `key` that have not been published yet, one page.
    async fn read_unpublished(&self, key: &EntityKey) -> Result<Slice, DbError>;

    /// Atomically append `events` together with their unpublished markers.
    ///
    /// Fails as a whole with [`DbError::Conflict`] if any version exists.
    async fn write(&self, key: &EntityKey, events: &[StorableEvent]) -> Result<(), DbError>;

    /// Remove the unpublished markers of `versions`. Missing markers are
    /// ignored.
    async fn delete_published(&self, key: &EntityKey, versions: &BTreeSet<Version>)
    -> Result<(), DbError>;
}

/// [`EventStore`] over a partitioned table backend.
///
/// The backing table is created on first use. Initialization runs once per
/// store instance even under concurrent first calls for different keys; a
/// failed attempt is retried by the next caller.
pub struct TableEventStore {
    name: String,
    backend: Arc<dyn TableBackend>,
    initialized: OnceCell<()>,
}

impl TableEventStore {
    /// Create a store called `name` over `backend`.
    pub fn new(name: impl Into<String>, backend: Arc<dyn TableBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
            initialized: OnceCell::new(),
        }
    }

    async fn table(&self) -> Result<&dyn TableBackend, DbError> {
        self.initialized
            .get_or_try_init(|| async {
                self.backend.ensure_table().await?;
                tracing::debug!(store = self.name, "Event table initialized");
                Ok::<(), DbError>(())
            })
            .await?;
        Ok(self.backend.as_ref())
    }

    async fn read_range(&self, key: &EntityKey, range: RowRange<'_>) -> Result<Slice, DbError> {
        let table = self.table().await?;
        let page = table.query_range(key.as_str(), range).await?;

        let mut events = Vec::with_capacity(page.rows.len());
        for row in page.rows {
            let version = parse_row_key(&row.row_key)?;
            events.push(StorableEvent::new(
                version,
                row.type_tag,
                codec::decode(&row.cells),
            ));
        }

        Ok(Slice::new(events, page.continuation.is_some()))
    }
}

#[async_trait]
impl EventStore for TableEventStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, key: &EntityKey, from: Version) -> Result<Slice, DbError> {
        let start = version_row_key(from);
        self.read_range(key, RowRange::new(&start, VERSION_ROW_KEY_UPPER_LIMIT))
            .await
    }

    async fn read_unpublished(&self, key: &EntityKey) -> Result<Slice, DbError> {
        self.read_range(
            key,
            RowRange::new(UNPUBLISHED_PREFIX, UNPUBLISHED_PREFIX_UPPER_LIMIT),
        )
        .await
    }

    async fn write(&self, key: &EntityKey, events: &[StorableEvent]) -> Result<(), DbError> {
        if events.is_empty() {
            return Ok(());
        }

        // Encode everything before touching the backend so an oversize
        // payload fails the batch up front.
        let mut rows = Vec::with_capacity(events.len().saturating_mul(2));
        for event in events {
            let cells = codec::encode(&event.payload)?;
            rows.push(TableRow {
                row_key: version_row_key(event.version),
                type_tag: event.event_type.clone(),
                cells: cells.clone(),
            });
            rows.push(TableRow {
                row_key: unpublished_row_key(event.version),
                type_tag: event.event_type.clone(),
                cells,
            });
        }

        let table = self.table().await?;
        table.insert_batch(key.as_str(), rows).await?;

        tracing::debug!(%key, count = events.len(), "Appended events");
        Ok(())
    }

    async fn delete_published(
        &self,
        key: &EntityKey,
        versions: &BTreeSet<Version>,
    ) -> Result<(), DbError> {
        if versions.is_empty() {
            return Ok(());
        }

        let row_keys: Vec<String> = versions.iter().copied().map(unpublished_row_key).collect();
        let table = self.table().await?;
        table.delete_batch(key.as_str(), &row_keys).await?;

        tracing::debug!(%key, count = row_keys.len(), "Deleted unpublished markers");
        Ok(())
    }
}
