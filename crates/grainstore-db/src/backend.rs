//! Storage backend abstractions consumed by the stores.
//!
//! The event log needs a partitioned table addressed by a composite
//! (partition key, row key) with lexicographic range scans. The snapshot
//! store needs a flat blob namespace. Both are traits so the stores can run
//! against `PostgreSQL`, `Dragonfly`, or the in-memory backends used in tests.

use async_trait::async_trait;

use crate::codec::CellSet;
use crate::error::DbError;

/// One row of a partitioned table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Sort key inside the partition.
    pub row_key: String,
    /// Type tag column.
    pub type_tag: String,
    /// Payload cells.
    pub cells: CellSet,
}

/// Inclusive lexicographic range of row keys inside one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange<'a> {
    /// Smallest row key to return.
    pub start: &'a str,
    /// Largest row key to return.
    pub end: &'a str,
}

impl<'a> RowRange<'a> {
    /// Create an inclusive range.
    pub const fn new(start: &'a str, end: &'a str) -> Self {
        Self { start, end }
    }

    /// Whether `row_key` falls inside the range.
    pub fn contains(&self, row_key: &str) -> bool {
        row_key >= self.start && row_key <= self.end
    }
}

/// One page of a range query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowPage {
    /// Rows of this page, ascending by row key.
    pub rows: Vec<TableRow>,
    /// Row key to resume from when the backend truncated the results.
    pub continuation: Option<String>,
}

/// A partitioned table with insert-if-absent, tolerant delete, and range
/// queries.
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Create the underlying table if it does not exist.
    async fn ensure_table(&self) -> Result<(), DbError>;

    /// Insert all rows into `partition` as one atomic batch.
    ///
    /// Must fail with [`DbError::Conflict`], inserting nothing, if any row
    /// key already exists.
    async fn insert_batch(&self, partition: &str, rows: Vec<TableRow>) -> Result<(), DbError>;

    /// Delete the given rows from `partition`. Missing rows are ignored.
    async fn delete_batch(&self, partition: &str, row_keys: &[String]) -> Result<(), DbError>;

    /// Return one page of the rows of `partition` inside `range`.
    async fn query_range(&self, partition: &str, range: RowRange<'_>) -> Result<RowPage, DbError>;
}

/// A flat namespace of whole-object blobs.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Create the underlying container if it does not exist.
    async fn ensure_container(&self) -> Result<(), DbError>;

    /// Read the blob called `name`, or `None` if it does not exist.
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, DbError>;

    /// Create or overwrite the blob called `name`.
    async fn put(&self, name: &str, body: Vec<u8>) -> Result<(), DbError>;
}
