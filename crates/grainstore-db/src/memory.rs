//! In-process backends.
//!
//! [`MemoryTable`] and [`MemoryBlobs`] implement the backend traits on top of
//! ordered maps guarded by an async mutex. They honor the same contracts as
//! the networked backends (atomic insert batches, tolerant deletes, paged
//! range scans) and are used for embedding and in tests. Both can be told to
//! fail their next write to exercise error propagation.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backend::{BlobBackend, RowPage, RowRange, TableBackend, TableRow};
use crate::error::DbError;

/// Default number of rows returned per range query page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Rows of one partition, ordered by row key.
type Partition = BTreeMap<String, TableRow>;

/// In-memory partitioned table.
#[derive(Debug)]
pub struct MemoryTable {
    partitions: Mutex<HashMap<String, Partition>>,
    page_size: usize,
    init_calls: AtomicUsize,
    fail_next_insert: AtomicBool,
    fail_next_delete: AtomicBool,
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTable {
    /// Create an empty table with the default page size.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty table that returns at most `page_size` rows per query.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            partitions: Mutex::new(HashMap::new()),
            page_size: page_size.max(1),
            init_calls: AtomicUsize::new(0),
            fail_next_insert: AtomicBool::new(false),
            fail_next_delete: AtomicBool::new(false),
        }
    }

    /// Number of times [`TableBackend::ensure_table`] has been called.
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Make the next insert batch fail without touching any row.
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }

    /// Make the next delete batch fail without touching any row.
    pub fn fail_next_delete(&self) {
        self.fail_next_delete.store(true, Ordering::SeqCst);
    }

    /// All row keys currently stored in `partition`, in order.
    pub async fn row_keys(&self, partition: &str) -> Vec<String> {
        let partitions = self.partitions.lock().await;
        partitions
            .get(partition)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TableBackend for MemoryTable {
    async fn ensure_table(&self) -> Result<(), DbError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn insert_batch(&self, partition: &str, rows: Vec<TableRow>) -> Result<(), DbError> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(DbError::Backend("injected insert failure".to_owned()));
        }

        let mut partitions = self.partitions.lock().await;
        let existing = partitions.entry(partition.to_owned()).or_default();

        // Validate the whole batch before applying any of it.
        let mut seen = std::collections::HashSet::with_capacity(rows.len());
        for row in &rows {
            if existing.contains_key(&row.row_key) || !seen.insert(row.row_key.as_str()) {
                return Err(DbError::Conflict {
                    partition: partition.to_owned(),
                    row_key: row.row_key.clone(),
                });
            }
        }

        for row in rows {
            existing.insert(row.row_key.clone(), row);
        }
        Ok(())
    }

    async fn delete_batch(&self, partition: &str, row_keys: &[String]) -> Result<(), DbError> {
        if self.fail_next_delete.swap(false, Ordering::SeqCst) {
            return Err(DbError::Backend("injected delete failure".to_owned()));
        }

        let mut partitions = self.partitions.lock().await;
        if let Some(rows) = partitions.get_mut(partition) {
            for key in row_keys {
                rows.remove(key);
            }
        }
        Ok(())
    }

    async fn query_range(&self, partition: &str, range: RowRange<'_>) -> Result<RowPage, DbError> {
        let partitions = self.partitions.lock().await;
        let Some(rows) = partitions.get(partition) else {
            return Ok(RowPage::default());
        };

        let mut matching = rows
            .range(range.start.to_owned()..)
            .take_while(|(key, _)| key.as_str() <= range.end)
            .map(|(_, row)| row);

        let page: Vec<TableRow> = matching.by_ref().take(self.page_size).cloned().collect();
        let continuation = matching.next().map(|row| row.row_key.clone());

        Ok(RowPage {
            rows: page,
            continuation,
        })
    }
}

/// In-memory blob container.
#[derive(Debug, Default)]
pub struct MemoryBlobs {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    init_calls: AtomicUsize,
    fail_next_put: AtomicBool,
}

impl MemoryBlobs {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times [`BlobBackend::ensure_container`] has been called.
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Make the next put fail.
    pub fn fail_next_put(&self) {
        self.fail_next_put.store(true, Ordering::SeqCst);
    }

    /// Store raw bytes under `name`, bypassing any store-level encoding.
    pub async fn insert_raw(&self, name: &str, body: Vec<u8>) {
        self.blobs.lock().await.insert(name.to_owned(), body);
    }

    /// Number of blobs in the container.
    pub async fn len(&self) -> usize {
        self.blobs.lock().await.len()
    }

    /// Whether the container holds no blobs.
    pub async fn is_empty(&self) -> bool {
        self.blobs.lock().await.is_empty()
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobs {
    async fn ensure_container(&self) -> Result<(), DbError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, DbError> {
        Ok(self.blobs.lock().await.get(name).cloned())
    }

    async fn put(&self, name: &str, body: Vec<u8>) -> Result<(), DbError> {
        if self.fail_next_put.swap(false, Ordering::SeqCst) {
            return Err(DbError::Backend("injected put failure".to_owned()));
        }
        self.blobs.lock().await.insert(name.to_owned(), body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CellSet;

    fn row(key: &str) -> TableRow {
        TableRow {
            row_key: key.to_owned(),
            type_tag: "T".to_owned(),
            cells: CellSet::empty(),
        }
    }

    #[tokio::test]
    async fn conflicting_batch_inserts_nothing() {
        let table = MemoryTable::new();
        table.insert_batch("p", vec![row("b")]).await.ok();

        let result = table.insert_batch("p", vec![row("a"), row("b")]).await;
        assert!(matches!(result, Err(DbError::Conflict { .. })));
        assert_eq!(table.row_keys("p").await, vec!["b".to_owned()]);
    }

    #[tokio::test]
    async fn duplicate_keys_inside_one_batch_conflict() {
        let table = MemoryTable::new();
        let result = table.insert_batch("p", vec![row("a"), row("a")]).await;
        assert!(matches!(result, Err(DbError::Conflict { .. })));
        assert!(table.row_keys("p").await.is_empty());
    }

    #[tokio::test]
    async fn range_pages_report_continuation() {
        let table = MemoryTable::with_page_size(2);
        table
            .insert_batch("p", vec![row("a"), row("b"), row("c"), row("x")])
            .await
            .ok();

        let page = table
            .query_range("p", RowRange::new("a", "c"))
            .await
            .unwrap_or_default();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.continuation.as_deref(), Some("c"));

        let page = table
            .query_range("p", RowRange::new("c", "c"))
            .await
            .unwrap_or_default();
        assert_eq!(page.rows.len(), 1);
        assert!(page.continuation.is_none());
    }

    #[tokio::test]
    async fn partitions_are_isolated() {
        let table = MemoryTable::new();
        table.insert_batch("p", vec![row("a")]).await.ok();
        table.insert_batch("q", vec![row("a")]).await.ok();
        table.delete_batch("p", &["a".to_owned()]).await.ok();

        assert!(table.row_keys("p").await.is_empty());
        assert_eq!(table.row_keys("q").await.len(), 1);
    }

    #[tokio::test]
    async fn blobs_overwrite_and_report_missing() {
        let blobs = MemoryBlobs::new();
        assert_eq!(blobs.get("k").await.ok().flatten(), None);

        blobs.put("k", vec![1]).await.ok();
        blobs.put("k", vec![2]).await.ok();
        assert_eq!(blobs.get("k").await.ok().flatten(), Some(vec![2]));
        assert_eq!(blobs.len().await, 1);
    }
}
