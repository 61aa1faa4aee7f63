//! Store contract tests against the in-process backends.
//!
//! These run in every `cargo test` and cover paging, the unpublished
//! shadow, atomic batches, idempotent deletes, lazy initialization, and the
//! snapshot fallback rules.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

use std::collections::BTreeSet;
use std::sync::Arc;

use grainstore_db::codec::{CELL_SIZE, MAX_CAPACITY};
use grainstore_db::{
    BlobStateStore, DbError, EventStore, MemoryBlobs, MemoryTable, StateStore, TableEventStore,
};
use grainstore_types::{EntityKey, Slice, StorableEvent, StorableState, Version};

fn v(n: u64) -> Version {
    Version::new(n).expect("valid version")
}

fn events(range: std::ops::Range<u64>) -> Vec<StorableEvent> {
    range
        .map(|n| StorableEvent::new(v(n), "Deposited", format!("{{\"amount\":{n}}}").into_bytes()))
        .collect()
}

fn versions(range: std::ops::Range<u64>) -> BTreeSet<Version> {
    range.map(v).collect()
}

fn store_with_page_size(page_size: usize) -> (Arc<MemoryTable>, TableEventStore) {
    let table = Arc::new(MemoryTable::with_page_size(page_size));
    let store = TableEventStore::new("Default", table.clone());
    (table, store)
}

/// Read every page of events starting at `from`, following `has_more`.
async fn read_all(store: &TableEventStore, key: &EntityKey, from: Version) -> Vec<StorableEvent> {
    let mut all = Vec::new();
    let mut next = from;
    loop {
        let slice: Slice = store.read(key, next).await.expect("read");
        let has_more = slice.has_more;
        if let Some(last) = slice.last_version() {
            next = last.next().expect("below Version::MAX");
        }
        all.extend(slice.events);
        if !has_more {
            break;
        }
    }
    all
}

// =============================================================================
// Event log
// =============================================================================

#[tokio::test]
async fn read_returns_committed_sequence_across_pages() {
    let (_, store) = store_with_page_size(4);
    let key = EntityKey::from("Account_1");

    store.write(&key, &events(0..3)).await.expect("write");
    store.write(&key, &events(3..7)).await.expect("write");
    store.write(&key, &events(7..11)).await.expect("write");

    let all = read_all(&store, &key, Version::FIRST).await;
    assert_eq!(all, events(0..11));
}

#[tokio::test]
async fn read_from_middle_version() {
    let (_, store) = store_with_page_size(100);
    let key = EntityKey::from("Account_1");
    store.write(&key, &events(0..20)).await.expect("write");

    let slice = store.read(&key, v(15)).await.expect("read");
    assert_eq!(slice.versions(), (15..20).map(v).collect::<Vec<_>>());
    assert!(!slice.has_more);
}

#[tokio::test]
async fn read_orders_numerically_past_digit_boundaries() {
    let (_, store) = store_with_page_size(1000);
    let key = EntityKey::from("Account_1");
    store.write(&key, &events(0..120)).await.expect("write");

    let slice = store.read(&key, v(8)).await.expect("read");
    assert_eq!(slice.events.first().map(|e| e.version), Some(v(8)));
    assert_eq!(slice.last_version(), Some(v(119)));
    assert!(slice.events.windows(2).all(|w| w[0].version < w[1].version));
}

#[tokio::test]
async fn read_of_unknown_key_is_empty() {
    let (_, store) = store_with_page_size(10);
    let slice = store.read(&EntityKey::from("nobody"), Version::FIRST).await.expect("read");
    assert!(slice.is_empty());
    assert!(!slice.has_more);
}

#[tokio::test]
async fn write_creates_unpublished_markers_until_deleted() {
    let (_, store) = store_with_page_size(100);
    let key = EntityKey::from("Account_1");
    store.write(&key, &events(0..3)).await.expect("write");

    let unpublished = store.read_unpublished(&key).await.expect("read unpublished");
    assert_eq!(unpublished.events, events(0..3));

    store
        .delete_published(&key, &versions(0..3))
        .await
        .expect("delete");
    assert!(store.read_unpublished(&key).await.expect("read").is_empty());

    // The permanent log is untouched.
    assert_eq!(read_all(&store, &key, Version::FIRST).await, events(0..3));
}

#[tokio::test]
async fn unpublished_markers_page_like_events() {
    let (_, store) = store_with_page_size(2);
    let key = EntityKey::from("Account_1");
    store.write(&key, &events(0..5)).await.expect("write");

    let first = store.read_unpublished(&key).await.expect("read");
    assert_eq!(first.versions(), vec![v(0), v(1)]);
    assert!(first.has_more);

    store
        .delete_published(&key, &first.versions().into_iter().collect())
        .await
        .expect("delete");
    let second = store.read_unpublished(&key).await.expect("read");
    assert_eq!(second.versions(), vec![v(2), v(3)]);
    assert!(second.has_more);
}

#[tokio::test]
async fn delete_published_is_idempotent() {
    let (table, store) = store_with_page_size(100);
    let key = EntityKey::from("Account_1");
    store.write(&key, &events(0..4)).await.expect("write");

    store.delete_published(&key, &versions(0..2)).await.expect("first delete");
    let after_first = table.row_keys(key.as_str()).await;

    store.delete_published(&key, &versions(0..2)).await.expect("second delete");
    assert_eq!(table.row_keys(key.as_str()).await, after_first);
    assert_eq!(
        store.read_unpublished(&key).await.expect("read").versions(),
        vec![v(2), v(3)]
    );
}

#[tokio::test]
async fn colliding_version_rejects_whole_batch() {
    let (table, store) = store_with_page_size(100);
    let key = EntityKey::from("Account_1");
    store.write(&key, &events(0..3)).await.expect("write");
    let before = table.row_keys(key.as_str()).await;

    let result = store.write(&key, &events(2..5)).await;
    assert!(matches!(result, Err(DbError::Conflict { .. })));
    assert_eq!(table.row_keys(key.as_str()).await, before);
}

#[tokio::test]
async fn backend_failure_propagates_and_writes_nothing() {
    let (table, store) = store_with_page_size(100);
    let key = EntityKey::from("Account_1");
    table.fail_next_insert();

    let result = store.write(&key, &events(0..3)).await;
    assert!(matches!(result, Err(DbError::Backend(_))));
    assert!(table.row_keys(key.as_str()).await.is_empty());
}

#[tokio::test]
async fn oversize_payload_fails_before_touching_backend() {
    let (table, store) = store_with_page_size(100);
    let key = EntityKey::from("Account_1");
    let batch = vec![
        StorableEvent::new(v(0), "Small", vec![1]),
        StorableEvent::new(v(1), "Huge", vec![0; MAX_CAPACITY]),
    ];

    let result = store.write(&key, &batch).await;
    assert!(matches!(result, Err(DbError::Codec(_))));
    assert!(table.row_keys(key.as_str()).await.is_empty());
}

#[tokio::test]
async fn large_payload_round_trips_through_cells() {
    let (_, store) = store_with_page_size(100);
    let key = EntityKey::from("Blob_1");
    let payload: Vec<u8> = (0..(CELL_SIZE * 5 + 3)).map(|i| (i % 251) as u8).collect();
    store
        .write(&key, &[StorableEvent::new(v(0), "Uploaded", payload.clone())])
        .await
        .expect("write");

    let slice = store.read(&key, Version::FIRST).await.expect("read");
    assert_eq!(slice.events[0].payload, payload);
}

#[tokio::test]
async fn keys_do_not_see_each_other() {
    let (_, store) = store_with_page_size(100);
    let a = EntityKey::from("Account_a");
    let b = EntityKey::from("Account_b");
    store.write(&a, &events(0..2)).await.expect("write a");
    store.write(&b, &events(0..5)).await.expect("write b");

    assert_eq!(read_all(&store, &a, Version::FIRST).await.len(), 2);
    assert_eq!(read_all(&store, &b, Version::FIRST).await.len(), 5);
}

#[tokio::test]
async fn table_is_initialized_once_under_concurrent_first_use() {
    let (table, store) = store_with_page_size(100);
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let key = EntityKey::from(format!("Account_{i}"));
            store.write(&key, &events(0..1)).await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("write");
    }

    assert_eq!(table.init_calls(), 1);
}

// =============================================================================
// Snapshot store
// =============================================================================

#[tokio::test]
async fn snapshot_missing_is_none() {
    let store = BlobStateStore::new("Default", Arc::new(MemoryBlobs::new()));
    let state = store.read(&EntityKey::from("Account_1")).await.expect("read");
    assert!(state.is_none());
}

#[tokio::test]
async fn snapshot_write_overwrites_previous() {
    let blobs = Arc::new(MemoryBlobs::new());
    let store = BlobStateStore::new("Default", blobs.clone());
    let key = EntityKey::from("Account_1");

    store
        .write(&key, &StorableState::new(v(100), "Account", b"{\"balance\":1}".to_vec()))
        .await
        .expect("write");
    store
        .write(&key, &StorableState::new(v(201), "Account", b"{\"balance\":2}".to_vec()))
        .await
        .expect("write");

    let state = store.read(&key).await.expect("read").expect("snapshot");
    assert_eq!(state.version, v(201));
    assert_eq!(state.payload, b"{\"balance\":2}".to_vec());
    assert_eq!(blobs.len().await, 1);
}

#[tokio::test]
async fn corrupt_snapshot_reads_as_none() {
    let blobs = Arc::new(MemoryBlobs::new());
    blobs.insert_raw("Account_1", b"legacy tuple format".to_vec()).await;
    let store = BlobStateStore::new("Default", blobs);

    let state = store.read(&EntityKey::from("Account_1")).await.expect("read");
    assert!(state.is_none());
}

#[tokio::test]
async fn snapshot_put_failure_propagates() {
    let blobs = Arc::new(MemoryBlobs::new());
    blobs.fail_next_put();
    let store = BlobStateStore::new("Default", blobs);

    let result = store
        .write(
            &EntityKey::from("Account_1"),
            &StorableState::new(v(0), "Account", Vec::new()),
        )
        .await;
    assert!(matches!(result, Err(DbError::Backend(_))));
}

#[tokio::test]
async fn snapshot_container_is_initialized_once() {
    let blobs = Arc::new(MemoryBlobs::new());
    let store = Arc::new(BlobStateStore::new("Default", blobs.clone()));

    let reads = (0..8).map(|i| {
        let store = Arc::clone(&store);
        async move { store.read(&EntityKey::from(format!("Account_{i}"))).await }
    });
    for result in futures::future::join_all(reads).await {
        result.expect("read");
    }

    assert_eq!(blobs.init_calls(), 1);
}
