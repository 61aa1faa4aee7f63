//! Downstream publish sink.
//!
//! After a batch is durable in the event log it is handed to an
//! [`EventPublisher`]. Delivery is at-least-once: a batch may be published
//! again during recovery if the process died before its unpublished markers
//! were deleted, so sinks should deduplicate on `(key, version)`.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use grainstore_types::{EntityKey, StorableEvent};
use tokio::sync::Mutex;

use crate::error::EngineError;

/// Receives committed event batches in version order.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Registration name of this publisher.
    fn name(&self) -> &str;

    /// Deliver one batch of events for `key`.
    async fn publish_batch(&self, key: &EntityKey, events: &[StorableEvent])
    -> Result<(), EngineError>;
}

/// A batch recorded by [`MemoryPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedBatch {
    /// Entity the batch belongs to.
    pub key: EntityKey,
    /// Events in the order they were delivered.
    pub events: Vec<StorableEvent>,
}

/// In-process publisher that records every batch.
#[derive(Debug)]
pub struct MemoryPublisher {
    name: String,
    batches: Mutex<Vec<PublishedBatch>>,
    fail_next: AtomicBool,
}

impl MemoryPublisher {
    /// Create an empty recording publisher.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batches: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make the next `publish_batch` call fail without recording anything.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// All batches delivered so far.
    pub async fn batches(&self) -> Vec<PublishedBatch> {
        self.batches.lock().await.clone()
    }

    /// All delivered events for `key`, flattened across batches.
    pub async fn events_for(&self, key: &EntityKey) -> Vec<StorableEvent> {
        self.batches
            .lock()
            .await
            .iter()
            .filter(|b| &b.key == key)
            .flat_map(|b| b.events.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish_batch(
        &self,
        key: &EntityKey,
        events: &[StorableEvent],
    ) -> Result<(), EngineError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(EngineError::Publish(format!(
                "sink `{}` rejected batch for {key}",
                self.name
            )));
        }
        self.batches.lock().await.push(PublishedBatch {
            key: key.clone(),
            events: events.to_vec(),
        });
        Ok(())
    }
}
