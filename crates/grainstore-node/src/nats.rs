//! NATS publisher for committed events.
//!
//! Each event becomes one message on `{prefix}.{entity key}` whose payload
//! is the serialized event. Headers carry the version and event type, and
//! `Nats-Msg-Id` is set to `{key}:{version}` so a `JetStream` stream with a
//! duplicate window drops republished events.

use async_trait::async_trait;
use grainstore_engine::{EngineError, EventPublisher};
use grainstore_types::{EntityKey, StorableEvent};
use tracing::{debug, info};

use crate::error::NodeError;

/// Header used by `JetStream` for message deduplication.
const MSG_ID_HEADER: &str = "Nats-Msg-Id";

/// Header carrying the event version.
const VERSION_HEADER: &str = "Grainstore-Version";

/// Header carrying the event type tag.
const EVENT_TYPE_HEADER: &str = "Grainstore-Event-Type";

/// [`EventPublisher`] over a NATS connection.
pub struct NatsPublisher {
    name: String,
    client: async_nats::Client,
    subject_prefix: String,
}

impl NatsPublisher {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Nats`] if the connection cannot be established.
    pub async fn connect(
        name: &str,
        url: &str,
        subject_prefix: &str,
    ) -> Result<Self, NodeError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| NodeError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self {
            name: name.to_owned(),
            client,
            subject_prefix: subject_prefix.to_owned(),
        })
    }

    /// Subject events of `key` are published on.
    pub fn subject_for(&self, key: &EntityKey) -> String {
        format!("{}.{key}", self.subject_prefix)
    }
}

fn headers_for(key: &EntityKey, event: &StorableEvent) -> async_nats::HeaderMap {
    let mut headers = async_nats::HeaderMap::new();
    headers.insert(MSG_ID_HEADER, format!("{key}:{}", event.version).as_str());
    headers.insert(VERSION_HEADER, event.version.to_string().as_str());
    headers.insert(EVENT_TYPE_HEADER, event.event_type.as_str());
    headers
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish_batch(
        &self,
        key: &EntityKey,
        events: &[StorableEvent],
    ) -> Result<(), EngineError> {
        let subject = self.subject_for(key);
        for event in events {
            self.client
                .publish_with_headers(
                    subject.clone(),
                    headers_for(key, event),
                    event.payload.clone().into(),
                )
                .await
                .map_err(|e| EngineError::Publish(format!("failed to publish to {subject}: {e}")))?;
        }
        // Markers are deleted after this returns, so the batch must have
        // left the client buffer.
        self.client
            .flush()
            .await
            .map_err(|e| EngineError::Publish(format!("failed to flush {subject}: {e}")))?;
        debug!(subject = subject, events = events.len(), "published batch");
        Ok(())
    }
}
