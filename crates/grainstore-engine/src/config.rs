//! Per-entity engine configuration.

use serde::Deserialize;

use crate::registry::DEFAULT_NAME;

/// Default number of versions between snapshots.
pub const DEFAULT_SNAPSHOT_STEP: u64 = 100;

/// Which registrations an entity uses and how often it snapshots.
///
/// Every field has a default, so an empty mapping in a YAML or JSON file
/// yields [`EngineConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Versions between snapshots. `0` disables snapshots.
    pub snapshot_step: u64,
    /// Name of the event store registration.
    pub event_store: String,
    /// Name of the snapshot store registration.
    pub state_store: String,
    /// Name of the serializer registration.
    pub serializer: String,
    /// Name of the publisher registration.
    pub publisher: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_step: DEFAULT_SNAPSHOT_STEP,
            event_store: DEFAULT_NAME.to_owned(),
            state_store: DEFAULT_NAME.to_owned(),
            serializer: DEFAULT_NAME.to_owned(),
            publisher: DEFAULT_NAME.to_owned(),
        }
    }
}

impl EngineConfig {
    /// Override the snapshot cadence.
    #[must_use]
    pub const fn with_snapshot_step(mut self, step: u64) -> Self {
        self.snapshot_step = step;
        self
    }

    /// Whether a commit of `batch_size` events that ended at `version`
    /// crossed a multiple of the snapshot step.
    pub const fn snapshot_due(&self, version: u64, batch_size: u64) -> bool {
        let step = self.snapshot_step;
        if step == 0 || version < step {
            return false;
        }
        version.wrapping_rem(step) < batch_size
    }
}
