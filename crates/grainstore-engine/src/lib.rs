//! Event-sourced entities on top of the grainstore storage layer.
//!
//! Every state change is an immutable event written to the event log and
//! then handed to a downstream publisher. State is reconstructed by
//! replaying events over the latest snapshot, and a new snapshot is taken
//! each time a commit crosses a multiple of the configured step.
//!
//! # Modules
//!
//! - [`aggregate`] -- Aggregate and event traits, reducer type
//! - [`entity`] -- Activation, raise, and commit
//! - [`registry`] -- Named store, serializer, and publisher lookup
//! - [`serializer`] -- JSON and `MessagePack` serializers
//! - [`publisher`] -- Publish sink trait and in-process recorder
//! - [`config`] -- Engine configuration
//! - [`error`] -- Engine error types

pub mod aggregate;
pub mod config;
pub mod entity;
pub mod error;
pub mod publisher;
pub mod registry;
pub mod serializer;

pub use aggregate::{Aggregate, DomainEvent, Reducer};
pub use config::EngineConfig;
pub use entity::{EventSourced, recover_unpublished};
pub use error::{EngineError, StoreKind};
pub use publisher::{EventPublisher, MemoryPublisher, PublishedBatch};
pub use registry::StoreRegistry;
pub use serializer::{DataSerializer, JsonSerializer, MessagePackSerializer};
