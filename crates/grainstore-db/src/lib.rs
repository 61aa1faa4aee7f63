//! Storage layer for the grainstore event-sourcing engine.
//!
//! The event log and the snapshot store are written against two small
//! backend traits so the same store logic runs on `PostgreSQL`, `Dragonfly`,
//! or in process.
//!
//! # Architecture
//!
//! ```text
//! EventStore (TableEventStore)        StateStore (BlobStateStore)
//!     |  permanent + Unpublished_ rows     |  one JSON record per key
//!     |  payloads split by codec           |
//!     v                                    v
//! TableBackend                         BlobBackend
//!     |-- PostgresTable                    |-- PostgresBlobs
//!     +-- MemoryTable                      |-- DragonflyBlobs
//!                                          +-- MemoryBlobs
//! ```
//!
//! # Modules
//!
//! - [`codec`] -- Payload chunking into fixed-size table cells
//! - [`backend`] -- Table and blob backend traits
//! - [`event_store`] -- Event log with unpublished markers
//! - [`snapshot_store`] -- Latest-snapshot persistence
//! - [`memory`] -- In-process backends
//! - [`postgres`] -- `PostgreSQL` connection pool and backends
//! - [`dragonfly`] -- `Dragonfly` snapshot backend
//! - [`error`] -- Shared error types

pub mod backend;
pub mod codec;
pub mod dragonfly;
pub mod error;
pub mod event_store;
pub mod memory;
pub mod postgres;
pub mod snapshot_store;

// Re-export primary types for convenience.
pub use backend::{BlobBackend, RowPage, RowRange, TableBackend, TableRow};
pub use codec::{CellSet, CodecError};
pub use dragonfly::DragonflyBlobs;
pub use error::DbError;
pub use event_store::{EventStore, TableEventStore};
pub use memory::{MemoryBlobs, MemoryTable};
pub use postgres::{PostgresBlobs, PostgresConfig, PostgresPool, PostgresTable};
pub use snapshot_store::{BlobStateStore, StateStore};
