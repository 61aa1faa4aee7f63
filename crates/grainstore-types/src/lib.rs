//! Shared record types for the grainstore event-sourcing engine.
//!
//! Every crate in the workspace speaks in terms of these types: the storage
//! layer persists them, the engine produces and consumes them, and the
//! downstream publish sink receives them.
//!
//! # Modules
//!
//! - [`ids`] -- Entity keys and event versions
//! - [`records`] -- Storable events, snapshots, and query pages

pub mod ids;
pub mod records;

// Re-export all public types at crate root for convenience.
pub use ids::{EntityKey, Version};
pub use records::{Slice, StorableEvent, StorableState, VersionedEvent};
