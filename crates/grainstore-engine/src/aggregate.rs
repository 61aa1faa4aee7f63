//! Domain-side contracts: aggregate state, its events, and the reducer.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// An event type raised by an aggregate.
///
/// Usually an enum with one variant per kind of change.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync {
    /// Tag stored alongside the payload, for diagnostics and consumers.
    fn event_type(&self) -> &'static str;
}

/// Entity state rebuilt by folding events.
///
/// `Default` is the state before the first event.
pub trait Aggregate: Default + Serialize + DeserializeOwned + Send + Sync {
    /// The event enum this aggregate reacts to.
    type Event: DomainEvent;

    /// Tag stored alongside snapshots.
    const STATE_TYPE: &'static str;

    /// Produce the next state. Must be deterministic and side-effect free.
    #[must_use]
    fn apply(self, event: &Self::Event) -> Self;
}

/// State transition function used by the engine.
///
/// Defaults to [`Aggregate::apply`]; an entity can be given another pure
/// function for the same state and event types.
pub type Reducer<S, E> = fn(S, &E) -> S;

/// The reducer that dispatches to [`Aggregate::apply`].
pub const fn default_reducer<A: Aggregate>() -> Reducer<A, A::Event> {
    A::apply
}
