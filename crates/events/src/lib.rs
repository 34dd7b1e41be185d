//! Domain events and status-transition fan-out.
//!
//! Flows emit typed events on every accepted mutation; the engine wraps them in
//! tenant-scoped envelopes and publishes them on a bus so the gated documents'
//! own lifecycles can react to status changes.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
