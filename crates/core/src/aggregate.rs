//! Aggregate root trait and optimistic concurrency expectations.

/// Aggregate root marker + minimal interface.
///
/// Approval flows are the only aggregate in this workspace, but the trait stays
/// small so storage adapters can be written against it without knowing what a
/// flow looks like.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the stored record.
    ///
    /// Every accepted write bumps this by one; stores compare it before
    /// overwriting a record.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for a stored record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (initial inserts, migrations).
    Any,
    /// The record must not exist yet.
    NoRecord,
    /// Require the record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Whether `actual` satisfies this expectation. `None` means "no record".
    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedVersion::Any, _) => true,
            (ExpectedVersion::NoRecord, None) => true,
            (ExpectedVersion::NoRecord, Some(_)) => false,
            (ExpectedVersion::Exact(_), None) => false,
            (ExpectedVersion::Exact(v), Some(a)) => v == a,
        }
    }
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` validates a command against the
///   current snapshot and returns the events describing the change.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO. Storage, retries and publication live in the
/// infrastructure layer.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    ///
    /// This must not mutate state. State evolution is done through `apply`.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
