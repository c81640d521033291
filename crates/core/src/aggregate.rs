//! Aggregate root trait and optimistic concurrency expectation.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
///
/// Aggregates are the unit of consistency: every mutation goes through the
/// root and bumps its version, which persistence layers use as a
/// compare-and-swap token.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Incremented once per applied mutation.
    fn version(&self) -> u64;
}

/// The version a stored aggregate must still be at for a write to apply.
///
/// Inserts of new aggregates carry no expectation; the store's uniqueness
/// constraint is what rejects a concurrent first write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExpectedVersion(u64);

impl ExpectedVersion {
    pub const fn exact(version: u64) -> Self {
        Self(version)
    }

    /// Captures the aggregate's current version, before it is mutated.
    pub fn of<A: AggregateRoot>(aggregate: &A) -> Self {
        Self(aggregate.version())
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn matches(self, actual: u64) -> bool {
        self.0 == actual
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {}, actual: {actual})",
                self.0
            )))
        }
    }
}
