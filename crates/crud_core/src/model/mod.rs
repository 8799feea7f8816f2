//! Employee directory domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Hold relation-maintenance helpers that keep paired references in sync.
//!
//! # Invariants
//! - Every persistent record is identified by a positive flake id.
//! - Cross-record relations are expressed as ids, owned parts by value.

pub mod employee;
pub mod flake;

/// Contract for persistent records carrying audit timestamps.
///
/// Timestamps are epoch milliseconds assigned by storage; both are `None`
/// until the record has been persisted once.
pub trait Model {
    type Id: Copy + Eq;

    fn id(&self) -> Self::Id;
    fn created_at(&self) -> Option<i64>;
    fn modified_at(&self) -> Option<i64>;
}
