//! Core primitives for recycler-rs.
//!
//! An [`adapter::Adapter`] manages an ordered list of heterogeneously-typed
//! entries. Callers either mutate the list directly, in which case every
//! operation synchronously notifies subscribed listeners, or stage an
//! arbitrary number of mutations inside a transaction; on commit the old and
//! new sequences are reconciled by the [`diff`] engine into a minimal edit
//! script which is then replayed through the same notification surface.
//!
//! The diff is O(old-length x new-length) in the worst case. Callers that
//! need frequent large-scale updates should prefer the direct mutation API,
//! which is O(1) amortized per operation.

pub mod adapter;
pub mod comparator;
pub mod diff;
pub mod event;
pub mod factory;
pub mod registry;

use serde_json::Value;

use registry::TypeId;

/// One element of the managed sequence: an item kind plus its opaque payload.
///
/// The payload is never inspected structurally by the reconciliation core; it
/// is only handed to comparators and carried through edit scripts.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub type_id: TypeId,
    pub value: Value,
}

impl Entry {
    pub fn new(type_id: TypeId, value: Value) -> Self {
        Self { type_id, value }
    }
}

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
