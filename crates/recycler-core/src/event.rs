//! Consumer-facing notification primitives.

use serde_json::Value;

/// One structural update notification.
///
/// Direct mutations emit these inline, one per operation; a transaction
/// commit emits one per edit-script entry, after the committed state swap.
/// `Changed` / `RangeChanged` carry the opaque change payload hint, `None`
/// meaning a full rebind.
#[derive(Debug, Clone, PartialEq)]
pub enum ListUpdate {
    Inserted { index: usize },
    RangeInserted { start: usize, count: usize },
    Removed { index: usize },
    RangeRemoved { start: usize, count: usize },
    Changed { index: usize, payload: Option<Value> },
    RangeChanged { start: usize, count: usize, payload: Option<Value> },
    Moved { from: usize, to: usize },
}
