//! Per-type comparison strategies used by the diff engine.
//!
//! A [`DiffComparator`] answers two questions about a pair of payloads of the
//! same type: are they the same logical entity (identity), and if so, what
//! changed (an opaque payload hint, `None` meaning "no update needed"). The
//! defaults mirror the layered fallback: identity falls back to structural
//! equality of the payload values, and contents are considered the same
//! exactly when no change payload is derived.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::registry::TypeId;

pub trait DiffComparator {
    /// Whether the two payloads denote the same logical entity across list
    /// versions. Default: structural equality.
    fn items_same(&self, old: &Value, new: &Value) -> bool {
        old == new
    }

    /// Opaque hint describing what changed between two identity-equal
    /// payloads, or `None` when no update is needed. Default: `None`.
    fn change_payload(&self, _old: &Value, _new: &Value) -> Option<Value> {
        None
    }

    /// Whether a matched pair needs re-rendering at all. Default: derived
    /// from [`DiffComparator::change_payload`].
    fn contents_same(&self, old: &Value, new: &Value) -> bool {
        self.change_payload(old, new).is_none()
    }
}

/// Comparator lookup for one reconciliation run, keyed by type id.
///
/// Built at commit time by layering per-commit comparators over the
/// registry's comparator slots; absent types fall through to structural
/// equality.
#[derive(Default)]
pub struct ComparatorTable {
    by_type: HashMap<TypeId, Rc<dyn DiffComparator>>,
}

impl ComparatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overrides) the comparator for `type_id`.
    pub fn insert(&mut self, type_id: TypeId, comparator: Rc<dyn DiffComparator>) {
        self.by_type.insert(type_id, comparator);
    }

    pub fn get(&self, type_id: TypeId) -> Option<&dyn DiffComparator> {
        self.by_type.get(&type_id).map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
