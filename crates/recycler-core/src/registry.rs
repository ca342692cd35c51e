//! Type registry: dense ids for item kinds, allocated in first-seen order.

use std::collections::HashMap;
use std::rc::Rc;

use crate::comparator::DiffComparator;

/// Dense identifier for an item kind.
///
/// Ids start at 0, follow first-seen order, and are never reused or
/// renumbered for the lifetime of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub usize);

/// Grows-only mapping from caller type keys to [`TypeId`]s, with an optional
/// comparator slot per id.
///
/// There is no eviction; the registry is expected to hold a small, bounded
/// number of distinct keys over an adapter's lifetime. First resolution of an
/// unseen key is not safe against concurrent callers; all access is expected
/// to be confined to one thread.
#[derive(Default)]
pub struct TypeRegistry {
    ids: HashMap<String, TypeId>,
    comparators: Vec<Option<Rc<dyn DiffComparator>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `key`, allocating the next sequential id (and an
    /// empty comparator slot) on first sight.
    pub fn resolve(&mut self, key: &str) -> TypeId {
        if let Some(id) = self.ids.get(key) {
            return *id;
        }
        let id = TypeId(self.comparators.len());
        self.ids.insert(key.to_string(), id);
        self.comparators.push(None);
        id
    }

    /// Lookup without allocation.
    pub fn type_id_of(&self, key: &str) -> Option<TypeId> {
        self.ids.get(key).copied()
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.comparators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparators.is_empty()
    }

    /// Fills the comparator slot for `key`, resolving its id first if the key
    /// is unseen. The slot comparator participates in diff identity and
    /// change-payload resolution whenever no per-commit comparator overrides
    /// it.
    pub fn set_comparator(&mut self, key: &str, comparator: Rc<dyn DiffComparator>) -> TypeId {
        let id = self.resolve(key);
        self.comparators[id.0] = Some(comparator);
        id
    }

    pub fn comparator_for(&self, id: TypeId) -> Option<&Rc<dyn DiffComparator>> {
        self.comparators.get(id.0).and_then(|slot| slot.as_ref())
    }

    /// Iterates the populated comparator slots.
    pub fn registered_comparators(
        &self,
    ) -> impl Iterator<Item = (TypeId, &Rc<dyn DiffComparator>)> {
        self.comparators
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|c| (TypeId(index), c)))
    }
}
