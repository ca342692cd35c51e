//! The list adapter: committed state, direct mutation, transactions, and
//! listener fanout.
//!
//! All mutation operations share one routing switch: with no transaction open
//! they act on the committed sequence and synchronously notify listeners;
//! with a transaction open they act on the working copy and emit nothing
//! until commit, when the diff engine reconciles the two states into an edit
//! script that is replayed through the same listener surface.
//!
//! Everything is single-threaded and synchronous; callers confine the
//! adapter to one thread. Every index is validated fully before any mutation
//! happens, so a failed call never leaves partial state behind.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;

use crate::comparator::{ComparatorTable, DiffComparator};
use crate::diff::{diff, DiffOp};
use crate::event::ListUpdate;
use crate::registry::{TypeId, TypeRegistry};
use crate::Entry;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("insertion index {index} out of bounds for length {len}")]
    InsertOutOfBounds { index: usize, len: usize },
    #[error("range {from}..{to} out of bounds for length {len}")]
    RangeOutOfBounds { from: usize, to: usize, len: usize },
    #[error("move {from} -> {to} out of bounds for length {len}")]
    MoveOutOfBounds { from: usize, to: usize, len: usize },
}

type Listener = Box<dyn FnMut(&ListUpdate)>;

/// Ordered, heterogeneously-typed list with transactional staging and
/// diff-based reconciliation on commit.
#[derive(Default)]
pub struct Adapter {
    registry: TypeRegistry,
    committed: Vec<Entry>,
    staged: Option<Vec<Entry>>,
    next_listener_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

impl Adapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a type key to its dense id, allocating on first sight.
    pub fn resolve(&mut self, key: &str) -> TypeId {
        self.registry.resolve(key)
    }

    /// Registers the fallback comparator for a type; per-commit comparators
    /// passed to [`Adapter::commit_transaction`] override it.
    pub fn set_comparator(&mut self, key: &str, comparator: Rc<dyn DiffComparator>) -> TypeId {
        self.registry.set_comparator(key, comparator)
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Subscribes a listener; returns an id usable with
    /// [`Adapter::off_update`]. Listeners run synchronously, in subscription
    /// order, on the mutating caller's thread.
    pub fn on_update<F>(&mut self, listener: F) -> u64
    where
        F: FnMut(&ListUpdate) + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id = self.next_listener_id.saturating_add(1);
        self.listeners.insert(id, Box::new(listener));
        id
    }

    pub fn off_update(&mut self, listener_id: u64) -> bool {
        self.listeners.remove(&listener_id).is_some()
    }

    pub fn in_transaction(&self) -> bool {
        self.staged.is_some()
    }

    /// Length of the sequence the current mutations act on (the working copy
    /// inside a transaction, the committed state otherwise).
    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    /// Length of the committed sequence, ignoring any open transaction.
    pub fn committed_len(&self) -> usize {
        self.committed.len()
    }

    pub fn committed(&self) -> &[Entry] {
        &self.committed
    }

    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.data().get(index)
    }

    pub fn type_id_at(&self, index: usize) -> Option<TypeId> {
        self.data().get(index).map(|entry| entry.type_id)
    }

    fn data(&self) -> &Vec<Entry> {
        self.staged.as_ref().unwrap_or(&self.committed)
    }

    fn data_mut(&mut self) -> &mut Vec<Entry> {
        match &mut self.staged {
            Some(working) => working,
            None => &mut self.committed,
        }
    }

    fn emit(&mut self, update: ListUpdate) {
        for listener in self.listeners.values_mut() {
            listener(&update);
        }
    }

    /// Appends one entry; notifies `Inserted` at the new last index.
    pub fn push(&mut self, key: &str, value: Value) {
        let type_id = self.registry.resolve(key);
        self.data_mut().push(Entry::new(type_id, value));
        if !self.in_transaction() {
            let index = self.committed.len() - 1;
            self.emit(ListUpdate::Inserted { index });
        }
    }

    /// Inserts one entry at `index` (`0 <= index <= len`).
    pub fn insert(&mut self, index: usize, key: &str, value: Value) -> Result<(), AdapterError> {
        let len = self.len();
        if index > len {
            return Err(AdapterError::InsertOutOfBounds { index, len });
        }
        let type_id = self.registry.resolve(key);
        self.data_mut().insert(index, Entry::new(type_id, value));
        if !self.in_transaction() {
            self.emit(ListUpdate::Inserted { index });
        }
        Ok(())
    }

    /// Appends all values as one contiguous range; no-op when empty.
    pub fn push_all(&mut self, key: &str, values: Vec<Value>) {
        if values.is_empty() {
            return;
        }
        let type_id = self.registry.resolve(key);
        let count = values.len();
        let data = self.data_mut();
        let start = data.len();
        data.extend(values.into_iter().map(|v| Entry::new(type_id, v)));
        if !self.in_transaction() {
            self.emit(ListUpdate::RangeInserted { start, count });
        }
    }

    /// Inserts all values as one contiguous range starting at `index`; no-op
    /// when empty.
    pub fn insert_all(
        &mut self,
        index: usize,
        key: &str,
        values: Vec<Value>,
    ) -> Result<(), AdapterError> {
        let len = self.len();
        if index > len {
            return Err(AdapterError::InsertOutOfBounds { index, len });
        }
        if values.is_empty() {
            return Ok(());
        }
        let type_id = self.registry.resolve(key);
        let count = values.len();
        self.data_mut().splice(
            index..index,
            values.into_iter().map(|v| Entry::new(type_id, v)),
        );
        if !self.in_transaction() {
            self.emit(ListUpdate::RangeInserted {
                start: index,
                count,
            });
        }
        Ok(())
    }

    /// Replaces the entry at `index` with a new typed value; notifies
    /// `Changed` carrying `payload`.
    pub fn replace(
        &mut self,
        index: usize,
        key: &str,
        value: Value,
        payload: Option<Value>,
    ) -> Result<(), AdapterError> {
        let len = self.len();
        if index >= len {
            return Err(AdapterError::IndexOutOfBounds { index, len });
        }
        let type_id = self.registry.resolve(key);
        self.data_mut()[index] = Entry::new(type_id, value);
        if !self.in_transaction() {
            self.emit(ListUpdate::Changed { index, payload });
        }
        Ok(())
    }

    /// Re-notifies `index` as changed without touching stored data.
    pub fn refresh(&mut self, index: usize, payload: Option<Value>) -> Result<(), AdapterError> {
        let len = self.len();
        if index >= len {
            return Err(AdapterError::IndexOutOfBounds { index, len });
        }
        if !self.in_transaction() {
            self.emit(ListUpdate::Changed { index, payload });
        }
        Ok(())
    }

    /// Re-notifies `from..to` as changed without touching stored data; no-op
    /// when the range is empty.
    pub fn refresh_range(
        &mut self,
        from: usize,
        to: usize,
        payload: Option<Value>,
    ) -> Result<(), AdapterError> {
        let len = self.len();
        if from > to || to > len {
            return Err(AdapterError::RangeOutOfBounds { from, to, len });
        }
        if from == to {
            return Ok(());
        }
        if !self.in_transaction() {
            self.emit(ListUpdate::RangeChanged {
                start: from,
                count: to - from,
                payload,
            });
        }
        Ok(())
    }

    /// Asks every entry to re-check the payload hint and update as needed.
    pub fn refresh_all(&mut self, payload: Option<Value>) {
        let len = self.len();
        if len > 0 && !self.in_transaction() {
            self.emit(ListUpdate::RangeChanged {
                start: 0,
                count: len,
                payload,
            });
        }
    }

    /// Deletes and returns the entry at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Entry, AdapterError> {
        let len = self.len();
        if index >= len {
            return Err(AdapterError::IndexOutOfBounds { index, len });
        }
        let removed = self.data_mut().remove(index);
        if !self.in_transaction() {
            self.emit(ListUpdate::Removed { index });
        }
        Ok(removed)
    }

    /// Deletes the contiguous range `from..to`; no-op when `from == to`.
    pub fn remove_range(&mut self, from: usize, to: usize) -> Result<(), AdapterError> {
        let len = self.len();
        if from > to || to > len {
            return Err(AdapterError::RangeOutOfBounds { from, to, len });
        }
        if from == to {
            return Ok(());
        }
        self.data_mut().drain(from..to);
        if !self.in_transaction() {
            self.emit(ListUpdate::RangeRemoved {
                start: from,
                count: to - from,
            });
        }
        Ok(())
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        let len = self.len();
        if len == 0 {
            return;
        }
        self.data_mut().clear();
        if !self.in_transaction() {
            self.emit(ListUpdate::RangeRemoved {
                start: 0,
                count: len,
            });
        }
    }

    /// Relocates the entry at `from`: it is popped first and then reinserted
    /// at `to` in the already-shrunk sequence, so `move_item(0, 2)` on
    /// `[A, B, C]` yields `[B, C, A]`.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), AdapterError> {
        let len = self.len();
        if from >= len || to >= len {
            return Err(AdapterError::MoveOutOfBounds { from, to, len });
        }
        let data = self.data_mut();
        let entry = data.remove(from);
        data.insert(to, entry);
        if !self.in_transaction() {
            self.emit(ListUpdate::Moved { from, to });
        }
        Ok(())
    }

    /// Opens a transaction whose working copy is a clone of the committed
    /// state. With `cancel_existing` false and a transaction already open,
    /// the existing working copy is kept and further mutations stack on top
    /// of it; otherwise any uncommitted working copy is discarded.
    pub fn begin_transaction(&mut self, cancel_existing: bool) {
        if cancel_existing || self.staged.is_none() {
            self.staged = Some(self.committed.clone());
        }
    }

    /// Discards the working copy; mutations apply directly again.
    pub fn cancel_transaction(&mut self) {
        self.staged = None;
    }

    /// Commits the working copy: it becomes the committed state, and the edit
    /// script reconciling the previous state into it is replayed through the
    /// listeners, one notification per script entry. The state swap happens
    /// before any notification fires. Per-commit comparators are keyed by
    /// type key and override the registry's comparator slots for this run.
    ///
    /// No-op (empty script, no notifications) without an open transaction.
    pub fn commit_transaction(
        &mut self,
        detect_moves: bool,
        comparators: &[(&str, Rc<dyn DiffComparator>)],
    ) -> Vec<DiffOp> {
        let Some(staged) = self.staged.take() else {
            return Vec::new();
        };

        let mut table = ComparatorTable::new();
        for (type_id, comparator) in self.registry.registered_comparators() {
            table.insert(type_id, Rc::clone(comparator));
        }
        for (key, comparator) in comparators {
            let type_id = self.registry.resolve(key);
            table.insert(type_id, Rc::clone(comparator));
        }

        let old = std::mem::replace(&mut self.committed, staged);
        let script = diff(&old, &self.committed, &table, detect_moves);

        for op in &script {
            let update = match op {
                DiffOp::RemoveRange { position, count } => {
                    if *count == 1 {
                        ListUpdate::Removed { index: *position }
                    } else {
                        ListUpdate::RangeRemoved {
                            start: *position,
                            count: *count,
                        }
                    }
                }
                DiffOp::InsertRange { position, items } => {
                    if items.len() == 1 {
                        ListUpdate::Inserted { index: *position }
                    } else {
                        ListUpdate::RangeInserted {
                            start: *position,
                            count: items.len(),
                        }
                    }
                }
                DiffOp::Moved { from, to } => ListUpdate::Moved {
                    from: *from,
                    to: *to,
                },
                DiffOp::Changed {
                    position, payload, ..
                } => ListUpdate::Changed {
                    index: *position,
                    payload: payload.clone(),
                },
            };
            self.emit(update);
        }

        script
    }
}
