//! Explicit per-type factories for the view-building collaborator.
//!
//! The reconciliation core never calls into this; a consumer registers one
//! closure per type id and asks for a renderable handle by id when it
//! materializes a position. Registration is explicit, so a missing factory
//! surfaces as a `None` at the lookup site instead of a runtime
//! reflection failure.

use std::collections::HashMap;

use crate::registry::TypeId;

pub struct FactoryRegistry<R> {
    factories: HashMap<TypeId, Box<dyn Fn() -> R>>,
}

impl<R> FactoryRegistry<R> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, type_id: TypeId, factory: F)
    where
        F: Fn() -> R + 'static,
    {
        self.factories.insert(type_id, Box::new(factory));
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.factories.contains_key(&type_id)
    }

    pub fn create(&self, type_id: TypeId) -> Option<R> {
        self.factories.get(&type_id).map(|factory| factory())
    }
}

impl<R> Default for FactoryRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}
