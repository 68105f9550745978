use std::collections::BTreeMap;

use crate::error::{MockError, MockResult};

/// Records keyed by ids handed out from 0 upwards. Removed ids are not reused.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    kind: &'static str,
    next_id: u64,
    items: BTreeMap<u64, T>,
}

impl<T> Arena<T> {
    pub(crate) fn new(kind: &'static str) -> Self {
        Self {
            kind,
            next_id: 0,
            items: BTreeMap::new(),
        }
    }

    pub(crate) fn insert_with(&mut self, build: impl FnOnce(u64) -> T) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.insert(id, build(id));
        id
    }

    pub(crate) fn get(&self, id: u64) -> MockResult<&T> {
        self.items
            .get(&id)
            .ok_or_else(|| MockError::not_found(self.kind, id))
    }

    pub(crate) fn get_mut(&mut self, id: u64) -> MockResult<&mut T> {
        let kind = self.kind;
        self.items
            .get_mut(&id)
            .ok_or_else(|| MockError::not_found(kind, id))
    }

    pub(crate) fn remove(&mut self, id: u64) -> MockResult<T> {
        self.items
            .remove(&id)
            .ok_or_else(|| MockError::not_found(self.kind, id))
    }

    /// Records in id order.
    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}
