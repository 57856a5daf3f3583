//! In-process item store backend.
//!
//! Id-keyed map plus an insertion-order list, behind a single mutex.
//! Get/update/delete are O(1); list is a full scan in insertion order.
//! Everything is lost on restart.

use super::{apply_patch, materialize, Item, ItemDraft, ItemPatch, ItemStore, StoreError, StoreResult};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct MemoryInner {
    items: HashMap<String, Item>,
    order: Vec<String>,
}

/// Process-local collection backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemStore for MemoryStore {
    fn create(&self, draft: ItemDraft) -> StoreResult<Item> {
        let item = materialize(draft)?;
        let mut inner = self.inner.lock();
        inner.order.push(item.id.clone());
        inner.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    fn list(&self) -> StoreResult<Vec<Item>> {
        let inner = self.inner.lock();
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.items.get(id))
            .cloned()
            .collect())
    }

    fn get(&self, id: &str) -> StoreResult<Item> {
        self.inner
            .lock()
            .items
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn update(&self, id: &str, patch: ItemPatch) -> StoreResult<Item> {
        let mut inner = self.inner.lock();
        let item = inner.items.get_mut(id).ok_or(StoreError::NotFound)?;
        apply_patch(item, patch)?;
        Ok(item.clone())
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.items.remove(id).is_none() {
            return Err(StoreError::NotFound);
        }
        inner.order.retain(|stored| stored.as_str() != id);
        Ok(())
    }
}
