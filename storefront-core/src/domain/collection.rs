//! Ordered line collection indexed by dedup key

use std::collections::HashMap;

use super::line_item::{Keyed, LineKey};

/// Lines in display order with an index from `LineKey` to position
///
/// If the source data holds the same key twice, the first occurrence wins
/// and later ones are dropped.
#[derive(Debug, Clone)]
pub struct LineIndex<T> {
    items: Vec<T>,
    index: HashMap<LineKey, usize>,
}

impl<T: Keyed> LineIndex<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        let mut collection = Self::new();
        for item in items {
            collection.push(item);
        }
        collection
    }

    fn reindex(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.key(), i))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &LineKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &LineKey) -> Option<&T> {
        self.index.get(key).and_then(|&i| self.items.get(i))
    }

    /// Mutable access; the caller must not change the item's key
    pub fn get_mut(&mut self, key: &LineKey) -> Option<&mut T> {
        match self.index.get(key) {
            Some(&i) => self.items.get_mut(i),
            None => None,
        }
    }

    /// Insert at the head. Returns false if the key is already present.
    pub fn insert_front(&mut self, item: T) -> bool {
        if self.contains(&item.key()) {
            return false;
        }
        self.items.insert(0, item);
        self.reindex();
        true
    }

    /// Append at the tail. Returns false if the key is already present.
    pub fn push(&mut self, item: T) -> bool {
        let key = item.key();
        if self.contains(&key) {
            return false;
        }
        self.index.insert(key, self.items.len());
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, key: &LineKey) -> Option<T> {
        let position = self.index.remove(key)?;
        let removed = self.items.remove(position);
        self.reindex();
        Some(removed)
    }

    /// Keep only items matching the predicate
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.items.retain(|item| keep(item));
        self.reindex();
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Keyed> Default for LineIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}
