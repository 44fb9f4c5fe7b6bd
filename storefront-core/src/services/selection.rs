//! Selection tracker - cart lines marked for checkout

use std::collections::BTreeSet;

use crate::domain::CartLineId;

#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    selected: BTreeSet<CartLineId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`; returns true if it is now selected
    pub fn toggle(&mut self, id: CartLineId) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    pub fn selected(&self) -> &BTreeSet<CartLineId> {
        &self.selected
    }

    pub fn is_selected(&self, id: &CartLineId) -> bool {
        self.selected.contains(id)
    }

    /// Drop ids that are not in `valid`
    pub fn prune<'a>(&mut self, valid: impl IntoIterator<Item = &'a CartLineId>) {
        let valid: BTreeSet<&CartLineId> = valid.into_iter().collect();
        self.selected.retain(|id| valid.contains(id));
    }

    pub fn select_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a CartLineId>) {
        self.selected = ids.into_iter().cloned().collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}
