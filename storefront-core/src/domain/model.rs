//! Snapshot of the cart state published to UI callers

use std::collections::BTreeSet;

use serde::Serialize;

use super::line_item::{CartLine, CartLineId, Keyed, LineKey};
use super::total::OrderTotal;
use super::wishlist::WishlistEntry;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartModel {
    /// `None` while browsing as a guest
    pub user_id: Option<String>,
    pub cart: Vec<CartLine>,
    pub wishlist: Vec<WishlistEntry>,
    pub selection: BTreeSet<CartLineId>,
    pub total: OrderTotal,
}

impl CartModel {
    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn line(&self, id: &CartLineId) -> Option<&CartLine> {
        self.cart.iter().find(|l| &l.id == id)
    }

    pub fn is_favorited(&self, key: &LineKey) -> bool {
        self.wishlist.iter().any(|e| &e.key() == key)
    }
}
