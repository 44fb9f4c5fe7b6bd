//! Local store - typed guest collections over the device key-value store
//!
//! Collections are stored whole as JSON arrays. Reads never fail: a storage
//! fault or an unparseable document degrades to an empty collection and is
//! logged. Writes report their error so callers can decide how loud to be.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{Keyed, LineIndex, LineItem, WishlistEntry};
use crate::ports::KeyValueStore;

pub const CART_KEY: &str = "cartItems";
pub const WISHLIST_KEY: &str = "wishlistItems";
pub const RECENTLY_VIEWED_KEY: &str = "recentlyViewed";

/// Length cap of the recently-viewed list
pub const MAX_RECENTLY_VIEWED: usize = 20;

/// Attempts made by `update_*` before giving up on a contended key
pub const MAX_UPDATE_ATTEMPTS: usize = 5;

/// A collection read together with the version it was read at
///
/// `version` is `None` when the read itself failed; storing such a snapshot
/// overwrites unconditionally.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub version: Option<u64>,
}

/// Guest cart, guest wishlist and recently-viewed list on the device
#[derive(Clone)]
pub struct LocalStore {
    store: Arc<dyn KeyValueStore>,
}

impl LocalStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The underlying key-value store
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    // === Cart ===

    pub fn get_cart(&self) -> Vec<LineItem> {
        self.load_cart().items
    }

    /// Replace the whole cart without a version check
    pub fn set_cart(&self, items: &[LineItem]) -> Result<()> {
        self.write(CART_KEY, items, None).map(|_| ())
    }

    pub fn load_cart(&self) -> Snapshot<LineItem> {
        self.read(CART_KEY)
    }

    /// Replace the cart if it is still at `version`
    pub fn store_cart(&self, items: &[LineItem], version: Option<u64>) -> Result<u64> {
        self.write(CART_KEY, items, version)
    }

    /// Read-modify-write of the cart, retried when another writer wins
    pub fn update_cart<R>(&self, f: impl FnMut(&mut LineIndex<LineItem>) -> R) -> Result<R> {
        self.update(CART_KEY, f)
    }

    // === Wishlist ===

    pub fn get_wishlist(&self) -> Vec<WishlistEntry> {
        self.load_wishlist().items
    }

    /// Replace the whole wishlist without a version check
    pub fn set_wishlist(&self, entries: &[WishlistEntry]) -> Result<()> {
        self.write(WISHLIST_KEY, entries, None).map(|_| ())
    }

    pub fn load_wishlist(&self) -> Snapshot<WishlistEntry> {
        self.read(WISHLIST_KEY)
    }

    /// Replace the wishlist if it is still at `version`
    pub fn store_wishlist(&self, entries: &[WishlistEntry], version: Option<u64>) -> Result<u64> {
        self.write(WISHLIST_KEY, entries, version)
    }

    /// Read-modify-write of the wishlist, retried when another writer wins
    pub fn update_wishlist<R>(
        &self,
        f: impl FnMut(&mut LineIndex<WishlistEntry>) -> R,
    ) -> Result<R> {
        self.update(WISHLIST_KEY, f)
    }

    // === Recently viewed ===

    /// Product ids, most recent first
    pub fn recently_viewed(&self) -> Vec<String> {
        self.read::<String>(RECENTLY_VIEWED_KEY).items
    }

    /// Move `product_id` to the head of the recently-viewed list
    pub fn record_view(&self, product_id: &str) -> Result<Vec<String>> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Err(Error::validation("product id cannot be empty"));
        }

        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let snapshot = self.read::<String>(RECENTLY_VIEWED_KEY);
            let mut ids = snapshot.items;
            ids.retain(|id| id != product_id);
            ids.insert(0, product_id.to_string());
            ids.truncate(MAX_RECENTLY_VIEWED);

            match self.write(RECENTLY_VIEWED_KEY, &ids, snapshot.version) {
                Ok(_) => return Ok(ids),
                Err(Error::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(Error::Conflict(RECENTLY_VIEWED_KEY.to_string()))
    }

    // === Internals ===

    fn read<T: DeserializeOwned>(&self, key: &str) -> Snapshot<T> {
        match self.store.get(key) {
            Ok(None) => Snapshot {
                items: Vec::new(),
                version: Some(0),
            },
            Ok(Some(stored)) => match serde_json::from_str::<Vec<T>>(&stored.value) {
                Ok(items) => Snapshot {
                    items,
                    version: Some(stored.version),
                },
                Err(e) => {
                    log::warn!("Discarding unreadable '{}' collection: {}", key, e);
                    Snapshot {
                        items: Vec::new(),
                        version: Some(stored.version),
                    }
                }
            },
            Err(e) => {
                log::warn!("Failed to read '{}', using an empty collection: {}", key, e);
                Snapshot {
                    items: Vec::new(),
                    version: None,
                }
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, items: &[T], version: Option<u64>) -> Result<u64> {
        let json = serde_json::to_string(items)?;
        self.store.set(key, &json, version)
    }

    fn update<T, R>(&self, key: &str, mut f: impl FnMut(&mut LineIndex<T>) -> R) -> Result<R>
    where
        T: Keyed + Serialize + DeserializeOwned,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let snapshot = self.read::<T>(key);
            let mut lines = LineIndex::from_vec(snapshot.items);
            let result = f(&mut lines);

            match self.write(key, lines.as_slice(), snapshot.version) {
                Ok(_) => return Ok(result),
                Err(Error::Conflict(_)) => {
                    log::debug!("Write conflict on '{}' (attempt {}), retrying", key, attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::Conflict(key.to_string()))
    }
}
