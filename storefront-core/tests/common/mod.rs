//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use storefront_core::adapters::memory::MemoryStore;
use storefront_core::domain::Keyed;
use storefront_core::ports::RemoteStore;
use storefront_core::services::{CartOptions, CartService};
use storefront_core::{
    CartLine, Error, LineItem, PriceSnapshot, ProductRef, UserSession, WishlistEntry,
};

type Result<T> = std::result::Result<T, Error>;

/// One call received by [`FakeRemote`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListCart,
    AddCart {
        product_id: String,
        variant_id: Option<String>,
        quantity: u32,
        unit_price: Decimal,
    },
    UpdateCart {
        id: u64,
        quantity: u32,
        unit_price: Decimal,
    },
    DeleteCart(u64),
    ListWishlist,
    AddWishlist {
        product_id: String,
        variant_id: Option<String>,
    },
    DeleteWishlist(u64),
}

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListCart,
    AddCart,
    UpdateCart,
    DeleteCart,
    ListWishlist,
    AddWishlist,
    DeleteWishlist,
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    carts: HashMap<String, Vec<CartLine>>,
    wishlists: HashMap<String, Vec<WishlistEntry>>,
    calls: Vec<Call>,
    failing_ops: HashSet<Op>,
    failing_products: HashSet<String>,
}

impl FakeState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, op: Op) -> Result<()> {
        if self.failing_ops.contains(&op) {
            Err(Error::http(503, format!("{:?} unavailable", op)))
        } else {
            Ok(())
        }
    }
}

/// In-process server double with a call log and failure injection
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, op: Op) {
        self.state.lock().unwrap().failing_ops.insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.state.lock().unwrap().failing_ops.remove(&op);
    }

    /// Make every create for `product_id` fail
    pub fn fail_product(&self, product_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_products
            .insert(product_id.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn cart(&self, user_id: &str) -> Vec<CartLine> {
        self.state
            .lock()
            .unwrap()
            .carts
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn wishlist(&self, user_id: &str) -> Vec<WishlistEntry> {
        self.state
            .lock()
            .unwrap()
            .wishlists
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn seed_cart(&self, user_id: &str, item: LineItem) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state
            .carts
            .entry(user_id.to_string())
            .or_default()
            .push(CartLine::server(id, item));
        id
    }

    pub fn seed_wishlist(&self, user_id: &str, item: LineItem) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state
            .wishlists
            .entry(user_id.to_string())
            .or_default()
            .push(WishlistEntry::remote(id, item));
        id
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn list_cart(&self, session: &UserSession) -> Result<Vec<CartLine>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListCart);
        state.check(Op::ListCart)?;
        Ok(state.carts.get(&session.user_id).cloned().unwrap_or_default())
    }

    async fn add_cart_item(&self, session: &UserSession, item: &LineItem) -> Result<CartLine> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AddCart {
            product_id: item.product_id.clone(),
            variant_id: item.variant_id.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        });
        state.check(Op::AddCart)?;
        if state.failing_products.contains(&item.product_id) {
            return Err(Error::http(500, "create failed"));
        }

        let id = state.next_id();
        let line = CartLine::server(id, item.clone());
        state
            .carts
            .entry(session.user_id.clone())
            .or_default()
            .push(line.clone());
        Ok(line)
    }

    async fn update_cart_item(
        &self,
        _session: &UserSession,
        cart_item_id: u64,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<CartLine> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UpdateCart {
            id: cart_item_id,
            quantity,
            unit_price,
        });
        state.check(Op::UpdateCart)?;

        let line = state
            .carts
            .values_mut()
            .flat_map(|lines| lines.iter_mut())
            .find(|l| l.id.server_id() == Some(cart_item_id))
            .ok_or_else(|| Error::http(404, "no such cart item"))?;
        line.item.quantity = quantity;
        line.item.unit_price = unit_price;
        Ok(line.clone())
    }

    async fn delete_cart_item(&self, _session: &UserSession, cart_item_id: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteCart(cart_item_id));
        state.check(Op::DeleteCart)?;
        for lines in state.carts.values_mut() {
            lines.retain(|l| l.id.server_id() != Some(cart_item_id));
        }
        Ok(())
    }

    async fn list_wishlist(&self, session: &UserSession) -> Result<Vec<WishlistEntry>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListWishlist);
        state.check(Op::ListWishlist)?;
        Ok(state
            .wishlists
            .get(&session.user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_wishlist_item(
        &self,
        session: &UserSession,
        item: &LineItem,
    ) -> Result<WishlistEntry> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AddWishlist {
            product_id: item.product_id.clone(),
            variant_id: item.variant_id.clone(),
        });
        state.check(Op::AddWishlist)?;
        if state.failing_products.contains(&item.product_id) {
            return Err(Error::http(500, "create failed"));
        }

        let id = state.next_id();
        let entry = WishlistEntry::remote(id, item.clone());
        state
            .wishlists
            .entry(session.user_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    async fn delete_wishlist_item(&self, _session: &UserSession, wishlist_id: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteWishlist(wishlist_id));
        state.check(Op::DeleteWishlist)?;
        for entries in state.wishlists.values_mut() {
            entries.retain(|e| e.id.remote_id() != Some(wishlist_id));
        }
        Ok(())
    }
}

pub fn price(cents: i64) -> PriceSnapshot {
    PriceSnapshot::new(Decimal::new(cents, 2))
}

pub fn product(id: &str, variant: Option<&str>) -> ProductRef {
    let product = ProductRef::new(id).with_name(format!("Product {}", id));
    match variant {
        Some(v) => product.with_variant(v),
        None => product,
    }
}

pub fn item(id: &str, variant: Option<&str>, quantity: u32, cents: i64) -> LineItem {
    LineItem::from_product(&product(id, variant), &price(cents), quantity)
}

pub fn keys_of<T: Keyed>(items: &[T]) -> Vec<String> {
    items.iter().map(|i| i.key().to_string()).collect()
}

/// A guest engine over a fresh in-memory store
pub async fn guest_engine(remote: Arc<FakeRemote>) -> (Arc<MemoryStore>, CartService) {
    guest_engine_with(remote, CartOptions::default()).await
}

pub async fn guest_engine_with(
    remote: Arc<FakeRemote>,
    options: CartOptions,
) -> (Arc<MemoryStore>, CartService) {
    let store = Arc::new(MemoryStore::new());
    let mut engine = CartService::new(store.clone(), remote, options);
    engine.load().await.unwrap();
    (store, engine)
}

/// A signed-in engine for `user_id`; no guest data to migrate
pub async fn account_engine(remote: Arc<FakeRemote>, user_id: &str) -> CartService {
    let (_, mut engine) = guest_engine(remote).await;
    engine.login(UserSession::new(user_id)).await.unwrap();
    engine
}
