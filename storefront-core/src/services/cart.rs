//! Cart service - reconciles the cart and wishlist across guest and account
//!
//! Guests keep their cart and wishlist on the device. Signed-in users work
//! against the server, which is authoritative; the device store is never
//! written for them. Every change is published as a new [`CartModel`] on a
//! watch channel.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::domain::result::{Error, Rejection, Result};
use crate::domain::total::active_lines;
use crate::domain::{
    CartLine, CartLineId, CartModel, CheckoutSummary, Identity, Keyed, LineIndex, LineItem,
    LineKey, OrderTotal, PriceSnapshot, ProductRef, UserSession, WishlistEntry,
};
use crate::ports::{KeyValueStore, RemoteStore};
use crate::services::logging::{LogEvent, LoggingService};
use crate::services::migration::{MigrationReport, MigrationService, PartialFailurePolicy};
use crate::services::{IdentityResolver, LocalStore, SelectionTracker};

/// Quantity cap applied by the increment action
pub const DEFAULT_MAX_QUANTITY: u32 = 10;

/// Tunables for [`CartService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartOptions {
    pub max_quantity: u32,
    pub on_partial_failure: PartialFailurePolicy,
}

impl Default for CartOptions {
    fn default() -> Self {
        Self {
            max_quantity: DEFAULT_MAX_QUANTITY,
            on_partial_failure: PartialFailurePolicy::default(),
        }
    }
}

/// Result of toggling a product on the wishlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "entry", rename_all = "camelCase")]
pub enum WishlistToggle {
    Added(WishlistEntry),
    Removed,
}

/// Result of signing in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginReport {
    pub user_id: String,
    /// Present when the sign-in ended a guest session
    pub migration: Option<MigrationReport>,
    /// False when the server view could not be loaded after sign-in
    pub synced: bool,
}

fn clamp_quantity(quantity: i64) -> u32 {
    quantity.clamp(1, i64::from(u32::MAX)) as u32
}

/// The reconciliation engine
///
/// Operations take `&mut self`, so a single engine never interleaves its own
/// mutations. Separate engines sharing one device store are kept consistent
/// by the store's versioned writes.
pub struct CartService {
    identity: Identity,
    resolver: IdentityResolver,
    local: LocalStore,
    remote: Arc<dyn RemoteStore>,
    migration: MigrationService,
    selection: SelectionTracker,
    cart: Vec<CartLine>,
    wishlist: Vec<WishlistEntry>,
    options: CartOptions,
    logger: Option<Arc<LoggingService>>,
    model_tx: watch::Sender<CartModel>,
}

impl CartService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteStore>,
        options: CartOptions,
    ) -> Self {
        let local = LocalStore::new(store.clone());
        let migration =
            MigrationService::new(local.clone(), remote.clone(), options.on_partial_failure);
        let (model_tx, _) = watch::channel(CartModel::default());

        Self {
            identity: Identity::Guest,
            resolver: IdentityResolver::new(store),
            local,
            remote,
            migration,
            selection: SelectionTracker::new(),
            cart: Vec::new(),
            wishlist: Vec::new(),
            options,
            logger: None,
            model_tx,
        }
    }

    /// Record engine events in `logger`
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn options(&self) -> &CartOptions {
        &self.options
    }

    pub fn local_store(&self) -> &LocalStore {
        &self.local
    }

    /// Receive every model the engine publishes
    pub fn subscribe(&self) -> watch::Receiver<CartModel> {
        self.model_tx.subscribe()
    }

    /// The current model
    pub fn model(&self) -> CartModel {
        self.model_tx.borrow().clone()
    }

    // === Loading ===

    /// Resolve the identity and read the authoritative collections
    pub async fn load(&mut self) -> Result<CartModel> {
        self.identity = self.resolver.resolve();
        log::debug!("Loading cart as {}", self.identity.kind());
        self.refresh().await
    }

    /// Re-read the authoritative collections and replace the model
    ///
    /// On a network error the previous model is kept.
    pub async fn refresh(&mut self) -> Result<CartModel> {
        match self.session() {
            Some(session) => {
                let cart = self
                    .remote
                    .list_cart(&session)
                    .await
                    .map_err(|e| self.remote_failed("refresh", e))?;
                let wishlist = self
                    .remote
                    .list_wishlist(&session)
                    .await
                    .map_err(|e| self.remote_failed("refresh", e))?;
                self.cart = cart;
                self.wishlist = wishlist;
            }
            None => {
                self.cart = self.guest_cart_lines(self.local.get_cart());
                self.wishlist = LineIndex::from_vec(self.local.get_wishlist()).into_vec();
            }
        }

        Ok(self.publish())
    }

    // === Cart ===

    /// Add one unit of `product` at `price`
    ///
    /// A line with the same product and variant is incremented instead of
    /// duplicated. Signed-in users' lines are re-priced to `price`.
    pub async fn add_to_cart(
        &mut self,
        product: &ProductRef,
        price: &PriceSnapshot,
    ) -> Result<CartLine> {
        let key = product.key();
        let new_item = LineItem::from_product(product, price, 1);

        let line = match self.session() {
            Some(session) => {
                let mut lines = self
                    .remote
                    .list_cart(&session)
                    .await
                    .map_err(|e| self.remote_failed("add_to_cart", e))?;

                match lines.iter().position(|l| l.key() == key) {
                    Some(pos) => {
                        let existing = &lines[pos];
                        let server_id = existing.id.server_id().ok_or_else(|| {
                            Error::validation("server cart line without a server id")
                        })?;
                        let quantity = existing.item.quantity.saturating_add(1);
                        let updated = self
                            .remote
                            .update_cart_item(&session, server_id, quantity, price.unit_price)
                            .await
                            .map_err(|e| self.remote_failed("add_to_cart", e))?;
                        lines[pos] = updated.clone();
                        self.cart = lines;
                        updated
                    }
                    None => {
                        let created = self
                            .remote
                            .add_cart_item(&session, &new_item)
                            .await
                            .map_err(|e| self.remote_failed("add_to_cart", e))?;
                        lines.insert(0, created.clone());
                        self.cart = lines;
                        created
                    }
                }
            }
            None => {
                let item = self.mutate_guest_cart(|lines| {
                    if let Some(existing) = lines.get_mut(&key) {
                        existing.quantity = existing.quantity.saturating_add(1);
                        existing.clone()
                    } else {
                        lines.insert_front(new_item.clone());
                        new_item.clone()
                    }
                });
                CartLine::guest(item)
            }
        };

        self.record("cart_item_added", "add_to_cart");
        self.publish();
        Ok(line)
    }

    /// Delete a cart line
    pub async fn remove_from_cart(&mut self, line_id: &CartLineId) -> Result<()> {
        match (self.session(), line_id) {
            (Some(session), CartLineId::Server(id)) => {
                self.remote
                    .delete_cart_item(&session, *id)
                    .await
                    .map_err(|e| self.remote_failed("remove_from_cart", e))?;
                self.cart.retain(|l| &l.id != line_id);
            }
            (None, CartLineId::Guest(key)) => {
                self.mutate_guest_cart(|lines| lines.remove(key).is_some());
            }
            _ => return Err(Error::not_found(format!("cart line {}", line_id))),
        }

        self.record("cart_item_removed", "remove_from_cart");
        self.publish();
        Ok(())
    }

    /// Set a line's quantity; anything below 1 is stored as 1
    pub async fn update_quantity(
        &mut self,
        line_id: &CartLineId,
        new_quantity: i64,
    ) -> Result<CartLine> {
        let quantity = clamp_quantity(new_quantity);
        let current = self
            .find_line(line_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("cart line {}", line_id)))?;

        let updated = match (self.session(), line_id) {
            (Some(session), CartLineId::Server(id)) => {
                let updated = self
                    .remote
                    .update_cart_item(&session, *id, quantity, current.item.unit_price)
                    .await
                    .map_err(|e| self.remote_failed("update_quantity", e))?;
                if let Some(line) = self.cart.iter_mut().find(|l| &l.id == line_id) {
                    *line = updated.clone();
                }
                updated
            }
            (None, CartLineId::Guest(key)) => {
                let item = self.mutate_guest_cart(|lines| {
                    lines.get_mut(key).map(|item| {
                        item.quantity = quantity;
                        item.clone()
                    })
                });
                match item {
                    Some(item) => CartLine::guest(item),
                    None => {
                        self.publish();
                        return Err(Error::not_found(format!("cart line {}", line_id)));
                    }
                }
            }
            _ => return Err(Error::not_found(format!("cart line {}", line_id))),
        };

        self.record("cart_quantity_updated", "update_quantity");
        self.publish();
        Ok(updated)
    }

    /// Add one unit, stopping at the configured cap
    pub async fn increment_quantity(&mut self, line_id: &CartLineId) -> Result<CartLine> {
        let current = self
            .find_line(line_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("cart line {}", line_id)))?;

        if current.item.quantity >= self.options.max_quantity {
            return Ok(current);
        }
        self.update_quantity(line_id, i64::from(current.item.quantity) + 1)
            .await
    }

    /// Remove one unit, stopping at 1
    pub async fn decrement_quantity(&mut self, line_id: &CartLineId) -> Result<CartLine> {
        let current = self
            .find_line(line_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("cart line {}", line_id)))?;

        if current.item.quantity <= 1 {
            return Ok(current);
        }
        self.update_quantity(line_id, i64::from(current.item.quantity) - 1)
            .await
    }

    /// Move a cart line to the end of the wishlist
    ///
    /// Rejected with `DuplicateWishlistEntry`, changing nothing, when the
    /// wishlist already holds the same product and variant. For signed-in
    /// users the wishlist create and the cart delete are separate calls; if
    /// the delete fails the item stays in both until the next refresh.
    pub async fn move_to_wishlist(&mut self, line_id: &CartLineId) -> Result<WishlistEntry> {
        let line = self
            .find_line(line_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("cart line {}", line_id)))?;
        let key = line.key();

        if self.is_favorited(&key) {
            return Err(Rejection::DuplicateWishlistEntry.into());
        }

        let entry = match (self.session(), line_id) {
            (Some(session), CartLineId::Server(id)) => {
                let entry = self
                    .remote
                    .add_wishlist_item(&session, &line.item)
                    .await
                    .map_err(|e| self.remote_failed("move_to_wishlist", e))?;
                self.wishlist.push(entry.clone());

                if let Err(e) = self.remote.delete_cart_item(&session, *id).await {
                    let e = self.remote_failed("move_to_wishlist", e);
                    self.publish();
                    return Err(e);
                }
                self.cart.retain(|l| &l.id != line_id);
                entry
            }
            (None, CartLineId::Guest(_)) => {
                let candidate = WishlistEntry::local(line.item.clone());
                let added = self.mutate_guest_wishlist(|entries| {
                    if entries.contains(&key) {
                        None
                    } else {
                        entries.push(candidate.clone());
                        Some(candidate.clone())
                    }
                });
                let entry = match added {
                    Some(entry) => entry,
                    None => {
                        self.publish();
                        return Err(Rejection::DuplicateWishlistEntry.into());
                    }
                };
                self.mutate_guest_cart(|lines| lines.remove(&key).is_some());
                entry
            }
            _ => return Err(Error::not_found(format!("cart line {}", line_id))),
        };

        self.record("moved_to_wishlist", "move_to_wishlist");
        self.publish();
        Ok(entry)
    }

    // === Wishlist ===

    /// Append `product` to the wishlist, or remove it if already there
    pub async fn toggle_wishlist(
        &mut self,
        product: &ProductRef,
        price: &PriceSnapshot,
    ) -> Result<WishlistToggle> {
        let key = product.key();
        let item = LineItem::from_product(product, price, 1);

        let toggled = match self.session() {
            Some(session) => {
                if self.is_favorited(&key) {
                    self.remove_remote_favorite(&session, &key).await?;
                    WishlistToggle::Removed
                } else {
                    let entry = self
                        .remote
                        .add_wishlist_item(&session, &item)
                        .await
                        .map_err(|e| self.remote_failed("toggle_wishlist", e))?;
                    self.wishlist.push(entry.clone());
                    WishlistToggle::Added(entry)
                }
            }
            None => self.mutate_guest_wishlist(|entries| {
                if entries.remove(&key).is_some() {
                    WishlistToggle::Removed
                } else {
                    let entry = WishlistEntry::local(item.clone());
                    entries.push(entry.clone());
                    WishlistToggle::Added(entry)
                }
            }),
        };

        self.record("wishlist_toggled", "toggle_wishlist");
        self.publish();
        Ok(toggled)
    }

    async fn remove_remote_favorite(&mut self, session: &UserSession, key: &LineKey) -> Result<()> {
        let mut remote_id = self
            .wishlist
            .iter()
            .find(|e| &e.key() == key)
            .and_then(|e| e.id.remote_id());

        if remote_id.is_none() {
            // No server id in the model yet: look the entry up on the server
            let listed = self
                .remote
                .list_wishlist(session)
                .await
                .map_err(|e| self.remote_failed("toggle_wishlist", e))?;
            remote_id = listed
                .iter()
                .find(|e| &e.key() == key)
                .and_then(|e| e.id.remote_id());
            self.wishlist = listed;
        }

        if let Some(id) = remote_id {
            self.remote
                .delete_wishlist_item(session, id)
                .await
                .map_err(|e| self.remote_failed("toggle_wishlist", e))?;
        }
        self.wishlist.retain(|e| &e.key() != key);
        Ok(())
    }

    pub fn is_favorited(&self, key: &LineKey) -> bool {
        self.wishlist.iter().any(|e| &e.key() == key)
    }

    // === Selection & totals ===

    /// Flip a line in or out of the checkout selection
    pub fn toggle_selection(&mut self, line_id: &CartLineId) -> Result<bool> {
        if self.find_line(line_id).is_none() {
            return Err(Error::not_found(format!("cart line {}", line_id)));
        }
        let selected = self.selection.toggle(line_id.clone());
        self.publish();
        Ok(selected)
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(self.cart.iter().map(|l| &l.id));
        self.publish();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.publish();
    }

    /// Total over the selection, or over the whole cart when nothing is selected
    pub fn total(&self) -> OrderTotal {
        OrderTotal::compute(&self.cart, self.selection.selected())
    }

    /// Lines and total to hand to checkout
    pub fn prepare_checkout(&self) -> Result<CheckoutSummary> {
        if !self.identity.is_authenticated() {
            return Err(Rejection::NotAuthenticated.into());
        }

        let lines: Vec<CartLine> = active_lines(&self.cart, self.selection.selected())
            .into_iter()
            .cloned()
            .collect();
        if lines.is_empty() {
            return Err(Rejection::EmptyCheckout.into());
        }

        Ok(CheckoutSummary {
            lines,
            total: self.total(),
        })
    }

    // === Identity ===

    /// Sign in, migrating guest data when this ends a guest session
    pub async fn login(&mut self, session: UserSession) -> Result<LoginReport> {
        if session.user_id.trim().is_empty() {
            return Err(Error::validation("user id cannot be empty"));
        }

        let was_guest = !self.identity.is_authenticated();
        if let Err(e) = self.resolver.sign_in(&session) {
            log::warn!("Failed to persist session: {}", e);
        }
        self.identity = Identity::Authenticated(session.clone());
        self.selection.clear();

        let migration = if was_guest {
            let report = self.migration.migrate(&session).await;
            self.record_migration(&report);
            Some(report)
        } else {
            None
        };

        self.record("login", "login");

        let synced = match self.refresh().await {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Signed in but could not load the account cart: {}", e);
                self.publish();
                false
            }
        };

        Ok(LoginReport {
            user_id: session.user_id,
            migration,
            synced,
        })
    }

    /// Sign out and return to the guest view
    ///
    /// Wishlist entries that came from the server are dropped from the device.
    pub async fn logout(&mut self) -> Result<CartModel> {
        self.resolver.sign_out();
        self.identity = Identity::Guest;
        self.selection.clear();

        if let Err(e) = self
            .local
            .update_wishlist(|entries| entries.retain(|e| e.id.is_local()))
        {
            log::warn!("Failed to prune device wishlist on logout: {}", e);
        }

        self.record("logout", "logout");
        self.refresh().await
    }

    // === Recently viewed ===

    /// Move `product_id` to the head of the recently-viewed list
    pub fn record_product_view(&self, product_id: &str) -> Result<Vec<String>> {
        match self.local.record_view(product_id) {
            Ok(ids) => Ok(ids),
            Err(e @ Error::Validation(_)) => Err(e),
            Err(e) => {
                log::warn!("Failed to record product view: {}", e);
                Ok(self.local.recently_viewed())
            }
        }
    }

    pub fn recently_viewed(&self) -> Vec<String> {
        self.local.recently_viewed()
    }

    // === Internals ===

    fn session(&self) -> Option<UserSession> {
        self.identity.session().cloned()
    }

    fn find_line(&self, line_id: &CartLineId) -> Option<&CartLine> {
        self.cart.iter().find(|l| &l.id == line_id)
    }

    fn guest_cart_lines(&self, items: Vec<LineItem>) -> Vec<CartLine> {
        LineIndex::from_vec(items)
            .into_vec()
            .into_iter()
            .map(CartLine::guest)
            .collect()
    }

    fn guest_items(&self) -> Vec<LineItem> {
        self.cart.iter().map(|l| l.item.clone()).collect()
    }

    /// Apply `f` to the stored guest cart and mirror the result in the model
    ///
    /// If the device store cannot be written, `f` is applied to the in-memory
    /// cart so the user's action is still visible.
    fn mutate_guest_cart<R>(&mut self, mut f: impl FnMut(&mut LineIndex<LineItem>) -> R) -> R {
        let stored = self.local.update_cart(|lines| {
            let result = f(lines);
            (result, lines.as_slice().to_vec())
        });

        let (result, items) = match stored {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Failed to write guest cart, keeping change in memory: {}", e);
                let mut lines = LineIndex::from_vec(self.guest_items());
                let result = f(&mut lines);
                (result, lines.into_vec())
            }
        };

        self.cart = items.into_iter().map(CartLine::guest).collect();
        result
    }

    /// Apply `f` to the stored guest wishlist and mirror the result in the model
    fn mutate_guest_wishlist<R>(
        &mut self,
        mut f: impl FnMut(&mut LineIndex<WishlistEntry>) -> R,
    ) -> R {
        let stored = self.local.update_wishlist(|entries| {
            let result = f(entries);
            (result, entries.as_slice().to_vec())
        });

        let (result, entries) = match stored {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!(
                    "Failed to write guest wishlist, keeping change in memory: {}",
                    e
                );
                let mut entries = LineIndex::from_vec(self.wishlist.clone());
                let result = f(&mut entries);
                (result, entries.into_vec())
            }
        };

        self.wishlist = entries;
        result
    }

    /// Prune the selection, rebuild the model and send it to subscribers
    fn publish(&mut self) -> CartModel {
        self.selection.prune(self.cart.iter().map(|l| &l.id));

        let model = CartModel {
            user_id: self.identity.user_id().map(str::to_string),
            cart: self.cart.clone(),
            wishlist: self.wishlist.clone(),
            selection: self.selection.selected().clone(),
            total: self.total(),
        };
        self.model_tx.send_replace(model.clone());
        model
    }

    fn record(&self, event: &str, operation: &str) {
        if let Some(logger) = &self.logger {
            let entry = LogEvent::new(event)
                .with_identity(self.identity.kind())
                .with_operation(operation);
            if let Err(e) = logger.log(entry) {
                log::debug!("Failed to record '{}' event: {}", event, e);
            }
        }
    }

    fn record_migration(&self, report: &MigrationReport) {
        let Some(logger) = &self.logger else {
            return;
        };

        let entry = if report.is_complete() {
            LogEvent::new("migration_completed")
        } else {
            LogEvent::new("migration_partial_failure").with_error(format!(
                "{} cart lines and {} wishlist entries failed",
                report.cart_failed, report.wishlist_failed
            ))
        };
        if let Err(e) = logger.log(entry.with_identity("user").with_operation("login")) {
            log::debug!("Failed to record migration event: {}", e);
        }
    }

    /// Log a failed server call and hand the error back
    fn remote_failed(&self, operation: &str, error: Error) -> Error {
        log::warn!("{} failed: {}", operation, error);
        if let Some(logger) = &self.logger {
            let entry = LogEvent::new("network_error")
                .with_identity(self.identity.kind())
                .with_operation(operation)
                .with_error(error.to_string());
            if let Err(e) = logger.log(entry) {
                log::debug!("Failed to record network error: {}", e);
            }
        }
        error
    }
}
