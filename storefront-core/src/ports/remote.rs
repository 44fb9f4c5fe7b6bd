//! Remote cart and wishlist port

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::result::Result;
use crate::domain::{CartLine, LineItem, UserSession, WishlistEntry};

/// Per-user cart and wishlist resources on the storefront server
///
/// Every call is a single round trip. Implementations do not retry; a failed
/// call surfaces as `Error::Network`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    // === Cart ===

    /// List the user's cart lines
    async fn list_cart(&self, session: &UserSession) -> Result<Vec<CartLine>>;

    /// Create a cart line carrying product, variant, quantity and price
    async fn add_cart_item(&self, session: &UserSession, item: &LineItem) -> Result<CartLine>;

    /// Patch a cart line's quantity, re-stating its unit price
    async fn update_cart_item(
        &self,
        session: &UserSession,
        cart_item_id: u64,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<CartLine>;

    /// Delete a cart line
    async fn delete_cart_item(&self, session: &UserSession, cart_item_id: u64) -> Result<()>;

    // === Wishlist ===

    /// List the user's wishlist entries
    async fn list_wishlist(&self, session: &UserSession) -> Result<Vec<WishlistEntry>>;

    /// Create a wishlist entry; the server assigns its id
    async fn add_wishlist_item(&self, session: &UserSession, item: &LineItem)
        -> Result<WishlistEntry>;

    /// Delete a wishlist entry by its server id
    async fn delete_wishlist_item(&self, session: &UserSession, wishlist_id: u64) -> Result<()>;
}
