//! Core domain entities
//!
//! All cart and wishlist entities are defined here. These are pure data
//! structures with their own invariants - no I/O or external dependencies.

pub mod collection;
mod identity;
mod line_item;
mod model;
pub mod result;
pub mod total;
mod wishlist;

pub use collection::LineIndex;
pub use identity::{Identity, UserSession};
pub use line_item::{CartLine, CartLineId, Keyed, LineItem, LineKey, PriceSnapshot, ProductRef};
pub use model::CartModel;
pub use total::{CheckoutSummary, OrderTotal};
pub use wishlist::{WishlistEntry, WishlistId, GUEST_ID_PREFIX};
