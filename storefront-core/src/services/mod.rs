//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. `CartService` is
//! the entry point for UI callers; the others are its collaborators.

pub mod cart;
mod identity;
mod local_store;
pub mod logging;
pub mod migration;
mod schema;
mod selection;

pub use cart::{CartOptions, CartService, LoginReport, WishlistToggle, DEFAULT_MAX_QUANTITY};
pub use identity::{IdentityResolver, SESSION_KEY};
pub use local_store::{
    LocalStore, Snapshot, CART_KEY, MAX_RECENTLY_VIEWED, MAX_UPDATE_ATTEMPTS, RECENTLY_VIEWED_KEY,
    WISHLIST_KEY,
};
pub use logging::{LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationReport, MigrationService, PartialFailurePolicy};
pub use schema::{SchemaMigrationResult, SchemaMigrationService};
pub use selection::SelectionTracker;
