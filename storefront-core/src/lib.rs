//! Storefront Core - cart and wishlist reconciliation for guests and accounts
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (LineItem, CartLine, WishlistEntry, Identity, etc.)
//! - **ports**: Trait definitions for external dependencies (KeyValueStore, RemoteStore)
//! - **services**: Business logic orchestration (CartService and its collaborators)
//! - **adapters**: Concrete implementations (DuckDB, in-memory, REST)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbStore;
use adapters::memory::MemoryStore;
use adapters::rest::RestClient;
use config::{Config, StorageBackend};
use ports::{KeyValueStore, RemoteStore};
use services::{CartService, LoggingService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, Rejection};
pub use domain::{
    CartLine, CartLineId, CartModel, CheckoutSummary, Identity, LineItem, LineKey, OrderTotal,
    PriceSnapshot, ProductRef, UserSession, WishlistEntry, WishlistId,
};
pub use services::{
    CartOptions, LoginReport, MigrationReport, PartialFailurePolicy, WishlistToggle,
};

/// File name of the device store in the data directory
pub const STORE_FILENAME: &str = "storefront.duckdb";

/// Main context for storefront operations
///
/// Wires the configured device store, the REST client and the event log
/// into one [`CartService`]. Call `cart.load()` before using the engine.
pub struct StorefrontContext {
    pub config: Config,
    pub data_dir: Option<PathBuf>,
    pub store: Arc<dyn KeyValueStore>,
    pub remote: Arc<dyn RemoteStore>,
    pub logger: Option<Arc<LoggingService>>,
    pub cart: CartService,
}

impl StorefrontContext {
    /// Create a context rooted at `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let store: Arc<dyn KeyValueStore> = match config.storage_backend {
            StorageBackend::DuckDb => Arc::new(DuckDbStore::new(&data_dir.join(STORE_FILENAME))?),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };

        let remote: Arc<dyn RemoteStore> = Arc::new(RestClient::new(
            &config.api_base_url,
            config.api_timeout_secs,
            config.api_token.clone(),
        )?);

        // The event log is optional; the engine works without it
        let logger = match LoggingService::new(data_dir, env!("CARGO_PKG_VERSION")) {
            Ok(logger) => Some(Arc::new(logger)),
            Err(e) => {
                log::warn!("Event log unavailable: {}", e);
                None
            }
        };

        let mut context = Self::from_parts(config, store, remote, logger);
        context.data_dir = Some(data_dir.to_path_buf());
        Ok(context)
    }

    /// Assemble a context from already-built parts
    pub fn from_parts(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteStore>,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        let mut cart = CartService::new(store.clone(), remote.clone(), config.cart_options());
        if let Some(logger) = &logger {
            cart = cart.with_logger(logger.clone());
        }

        Self {
            config,
            data_dir: None,
            store,
            remote,
            logger,
            cart,
        }
    }
}
