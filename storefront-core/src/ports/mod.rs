//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The engine
//! depends only on these traits, not on concrete implementations.

mod key_value;
mod remote;

pub use key_value::{KeyValueStore, Versioned};
pub use remote::RemoteStore;
