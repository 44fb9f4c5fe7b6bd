//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the KeyValueStore port (device storage)
//! - In-memory map for the KeyValueStore port (tests, ephemeral sessions)
//! - Storefront REST client for the RemoteStore port

pub mod duckdb;
pub mod memory;
pub mod rest;

#[cfg(test)]
pub mod mock_server;
