//! Device key-value storage port

use crate::domain::result::Result;

/// A stored value together with its write version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: String,
    /// Starts at 1 on first write and increases on every write and removal
    pub version: u64,
}

/// Key-value persistence on the device
///
/// Values are JSON documents stored whole under fixed keys. Every write
/// replaces the previous value.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<Versioned>>;

    /// Write `value` under `key`, returning the new version
    ///
    /// With `expected_version = Some(v)` the write only succeeds if the stored
    /// version is still `v` (0 meaning "absent"); otherwise it fails with
    /// `Error::Conflict`. `None` overwrites unconditionally.
    ///
    /// Versions never decrease for a key, even across `remove`, so a version
    /// read before a delete and re-create can never match again.
    fn set(&self, key: &str, value: &str, expected_version: Option<u64>) -> Result<u64>;

    /// Delete the value under `key`, advancing its version
    ///
    /// Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
