//! In-memory key-value store
//!
//! Used for tests and for `storage.backend = "memory"` (nothing survives the
//! process).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::domain::result::{Error, Result};
use crate::ports::{KeyValueStore, Versioned};

/// A key's last version; `value` is `None` once the key has been removed
#[derive(Debug, Clone)]
struct Slot {
    value: Option<String>,
    version: u64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Slot>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with a storage error
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write and remove fail with a storage error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Slot>>> {
        self.entries
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Versioned>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::storage("simulated read failure"));
        }
        Ok(self.lock()?.get(key).and_then(|slot| {
            slot.value.as_ref().map(|value| Versioned {
                value: value.clone(),
                version: slot.version,
            })
        }))
    }

    fn set(&self, key: &str, value: &str, expected_version: Option<u64>) -> Result<u64> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage("simulated write failure"));
        }

        let mut entries = self.lock()?;
        let last = entries.get(key).map(|slot| slot.version).unwrap_or(0);
        let live = match entries.get(key) {
            Some(Slot { value: Some(_), version }) => *version,
            _ => 0,
        };

        if let Some(expected) = expected_version {
            if expected != live {
                return Err(Error::Conflict(key.to_string()));
            }
        }

        let version = last + 1;
        entries.insert(
            key.to_string(),
            Slot {
                value: Some(value.to_string()),
                version,
            },
        );
        Ok(version)
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage("simulated write failure"));
        }
        if let Some(slot) = self.lock()?.get_mut(key) {
            if slot.value.take().is_some() {
                slot.version += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_increase() {
        let store = MemoryStore::new();
        assert_eq!(store.set("k", "a", None).unwrap(), 1);
        assert_eq!(store.set("k", "b", Some(1)).unwrap(), 2);

        let stored = store.get("k").unwrap().unwrap();
        assert_eq!(stored.value, "b");
        assert_eq!(stored.version, 2);
    }

    #[test]
    fn test_stale_write_conflicts() {
        let store = MemoryStore::new();
        store.set("k", "a", Some(0)).unwrap();

        let result = store.set("k", "b", Some(0));
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert_eq!(store.get("k").unwrap().unwrap().value, "a");
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove("nothing").is_ok());
        assert!(store.get("nothing").unwrap().is_none());
    }

    #[test]
    fn test_version_survives_remove() {
        let store = MemoryStore::new();
        store.set("k", "a", None).unwrap();
        store.set("k", "b", Some(1)).unwrap();
        store.remove("k").unwrap();

        // Re-created key continues from the tombstone
        assert_eq!(store.set("k", "c", Some(0)).unwrap(), 4);
        assert_eq!(store.set("k", "d", Some(4)).unwrap(), 5);

        // A version from before the removal never matches again
        assert!(matches!(store.set("k", "e", Some(2)), Err(Error::Conflict(_))));
        assert_eq!(store.get("k").unwrap().unwrap().value, "d");
    }

    #[test]
    fn test_failure_injection() {
        let store = MemoryStore::new();
        store.set_fail_reads(true);
        assert!(matches!(store.get("k"), Err(Error::Storage(_))));

        store.set_fail_writes(true);
        assert!(matches!(store.set("k", "v", None), Err(Error::Storage(_))));
    }
}
