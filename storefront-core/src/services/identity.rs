//! Identity resolver - decides whether the current session is a guest

use std::sync::Arc;

use crate::domain::result::Result;
use crate::domain::{Identity, UserSession};
use crate::ports::KeyValueStore;

/// Storage key of the persisted session record
pub const SESSION_KEY: &str = "userSession";

pub struct IdentityResolver {
    store: Arc<dyn KeyValueStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Resolve the current identity from the stored session record
    ///
    /// Never fails. A missing, unreadable or incomplete record means `Guest`.
    pub fn resolve(&self) -> Identity {
        let stored = match self.store.get(SESSION_KEY) {
            Ok(Some(stored)) => stored,
            Ok(None) => return Identity::Guest,
            Err(e) => {
                log::warn!("Failed to read session, continuing as guest: {}", e);
                return Identity::Guest;
            }
        };

        match serde_json::from_str::<UserSession>(&stored.value) {
            Ok(session) if !session.user_id.trim().is_empty() => Identity::Authenticated(session),
            Ok(_) => {
                log::warn!("Stored session has no user id, continuing as guest");
                Identity::Guest
            }
            Err(e) => {
                log::warn!("Stored session is unreadable, continuing as guest: {}", e);
                Identity::Guest
            }
        }
    }

    /// Persist the session record
    pub fn sign_in(&self, session: &UserSession) -> Result<()> {
        let json = serde_json::to_string(session)?;
        self.store.set(SESSION_KEY, &json, None)?;
        Ok(())
    }

    /// Remove the session record; failures are logged, not returned
    pub fn sign_out(&self) {
        if let Err(e) = self.store.remove(SESSION_KEY) {
            log::warn!("Failed to remove session record: {}", e);
        }
    }
}
