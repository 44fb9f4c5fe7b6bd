//! Guest to account migration
//!
//! Runs once when a guest signs in. The guest cart is sent to the server
//! first, then the guest wishlist. The two collections are not migrated
//! atomically and nothing is retried.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{Keyed, LineKey, UserSession, WishlistId};
use crate::ports::RemoteStore;
use crate::services::LocalStore;

/// What happens to guest data whose server create failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialFailurePolicy {
    /// Keep failed lines on the device so the next sign-in offers them again
    #[default]
    Retain,
    /// Drop all guest lines whether or not they reached the server
    Discard,
}

impl fmt::Display for PartialFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialFailurePolicy::Retain => write!(f, "retain"),
            PartialFailurePolicy::Discard => write!(f, "discard"),
        }
    }
}

impl FromStr for PartialFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "retain" => Ok(PartialFailurePolicy::Retain),
            "discard" => Ok(PartialFailurePolicy::Discard),
            other => Err(Error::Config(format!(
                "Unknown partial failure policy '{}' (expected retain or discard)",
                other
            ))),
        }
    }
}

/// Outcome of one migration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub cart_migrated: usize,
    pub cart_failed: usize,
    pub wishlist_migrated: usize,
    /// Entries that already had a server id and were not sent
    pub wishlist_skipped: usize,
    pub wishlist_failed: usize,
    pub errors: Vec<String>,
}

impl MigrationReport {
    pub fn is_complete(&self) -> bool {
        self.cart_failed == 0 && self.wishlist_failed == 0 && self.errors.is_empty()
    }

    pub fn migrated(&self) -> usize {
        self.cart_migrated + self.wishlist_migrated
    }
}

pub struct MigrationService {
    local: LocalStore,
    remote: Arc<dyn RemoteStore>,
    policy: PartialFailurePolicy,
}

impl MigrationService {
    pub fn new(
        local: LocalStore,
        remote: Arc<dyn RemoteStore>,
        policy: PartialFailurePolicy,
    ) -> Self {
        Self {
            local,
            remote,
            policy,
        }
    }

    pub fn policy(&self) -> PartialFailurePolicy {
        self.policy
    }

    /// Send guest data to the account of `session`
    ///
    /// Partial failures are reported, never returned as errors.
    pub async fn migrate(&self, session: &UserSession) -> MigrationReport {
        let mut report = MigrationReport::default();

        self.migrate_cart(session, &mut report).await;
        self.migrate_wishlist(session, &mut report).await;

        if report.is_complete() {
            log::info!(
                "Migrated {} cart lines and {} wishlist entries",
                report.cart_migrated,
                report.wishlist_migrated
            );
        } else {
            log::warn!(
                "Migration incomplete: {} cart lines and {} wishlist entries failed ({} policy)",
                report.cart_failed,
                report.wishlist_failed,
                self.policy
            );
        }

        report
    }

    async fn migrate_cart(&self, session: &UserSession, report: &mut MigrationReport) {
        let guest_cart = self.local.get_cart();
        let mut migrated: HashSet<LineKey> = HashSet::new();

        for item in &guest_cart {
            match self.remote.add_cart_item(session, item).await {
                Ok(_) => {
                    migrated.insert(item.key());
                    report.cart_migrated += 1;
                }
                Err(e) => {
                    report.cart_failed += 1;
                    report
                        .errors
                        .push(format!("cart line {}: {}", item.key(), e));
                }
            }
        }

        if guest_cart.is_empty() {
            return;
        }

        let policy = self.policy;
        let written = self.local.update_cart(|lines| match policy {
            PartialFailurePolicy::Retain => lines.retain(|l| !migrated.contains(&l.key())),
            PartialFailurePolicy::Discard => lines.retain(|_| false),
        });
        if let Err(e) = written {
            log::warn!("Failed to rewrite guest cart after migration: {}", e);
            report.errors.push(format!("guest cart rewrite: {}", e));
        }
    }

    async fn migrate_wishlist(&self, session: &UserSession, report: &mut MigrationReport) {
        let wishlist = self.local.get_wishlist();
        let mut migrated: HashSet<WishlistId> = HashSet::new();

        for entry in &wishlist {
            if !entry.id.is_local() {
                report.wishlist_skipped += 1;
                continue;
            }

            match self.remote.add_wishlist_item(session, &entry.item).await {
                Ok(_) => {
                    migrated.insert(entry.id.clone());
                    report.wishlist_migrated += 1;
                }
                Err(e) => {
                    report.wishlist_failed += 1;
                    report
                        .errors
                        .push(format!("wishlist entry {}: {}", entry.key(), e));
                }
            }
        }

        if !wishlist.iter().any(|e| e.id.is_local()) {
            return;
        }

        let policy = self.policy;
        let written = self.local.update_wishlist(|entries| match policy {
            PartialFailurePolicy::Retain => entries.retain(|e| !migrated.contains(&e.id)),
            PartialFailurePolicy::Discard => entries.retain(|e| !e.id.is_local()),
        });
        if let Err(e) = written {
            log::warn!("Failed to rewrite guest wishlist after migration: {}", e);
            report.errors.push(format!("guest wishlist rewrite: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "retain".parse::<PartialFailurePolicy>().unwrap(),
            PartialFailurePolicy::Retain
        );
        assert_eq!(
            " Discard ".parse::<PartialFailurePolicy>().unwrap(),
            PartialFailurePolicy::Discard
        );
        assert!("keep".parse::<PartialFailurePolicy>().is_err());
    }

    #[test]
    fn test_policy_serde() {
        let policy: PartialFailurePolicy = serde_json::from_str(r#""discard""#).unwrap();
        assert_eq!(policy, PartialFailurePolicy::Discard);
        assert_eq!(PartialFailurePolicy::default(), PartialFailurePolicy::Retain);
    }

    #[test]
    fn test_report_completeness() {
        let mut report = MigrationReport {
            cart_migrated: 2,
            wishlist_migrated: 1,
            ..Default::default()
        };
        assert!(report.is_complete());
        assert_eq!(report.migrated(), 3);

        report.cart_failed = 1;
        assert!(!report.is_complete());
    }
}
