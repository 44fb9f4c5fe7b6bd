//! Wishlist domain model

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use super::line_item::{Keyed, LineItem, LineKey};

/// Prefix carried by identifiers minted on the device
pub const GUEST_ID_PREFIX: &str = "guest-";

/// Last timestamp handed out, so two ids minted in the same millisecond differ
static LAST_GUEST_STAMP: AtomicI64 = AtomicI64::new(0);

fn next_guest_stamp() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_GUEST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_GUEST_STAMP.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

/// Identifier of a wishlist entry
///
/// Serialized as the `guest-<millis>` string for device entries and as a
/// number for server entries. Numeric strings are accepted as server ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WishlistId {
    Local(String),
    Remote(u64),
}

impl WishlistId {
    /// Mint a fresh `guest-<timestamp>` id
    pub fn new_local() -> Self {
        WishlistId::Local(format!("{}{}", GUEST_ID_PREFIX, next_guest_stamp()))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, WishlistId::Local(_))
    }

    pub fn remote_id(&self) -> Option<u64> {
        match self {
            WishlistId::Remote(id) => Some(*id),
            WishlistId::Local(_) => None,
        }
    }

    /// Parse the stored representation of an id
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.starts_with(GUEST_ID_PREFIX) {
            Some(WishlistId::Local(raw.to_string()))
        } else {
            raw.parse::<u64>().ok().map(WishlistId::Remote)
        }
    }
}

impl fmt::Display for WishlistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WishlistId::Local(id) => write!(f, "{}", id),
            WishlistId::Remote(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for WishlistId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WishlistId::Local(id) => serializer.serialize_str(id),
            WishlistId::Remote(id) => serializer.serialize_u64(*id),
        }
    }
}

impl<'de> Deserialize<'de> for WishlistId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        let value: JsonValue = Deserialize::deserialize(deserializer)?;
        match value {
            JsonValue::Number(n) => n
                .as_u64()
                .map(WishlistId::Remote)
                .ok_or_else(|| D::Error::custom(format!("invalid wishlist id: {}", n))),
            JsonValue::String(s) => WishlistId::parse(&s)
                .ok_or_else(|| D::Error::custom(format!("invalid wishlist id: {}", s))),
            _ => Err(D::Error::custom("expected number or string for wishlist id")),
        }
    }
}

/// One wishlist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    #[serde(rename = "wishlistId")]
    pub id: WishlistId,
    #[serde(flatten)]
    pub item: LineItem,
}

impl WishlistEntry {
    /// Create a device-held entry with a freshly minted guest id
    pub fn local(item: LineItem) -> Self {
        Self {
            id: WishlistId::new_local(),
            item,
        }
    }

    pub fn remote(id: u64, item: LineItem) -> Self {
        Self {
            id: WishlistId::Remote(id),
            item,
        }
    }
}

impl Keyed for WishlistEntry {
    fn key(&self) -> LineKey {
        self.item.key()
    }
}
