//! Line item domain model

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::Error;

/// Dedup key for cart and wishlist lines
///
/// Two lines are the same line iff both the product and the variant match.
/// A missing variant on both sides counts as a match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKey {
    pub product_id: String,
    pub variant_id: Option<String>,
}

impl LineKey {
    pub fn new(product_id: impl Into<String>, variant_id: Option<String>) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id,
        }
    }

    /// Key for a product without variants
    pub fn product(product_id: impl Into<String>) -> Self {
        Self::new(product_id, None)
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant_id {
            Some(variant) => write!(f, "{}/{}", self.product_id, variant),
            None => write!(f, "{}", self.product_id),
        }
    }
}

/// Parses `product` or `product/variant`
impl FromStr for LineKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (product, variant) = match s.split_once('/') {
            Some((p, v)) => (p.trim(), Some(v.trim())),
            None => (s.trim(), None),
        };

        if product.is_empty() {
            return Err(Error::validation("product id cannot be empty"));
        }

        Ok(Self::new(
            product,
            variant.filter(|v| !v.is_empty()).map(str::to_string),
        ))
    }
}

/// Anything stored in a keyed line collection
pub trait Keyed {
    fn key(&self) -> LineKey;
}

/// Product being acted on by the UI (the page the user is looking at)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProductRef {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            ..Self::default()
        }
    }

    pub fn with_variant(mut self, variant_id: impl Into<String>) -> Self {
        self.variant_id = Some(variant_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id.clone(), self.variant_id.clone())
    }
}

/// Price of the variant currently displayed to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub unit_price: Decimal,
    pub original_price: Decimal,
    pub discount_percent: Decimal,
}

impl PriceSnapshot {
    /// A price with no discount applied
    pub fn new(unit_price: Decimal) -> Self {
        Self {
            unit_price,
            original_price: unit_price,
            discount_percent: Decimal::ZERO,
        }
    }

    /// Set the pre-discount price; the discount percentage is derived from it
    pub fn with_original(mut self, original_price: Decimal) -> Self {
        self.original_price = original_price;
        self.discount_percent = if original_price > Decimal::ZERO && original_price > self.unit_price
        {
            original_price
                .checked_sub(self.unit_price)
                .and_then(|off| off.checked_div(original_price))
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .map(|pct| pct.round_dp(2))
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };
        self
    }
}

fn default_quantity() -> u32 {
    1
}

/// One cart or wishlist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub original_price: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl LineItem {
    /// Build a line for `product` at the given price
    pub fn from_product(product: &ProductRef, price: &PriceSnapshot, quantity: u32) -> Self {
        Self {
            product_id: product.product_id.clone(),
            variant_id: product.variant_id.clone(),
            quantity: quantity.max(1),
            unit_price: price.unit_price,
            original_price: price.original_price,
            discount_percent: price.discount_percent,
            product_name: product.product_name.clone(),
            image_ref: product.image_ref.clone(),
            description: product.description.clone(),
        }
    }

    /// `unit_price × quantity`, saturating at the `Decimal` bounds
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }

    /// `original_price × quantity`, saturating at the `Decimal` bounds
    pub fn original_total(&self) -> Decimal {
        self.original_price.saturating_mul(Decimal::from(self.quantity))
    }
}

impl Keyed for LineItem {
    fn key(&self) -> LineKey {
        LineKey::new(self.product_id.clone(), self.variant_id.clone())
    }
}

/// Identifier of a line in the active cart
///
/// Guest lines are addressed by their dedup key; server lines by the
/// cart-item id the server assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartLineId {
    Guest(LineKey),
    Server(u64),
}

impl CartLineId {
    pub fn server_id(&self) -> Option<u64> {
        match self {
            CartLineId::Server(id) => Some(*id),
            CartLineId::Guest(_) => None,
        }
    }

    pub fn guest_key(&self) -> Option<&LineKey> {
        match self {
            CartLineId::Guest(key) => Some(key),
            CartLineId::Server(_) => None,
        }
    }
}

impl fmt::Display for CartLineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartLineId::Guest(key) => write!(f, "{}", key),
            CartLineId::Server(id) => write!(f, "{}", id),
        }
    }
}

/// A line item in the active cart together with its identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartLineId,
    #[serde(flatten)]
    pub item: LineItem,
}

impl CartLine {
    /// Wrap a device-held line; its id is its dedup key
    pub fn guest(item: LineItem) -> Self {
        Self {
            id: CartLineId::Guest(item.key()),
            item,
        }
    }

    pub fn server(id: u64, item: LineItem) -> Self {
        Self {
            id: CartLineId::Server(id),
            item,
        }
    }
}

impl Keyed for CartLine {
    fn key(&self) -> LineKey {
        self.item.key()
    }
}
