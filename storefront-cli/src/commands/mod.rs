//! CLI command implementations

pub mod cart;
pub mod checkout;
pub mod logs;
pub mod session;
pub mod status;
pub mod viewed;
pub mod wishlist;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use storefront_core::domain::Keyed;
use storefront_core::{CartLineId, CartModel, LineKey, StorefrontContext};

use crate::output;

/// Get the storefront directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("STOREFRONT_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".storefront"))
        .ok_or_else(|| anyhow!("Could not find home directory; set STOREFRONT_DIR"))
}

/// Build the context and load the current cart
pub async fn get_context() -> Result<StorefrontContext> {
    let data_dir = get_data_dir()?;

    let mut ctx = StorefrontContext::new(&data_dir)
        .with_context(|| format!("Failed to open storefront data in {:?}", data_dir))?;

    // A signed-in user whose server is unreachable still gets a context;
    // the failing command reports the network error itself
    if let Err(e) = ctx.cart.load().await {
        output::warning(&format!("Could not load your cart: {}", e.user_message()));
        log::warn!("Initial load failed: {}", e);
    }

    Ok(ctx)
}

/// Parse a cart line reference
///
/// A number is a server line id; anything else is `product[/variant]`.
pub fn parse_line_id(raw: &str) -> Result<CartLineId> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<u64>() {
        return Ok(CartLineId::Server(id));
    }
    let key: LineKey = raw.parse()?;
    Ok(CartLineId::Guest(key))
}

/// Resolve a line reference against the current model
///
/// Signed-in users may also name a line by `product[/variant]`, and a bare
/// number that is not a server id falls back to a numeric product id.
pub fn resolve_line_id(model: &CartModel, raw: &str) -> Result<CartLineId> {
    let id = parse_line_id(raw)?;
    if model.line(&id).is_some() {
        return Ok(id);
    }

    let key = match &id {
        CartLineId::Guest(key) => key.clone(),
        CartLineId::Server(n) => LineKey::product(n.to_string()),
    };
    if let Some(line) = model.cart.iter().find(|l| l.key() == key) {
        return Ok(line.id.clone());
    }

    Err(anyhow!("No cart line '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use storefront_core::{CartLine, LineItem, PriceSnapshot, ProductRef};

    #[test]
    fn test_parse_line_id() {
        assert_eq!(parse_line_id("42").unwrap(), CartLineId::Server(42));
        assert_eq!(
            parse_line_id("P1/V1").unwrap(),
            CartLineId::Guest(LineKey::new("P1", Some("V1".to_string())))
        );
        assert_eq!(
            parse_line_id(" P1 ").unwrap(),
            CartLineId::Guest(LineKey::product("P1"))
        );
        assert!(parse_line_id("/V1").is_err());
    }

    fn line(product: &str) -> CartLine {
        let item = LineItem::from_product(
            &ProductRef::new(product),
            &PriceSnapshot::new(Decimal::ONE),
            1,
        );
        CartLine::guest(item)
    }

    #[test]
    fn test_resolve_numeric_guest_product() {
        let model = CartModel {
            cart: vec![line("42"), line("P1")],
            ..Default::default()
        };

        assert_eq!(
            resolve_line_id(&model, "42").unwrap(),
            CartLineId::Guest(LineKey::product("42"))
        );
        assert_eq!(
            resolve_line_id(&model, "P1").unwrap(),
            CartLineId::Guest(LineKey::product("P1"))
        );
        assert!(resolve_line_id(&model, "7").is_err());
    }

    #[test]
    fn test_resolve_prefers_server_id() {
        let item = LineItem::from_product(
            &ProductRef::new("42"),
            &PriceSnapshot::new(Decimal::ONE),
            1,
        );
        let model = CartModel {
            user_id: Some("u1".to_string()),
            cart: vec![CartLine::server(42, item)],
            ..Default::default()
        };

        assert_eq!(resolve_line_id(&model, "42").unwrap(), CartLineId::Server(42));
    }
}
