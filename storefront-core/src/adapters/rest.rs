//! Storefront REST client
//!
//! Talks to the per-user cart and wishlist resources:
//! - GET/POST   {base}/users/{userId}/cart
//! - PATCH/DELETE {base}/cart/{id}
//! - GET/POST   {base}/users/{userId}/wishlist
//! - DELETE     {base}/wishlist/{id}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{CartLine, LineItem, UserSession, WishlistEntry};
use crate::ports::RemoteStore;

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// API Models
// =============================================================================

/// List endpoints answer either `{ "items": [...] }` or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Wrapped { items: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListResponse<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Wrapped { items } => items,
            ListResponse::Bare(items) => items,
        }
    }
}

/// Cart item as returned by the server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartItemDto {
    #[serde(alias = "cartItemId", deserialize_with = "deserialize_id")]
    id: u64,
    #[serde(flatten)]
    fields: ItemFields,
}

/// Wishlist item as returned by the server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WishlistItemDto {
    #[serde(alias = "wishlistId", deserialize_with = "deserialize_id")]
    id: u64,
    #[serde(flatten)]
    fields: ItemFields,
}

/// Product fields shared by cart and wishlist items
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemFields {
    #[serde(deserialize_with = "deserialize_string_id")]
    product_id: String,
    #[serde(default, deserialize_with = "deserialize_optional_string_id")]
    variant_id: Option<String>,
    #[serde(default)]
    quantity: Option<u32>,
    /// Server calls it `price`, older builds `unitPrice`
    #[serde(default, alias = "unitPrice", deserialize_with = "deserialize_optional_amount")]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    original_price: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    discount_percent: Option<Decimal>,
    #[serde(default, alias = "name")]
    product_name: Option<String>,
    #[serde(default, alias = "image")]
    image_ref: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl ItemFields {
    fn into_line_item(self) -> LineItem {
        let unit_price = self.price.unwrap_or_default();
        LineItem {
            product_id: self.product_id,
            variant_id: self.variant_id,
            quantity: self.quantity.unwrap_or(1).max(1),
            unit_price,
            original_price: self.original_price.unwrap_or(unit_price),
            discount_percent: self.discount_percent.unwrap_or_default(),
            product_name: self.product_name,
            image_ref: self.image_ref,
            description: self.description,
        }
    }
}

/// Body for creating a cart line or wishlist entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateItemRequest<'a> {
    product_id: &'a str,
    variant_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<u32>,
    price: Decimal,
    original_price: Decimal,
    discount_percent: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_ref: Option<&'a str>,
}

impl<'a> CreateItemRequest<'a> {
    fn from_item(item: &'a LineItem, quantity: Option<u32>) -> Self {
        Self {
            product_id: &item.product_id,
            variant_id: item.variant_id.as_deref(),
            quantity,
            price: item.unit_price,
            original_price: item.original_price,
            discount_percent: item.discount_percent,
            product_name: item.product_name.as_deref(),
            image_ref: item.image_ref.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdateQuantityRequest {
    quantity: u32,
    price: Decimal,
}

/// Deserialize ID that can be number or numeric string
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("invalid id: {}", n))),
        JsonValue::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| D::Error::custom(format!("invalid id: {}", s))),
        _ => Err(D::Error::custom("expected number or string for id")),
    }
}

/// Deserialize product ID that can be number or string
fn deserialize_string_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::String(s) => Ok(s),
        _ => Err(D::Error::custom("expected number or string for id")),
    }
}

/// Deserialize optional ID that can be number or string
fn deserialize_optional_string_id<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(JsonValue::String(s)) if s.is_empty() => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(JsonValue::Null) | None => Ok(None),
        _ => Err(D::Error::custom("expected number or string for id")),
    }
}

/// Deserialize amount that can be number or string
fn deserialize_optional_amount<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        Some(JsonValue::Number(n)) => n
            .to_string()
            .parse::<Decimal>()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid decimal: {}", e))),
        Some(JsonValue::String(s)) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid decimal: {}", e))),
        Some(JsonValue::Null) | None => Ok(None),
        _ => Err(D::Error::custom("expected number or string for amount")),
    }
}

// =============================================================================
// RestClient
// =============================================================================

/// HTTP implementation of [`RemoteStore`]
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: Url,
    timeout_secs: u64,
    token: Option<String>,
}

impl RestClient {
    /// Create a client for `base_url`
    ///
    /// `token` is the fallback bearer token used when a session carries none.
    pub fn new(base_url: &str, timeout_secs: u64, token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| Error::Config(format!("Invalid API base URL '{}': {}", base_url, e)))?;

        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(Error::Config(format!(
                "API base URL must use http or https, got '{}'",
                base_url.scheme()
            )));
        }
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("Invalid API base URL '{}'", base_url)));
        }

        let timeout_secs = if timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            timeout_secs
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            timeout_secs,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid API base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder, session: &UserSession) -> RequestBuilder {
        match session.token.as_deref().or(self.token.as_deref()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, session: &UserSession) -> Result<Response> {
        let response = self
            .authorize(request, session)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        self.check_response_status(&response)?;
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response, what: &str) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| Error::network(format!("Failed to parse {} response: {}", what, e)))
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::network(format!(
                "Connection timed out after {} seconds",
                self.timeout_secs
            ))
        } else if error.is_connect() {
            Error::network("Unable to connect to the storefront server")
        } else {
            Error::network(format!("Storefront request failed: {}", error))
        }
    }

    /// Check response status and return appropriate errors
    fn check_response_status(&self, response: &Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = match status.as_u16() {
            401 => "Storefront authentication failed. Please sign in again.".to_string(),
            403 => "Storefront access denied.".to_string(),
            404 => "Storefront resource not found.".to_string(),
            429 => "Storefront rate limit exceeded. Please wait a moment and try again."
                .to_string(),
            code => format!("Storefront API error: HTTP {}", code),
        };
        Err(Error::http(status.as_u16(), message))
    }
}

#[async_trait]
impl RemoteStore for RestClient {
    async fn list_cart(&self, session: &UserSession) -> Result<Vec<CartLine>> {
        let url = self.endpoint(&["users", session.user_id.as_str(), "cart"])?;
        let response = self.send(self.client.get(url), session).await?;
        let list: ListResponse<CartItemDto> = self.read_json(response, "cart").await?;

        Ok(list
            .into_items()
            .into_iter()
            .map(|dto| CartLine::server(dto.id, dto.fields.into_line_item()))
            .collect())
    }

    async fn add_cart_item(&self, session: &UserSession, item: &LineItem) -> Result<CartLine> {
        let url = self.endpoint(&["users", session.user_id.as_str(), "cart"])?;
        let body = CreateItemRequest::from_item(item, Some(item.quantity.max(1)));
        let response = self.send(self.client.post(url).json(&body), session).await?;
        let dto: CartItemDto = self.read_json(response, "cart item").await?;

        Ok(CartLine::server(dto.id, dto.fields.into_line_item()))
    }

    async fn update_cart_item(
        &self,
        session: &UserSession,
        cart_item_id: u64,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<CartLine> {
        let id = cart_item_id.to_string();
        let url = self.endpoint(&["cart", id.as_str()])?;
        let body = UpdateQuantityRequest {
            quantity,
            price: unit_price,
        };
        let response = self.send(self.client.patch(url).json(&body), session).await?;
        let dto: CartItemDto = self.read_json(response, "cart item").await?;

        Ok(CartLine::server(dto.id, dto.fields.into_line_item()))
    }

    async fn delete_cart_item(&self, session: &UserSession, cart_item_id: u64) -> Result<()> {
        let id = cart_item_id.to_string();
        let url = self.endpoint(&["cart", id.as_str()])?;
        self.send(self.client.delete(url), session).await?;
        Ok(())
    }

    async fn list_wishlist(&self, session: &UserSession) -> Result<Vec<WishlistEntry>> {
        let url = self.endpoint(&["users", session.user_id.as_str(), "wishlist"])?;
        let response = self.send(self.client.get(url), session).await?;
        let list: ListResponse<WishlistItemDto> = self.read_json(response, "wishlist").await?;

        Ok(list
            .into_items()
            .into_iter()
            .map(|dto| WishlistEntry::remote(dto.id, dto.fields.into_line_item()))
            .collect())
    }

    async fn add_wishlist_item(
        &self,
        session: &UserSession,
        item: &LineItem,
    ) -> Result<WishlistEntry> {
        let url = self.endpoint(&["users", session.user_id.as_str(), "wishlist"])?;
        let body = CreateItemRequest::from_item(item, None);
        let response = self.send(self.client.post(url).json(&body), session).await?;
        let dto: WishlistItemDto = self.read_json(response, "wishlist item").await?;

        Ok(WishlistEntry::remote(dto.id, dto.fields.into_line_item()))
    }

    async fn delete_wishlist_item(&self, session: &UserSession, wishlist_id: u64) -> Result<()> {
        let id = wishlist_id.to_string();
        let url = self.endpoint(&["wishlist", id.as_str()])?;
        self.send(self.client.delete(url), session).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            RestClient::new("not a url", 30, None),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RestClient::new("ftp://example.com", 30, None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = RestClient::new("https://api.example.com/v1/", 30, None).unwrap();
        let url = client.endpoint(&["users", "42", "cart"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/users/42/cart");

        let client = RestClient::new("https://api.example.com", 30, None).unwrap();
        let url = client.endpoint(&["cart", "7"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/cart/7");
    }

    #[test]
    fn test_endpoint_escapes_user_id() {
        let client = RestClient::new("https://api.example.com", 30, None).unwrap();
        let url = client.endpoint(&["users", "a/b c", "cart"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/users/a%2Fb%20c/cart");
    }

    #[test]
    fn test_list_response_shapes() {
        let wrapped: ListResponse<CartItemDto> = serde_json::from_str(
            r#"{"items": [{"id": 1, "productId": "P1", "quantity": 2, "price": 9.5}]}"#,
        )
        .unwrap();
        let bare: ListResponse<CartItemDto> =
            serde_json::from_str(r#"[{"id": "2", "productId": 5, "price": "3.25"}]"#).unwrap();

        let wrapped = wrapped.into_items();
        assert_eq!(wrapped[0].id, 1);
        assert_eq!(wrapped[0].fields.quantity, Some(2));

        let bare = bare.into_items();
        assert_eq!(bare[0].id, 2);
        assert_eq!(bare[0].fields.product_id, "5");
        assert_eq!(bare[0].fields.price, Some(Decimal::new(325, 2)));
    }

    #[test]
    fn test_item_fields_defaults() {
        let dto: WishlistItemDto = serde_json::from_str(
            r#"{"wishlistId": 9, "productId": "P1", "variantId": "", "unitPrice": 4}"#,
        )
        .unwrap();
        let item = dto.fields.into_line_item();
        assert_eq!(item.variant_id, None);
        assert_eq!(item.quantity, 1);
        assert_eq!(item.unit_price, Decimal::new(4, 0));
        assert_eq!(item.original_price, Decimal::new(4, 0));
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let client = RestClient::new("http://localhost:1", 0, None).unwrap();
        assert_eq!(client.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
