//! Mock storefront API server for testing
//!
//! Stateful stand-in for the cart and wishlist resources. Items live in
//! memory per user; ids are assigned from one counter shared by both
//! collections.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Map, Value as JsonValue};

/// Configuration for the mock server
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Bearer token every request must carry, if any
    pub require_token: Option<String>,
    /// Answer list requests with a bare array instead of `{ items }`
    pub bare_lists: bool,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    carts: HashMap<String, Vec<JsonValue>>,
    wishlists: HashMap<String, Vec<JsonValue>>,
    requests: Vec<String>,
    /// (method, path prefix, status) rules checked before routing
    failures: Vec<(String, String, u16)>,
}

impl MockState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Mock storefront server for testing
pub struct MockStorefrontServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<MockState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockStorefrontServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(MockState::default()));

        // Non-blocking accept loop so stop() can end it
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let state_clone = state.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let state = state_clone.clone();
                        thread::spawn(move || {
                            handle_connection(stream, &cfg, &state);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Put an item straight into a user's cart, returning its id
    pub fn seed_cart(&self, user_id: &str, item: JsonValue) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let item = with_id(item, id);
        state.carts.entry(user_id.to_string()).or_default().push(item);
        id
    }

    /// Put an item straight into a user's wishlist, returning its id
    pub fn seed_wishlist(&self, user_id: &str, item: JsonValue) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let item = with_id(item, id);
        state
            .wishlists
            .entry(user_id.to_string())
            .or_default()
            .push(item);
        id
    }

    /// Answer requests matching `method` and `path_prefix` with `status`
    pub fn fail(&self, method: &str, path_prefix: &str, status: u16) {
        self.state.lock().unwrap().failures.push((
            method.to_string(),
            path_prefix.to_string(),
            status,
        ));
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    /// Requests received so far, as "METHOD /path"
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn cart(&self, user_id: &str) -> Vec<JsonValue> {
        self.state
            .lock()
            .unwrap()
            .carts
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn wishlist(&self, user_id: &str) -> Vec<JsonValue> {
        self.state
            .lock()
            .unwrap()
            .wishlists
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockStorefrontServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn with_id(item: JsonValue, id: u64) -> JsonValue {
    let mut map = match item {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    };
    map.insert("id".to_string(), json!(id));
    JsonValue::Object(map)
}

struct Request {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: String,
}

fn read_request(stream: &TcpStream) -> Option<Request> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let length = headers
        .get("content-length")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;

    Some(Request {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, state: &Mutex<MockState>) {
    let _ = stream.set_nonblocking(false);

    let request = match read_request(&stream) {
        Some(request) => request,
        None => {
            send_response(&mut stream, 400, r#"{"error": "Invalid request"}"#);
            return;
        }
    };

    if let Some(token) = &config.require_token {
        let expected = format!("Bearer {}", token);
        if request.headers.get("authorization") != Some(&expected) {
            send_response(&mut stream, 401, r#"{"error": "Unauthorized"}"#);
            return;
        }
    }

    let (status, body) = {
        let mut state = match state.lock() {
            Ok(state) => state,
            Err(_) => {
                send_response(&mut stream, 500, r#"{"error": "Internal"}"#);
                return;
            }
        };
        route(&mut state, config, &request)
    };

    send_response(&mut stream, status, &body);
}

fn route(state: &mut MockState, config: &MockConfig, request: &Request) -> (u16, String) {
    state
        .requests
        .push(format!("{} {}", request.method, request.path));

    let injected = state
        .failures
        .iter()
        .find(|(method, prefix, _)| *method == request.method && request.path.starts_with(prefix))
        .map(|(_, _, status)| *status);
    if let Some(status) = injected {
        return (status, r#"{"error": "Injected failure"}"#.to_string());
    }

    let segments: Vec<&str> = request
        .path
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let body: JsonValue = serde_json::from_str(&request.body).unwrap_or(JsonValue::Null);

    match (request.method.as_str(), segments.as_slice()) {
        ("GET", ["users", user, "cart"]) => {
            let items = state.carts.get(*user).cloned().unwrap_or_default();
            (200, list_body(items, config))
        }
        ("POST", ["users", user, "cart"]) => {
            let id = state.next_id();
            let item = with_id(body, id);
            state
                .carts
                .entry(user.to_string())
                .or_default()
                .push(item.clone());
            (201, item.to_string())
        }
        ("PATCH", ["cart", id]) => {
            let found = state
                .carts
                .values_mut()
                .flat_map(|items| items.iter_mut())
                .find(|item| id_matches(item, id));
            match found {
                Some(item) => {
                    if let (JsonValue::Object(target), JsonValue::Object(patch)) = (item, body) {
                        for (key, value) in patch {
                            target.insert(key, value);
                        }
                        (200, JsonValue::Object(target.clone()).to_string())
                    } else {
                        (400, r#"{"error": "Invalid body"}"#.to_string())
                    }
                }
                None => (404, r#"{"error": "Not found"}"#.to_string()),
            }
        }
        ("DELETE", ["cart", id]) => remove_by_id(&mut state.carts, id),
        ("GET", ["users", user, "wishlist"]) => {
            let items = state.wishlists.get(*user).cloned().unwrap_or_default();
            (200, list_body(items, config))
        }
        ("POST", ["users", user, "wishlist"]) => {
            let id = state.next_id();
            let item = with_id(body, id);
            state
                .wishlists
                .entry(user.to_string())
                .or_default()
                .push(item.clone());
            (201, item.to_string())
        }
        ("DELETE", ["wishlist", id]) => remove_by_id(&mut state.wishlists, id),
        _ => (404, r#"{"error": "Unknown route"}"#.to_string()),
    }
}

fn id_matches(item: &JsonValue, id: &str) -> bool {
    item.get("id").map(|v| v.to_string()).as_deref() == Some(id)
}

fn remove_by_id(collections: &mut HashMap<String, Vec<JsonValue>>, id: &str) -> (u16, String) {
    for items in collections.values_mut() {
        if let Some(pos) = items.iter().position(|item| id_matches(item, id)) {
            items.remove(pos);
            return (204, String::new());
        }
    }
    (404, r#"{"error": "Not found"}"#.to_string())
}

fn list_body(items: Vec<JsonValue>, config: &MockConfig) -> String {
    if config.bare_lists {
        JsonValue::Array(items).to_string()
    } else {
        json!({ "items": items }).to_string()
    }
}

fn send_response(stream: &mut TcpStream, status: u16, body: &str) {
    let status_text = match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::rest::RestClient;
    use crate::domain::result::Error;
    use crate::domain::{LineItem, PriceSnapshot, ProductRef, UserSession};
    use crate::ports::RemoteStore;
    use rust_decimal::Decimal;

    fn item(product: &str, variant: Option<&str>, price: i64) -> LineItem {
        let mut product = ProductRef::new(product).with_name("Sneaker");
        if let Some(v) = variant {
            product = product.with_variant(v);
        }
        LineItem::from_product(&product, &PriceSnapshot::new(Decimal::new(price, 2)), 1)
    }

    #[tokio::test]
    async fn test_cart_round_trip() {
        let server = MockStorefrontServer::start(MockConfig::default()).unwrap();
        let client = RestClient::new(&server.base_url(), 5, None).unwrap();
        let session = UserSession::new("42");

        let mut new_item = item("P1", Some("V1"), 1999);
        new_item.quantity = 2;
        let created = client.add_cart_item(&session, &new_item).await.unwrap();
        assert_eq!(created.item.quantity, 2);
        assert_eq!(created.item.unit_price, Decimal::new(1999, 2));
        assert_eq!(created.item.variant_id.as_deref(), Some("V1"));

        let id = created.id.server_id().unwrap();
        let updated = client
            .update_cart_item(&session, id, 3, Decimal::new(1799, 2))
            .await
            .unwrap();
        assert_eq!(updated.item.quantity, 3);
        assert_eq!(updated.item.unit_price, Decimal::new(1799, 2));

        let lines = client.list_cart(&session).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].item.quantity, 3);

        client.delete_cart_item(&session, id).await.unwrap();
        assert!(client.list_cart(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wishlist_round_trip_with_bare_lists() {
        let server = MockStorefrontServer::start(MockConfig {
            bare_lists: true,
            ..Default::default()
        })
        .unwrap();
        server.seed_wishlist("7", json!({"productId": 100, "price": "5.00"}));
        let client = RestClient::new(&server.base_url(), 5, None).unwrap();
        let session = UserSession::new("7");

        let entry = client
            .add_wishlist_item(&session, &item("P2", None, 500))
            .await
            .unwrap();
        assert!(!entry.id.is_local());

        let entries = client.list_wishlist(&session).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].item.product_id, "100");

        let remote_id = entry.id.remote_id().unwrap();
        client.delete_wishlist_item(&session, remote_id).await.unwrap();
        assert_eq!(server.wishlist("7").len(), 1);
    }

    #[tokio::test]
    async fn test_bearer_token_from_session_or_config() {
        let server = MockStorefrontServer::start(MockConfig {
            require_token: Some("secret".to_string()),
            ..Default::default()
        })
        .unwrap();

        let anonymous = RestClient::new(&server.base_url(), 5, None).unwrap();
        let err = anonymous
            .list_cart(&UserSession::new("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network { status: Some(401), .. }));

        let session = UserSession::new("1").with_token("secret");
        assert!(anonymous.list_cart(&session).await.is_ok());

        let configured =
            RestClient::new(&server.base_url(), 5, Some("secret".to_string())).unwrap();
        assert!(configured.list_cart(&UserSession::new("1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_failure_surfaces_status() {
        let server = MockStorefrontServer::start(MockConfig::default()).unwrap();
        server.fail("DELETE", "/cart/", 500);
        let client = RestClient::new(&server.base_url(), 5, None).unwrap();

        let err = client
            .delete_cart_item(&UserSession::new("1"), 99)
            .await
            .unwrap_err();
        assert!(err.is_network());
        assert!(matches!(err, Error::Network { status: Some(500), .. }));
        assert_eq!(server.requests(), vec!["DELETE /cart/99".to_string()]);
    }

    #[tokio::test]
    async fn test_seeded_cart_and_cleared_failures() {
        let server = MockStorefrontServer::start(MockConfig::default()).unwrap();
        let id = server.seed_cart("3", json!({"productId": "P9", "quantity": 4, "price": 2.5}));
        server.fail("GET", "/users/3/cart", 503);
        let client = RestClient::new(&server.base_url(), 5, None).unwrap();
        let session = UserSession::new("3");

        assert!(client.list_cart(&session).await.is_err());

        server.clear_failures();
        let lines = client.list_cart(&session).await.unwrap();
        assert_eq!(lines[0].id.server_id(), Some(id));
        assert_eq!(lines[0].item.quantity, 4);

        client.delete_cart_item(&session, id).await.unwrap();
        assert!(server.cart("3").is_empty());
    }

    #[tokio::test]
    async fn test_missing_line_is_not_found_status() {
        let server = MockStorefrontServer::start(MockConfig::default()).unwrap();
        let client = RestClient::new(&server.base_url(), 5, None).unwrap();

        let err = client
            .update_cart_item(&UserSession::new("1"), 12345, 2, Decimal::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network { status: Some(404), .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let server = MockStorefrontServer::start(MockConfig::default()).unwrap();
        let base_url = server.base_url();
        drop(server);

        let client = RestClient::new(&base_url, 2, None).unwrap();
        let err = client.list_cart(&UserSession::new("1")).await.unwrap_err();
        assert!(err.is_network());
    }
}
