//! Integration tests for the restaurant API.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory store, no external services
//! cargo test -p restaurant-integration-tests
//!
//! # Also exercise the PostgreSQL store
//! RESTAURANT_TEST_DATABASE_URL=postgres://... \
//!     cargo test -p restaurant-integration-tests -- --include-ignored
//! ```
//!
//! Each test spawns the full router on an ephemeral port and talks to it over
//! real HTTP with `reqwest`.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;

use reqwest::{Client, Response, header};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use restaurant_core::FoodId;
use restaurant_server::config::ServerConfig;
use restaurant_server::db::{DocumentStore, FoodRepository, MemoryStore};
use restaurant_server::{AppState, app};

/// Signing secret used by every test server.
pub const TEST_TOKEN_SECRET: &str = "q8Zt4LmP0vXa7Rk2WbNc9YhDe5UjGs3F";

/// Frontend origin the test servers allow.
pub const TEST_ORIGIN: &str = "http://localhost:5173";

/// A running API server bound to an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    pub state: AppState,
}

impl TestServer {
    /// Spawn a server backed by an empty in-memory store.
    pub async fn spawn() -> Self {
        Self::spawn_with(Box::new(MemoryStore::new())).await
    }

    /// Spawn a server backed by the given store.
    pub async fn spawn_with(store: Box<dyn DocumentStore>) -> Self {
        let vars = HashMap::from([
            ("RESTAURANT_STORE", "memory"),
            ("ACCESS_TOKEN_SECRET", TEST_TOKEN_SECRET),
            ("RESTAURANT_ALLOWED_ORIGINS", TEST_ORIGIN),
        ]);
        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned()))
            .expect("test configuration is valid");

        let state = AppState::new(config, store);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("listener address");

        let router = app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("server runs");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: Client::new(),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Insert a catalog entry directly into the store.
    pub async fn add_food(&self, name: &str, quantity: i64) -> FoodId {
        let document = json!({
            "food_name": name,
            "price": 9.5,
            "quantity": quantity,
            "purchaseCount": 0,
            "totalSeals": 0,
        })
        .as_object()
        .cloned()
        .expect("object literal");

        FoodRepository::new(self.state.store())
            .insert(document)
            .await
            .expect("insert food")
    }

    pub async fn food(&self, id: FoodId) -> Value {
        self.client
            .get(self.url(&format!("/foods/{id}")))
            .send()
            .await
            .expect("GET /foods/{id}")
            .json()
            .await
            .expect("food body")
    }

    /// Log in through `/jwt` and return the `token=...` cookie pair.
    pub async fn login(&self, identity: Value) -> String {
        let resp = self
            .client
            .post(self.url("/jwt"))
            .json(&identity)
            .send()
            .await
            .expect("POST /jwt");
        assert!(resp.status().is_success());
        session_cookie_pair(&resp).expect("token cookie is set")
    }

    pub async fn purchase(&self, body: Value) -> Response {
        self.client
            .post(self.url("/purchase"))
            .json(&body)
            .send()
            .await
            .expect("POST /purchase")
    }
}

/// The raw `Set-Cookie` header of a response.
pub fn set_cookie(resp: &Response) -> Option<String> {
    resp.headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// The `name=value` pair of the session cookie, ready for a `Cookie` header.
///
/// The cookie is marked `Secure`, so a cookie jar would never replay it over
/// plain HTTP; tests send it by hand instead.
pub fn session_cookie_pair(resp: &Response) -> Option<String> {
    let raw = set_cookie(resp)?;
    let pair = raw.split(';').next()?.trim();
    pair.starts_with("token=").then(|| pair.to_owned())
}
