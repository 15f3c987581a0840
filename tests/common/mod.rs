#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use signups::config::{Config, CorsOrigins, StoreBackend};
use signups::store::{DocumentStore, MemoryStore};

pub const FRONTEND_ORIGIN: &str = "http://localhost:5500";

/// A running test server backed by the in-memory store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST a sign-up, return (body, status).
    pub async fn submit(&self, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/submissions"))
            .json(body)
            .send()
            .await
            .expect("submit request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// GET the submission list, return (body, status).
    pub async fn list(&self) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url("/api/submissions"))
            .send()
            .await
            .expect("list request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        log_level: "warn".to_string(),
        cors_origins: CorsOrigins::List(vec![FRONTEND_ORIGIN.to_string()]),
        max_body_size: 65_536,
        store: StoreBackend::Memory,
        init_attempts: 3,
        init_retry_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        firestore_database: "(default)".to_string(),
        firestore_endpoint: None,
    }
}

/// Spawn a test app with a fresh in-memory store.
pub async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let addr = serve(store.clone(), test_config()).await;

    TestApp {
        addr,
        client: Client::new(),
        store,
    }
}

/// Serve `build_app` on a random local port.
pub async fn serve(store: Arc<dyn DocumentStore>, config: Config) -> SocketAddr {
    let app = signups::build_app(store, config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    addr
}
