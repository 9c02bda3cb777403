// crates/test-ledger-api/tests/common/mod.rs
// ============================================================================
// Module: API Test Harness
// Description: Spawns a real Test Ledger server on an ephemeral port.
// Purpose: Drive the HTTP surface end to end with reqwest.
// Dependencies: reqwest, tokio, test-ledger-api, test-ledger-config
// ============================================================================

//! ## Overview
//! Shared helpers for the API integration suites. Each server runs in the
//! test's own multi-thread runtime over an in-memory store and stops when
//! the handle is dropped.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

use std::sync::Arc;

use reqwest::Client;
use reqwest::Response;
use reqwest::StatusCode;
use serde_json::Value;
use serde_json::json;
use test_ledger_api::ApiServer;
use test_ledger_api::RequestLogSink;
use test_ledger_config::LedgerConfig;
use test_ledger_core::SharedLedgerStore;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Token secret used by every test server.
pub const SECRET: &str = "0123456789abcdef0123456789abcdef";

/// Builds a config with low hashing cost; `extra` is prepended verbatim.
pub fn test_config(extra: &str) -> LedgerConfig {
    let text =
        format!("{extra}\n[auth]\ntoken_secret = \"{SECRET}\"\npassword_iterations = 1000\n");
    LedgerConfig::from_toml_str(&text).expect("test config")
}

/// Running test server.
pub struct TestServer {
    /// Base URL such as `http://127.0.0.1:PORT`.
    pub base_url: String,
    /// Store behind the server.
    pub store: SharedLedgerStore,
    /// HTTP client.
    pub client: Client,
    /// Shutdown trigger.
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Spawns a server built from `extra` config text.
pub async fn spawn(extra: &str) -> TestServer {
    let server = ApiServer::from_config(&test_config(extra)).expect("server");
    spawn_server(server).await
}

/// Spawns a server with a replacement request log sink.
pub async fn spawn_with_sink(sink: Arc<dyn RequestLogSink>) -> TestServer {
    let server = ApiServer::from_config(&test_config("")).expect("server").with_log_sink(sink);
    spawn_server(server).await
}

/// Serves `server` on an ephemeral port.
pub async fn spawn_server(server: ApiServer) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let store = server.store();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = server
            .serve_with_listener(listener, async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    TestServer {
        base_url: format!("http://{addr}"),
        store,
        client: Client::new(),
        shutdown: Some(shutdown_tx),
    }
}

impl TestServer {
    /// Returns the absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends a GET, optionally with a bearer token.
    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("get")
    }

    /// Sends a JSON request with the given method, optionally authenticated.
    pub async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: &Value,
    ) -> Response {
        let mut request = self.client.request(method, self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("send")
    }

    /// Sends a JSON POST, optionally authenticated.
    pub async fn post(&self, path: &str, token: Option<&str>, body: &Value) -> Response {
        self.send_json(reqwest::Method::POST, path, token, body).await
    }

    /// Registers a user and returns the status.
    pub async fn register(&self, username: &str, password: &str, role: &str) -> StatusCode {
        let body = json!({"username": username, "password": password, "role": role});
        self.post("/auth/register", None, &body).await.status()
    }

    /// Logs in and returns the access token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let body = json!({"username": username, "password": password});
        let response = self.post("/auth/login", None, &body).await;
        assert_eq!(response.status(), StatusCode::OK);
        let payload: Value = response.json().await.expect("login json");
        payload["access_token"].as_str().expect("access_token").to_string()
    }

    /// Registers and logs in a user with `role`, returning the token.
    pub async fn token_for(&self, username: &str, role: &str) -> String {
        assert_eq!(self.register(username, "pw", role).await, StatusCode::CREATED);
        self.login(username, "pw").await
    }

    /// Creates a test case as `token` and returns its id.
    pub async fn create_test_case(&self, token: &str, name: &str) -> i64 {
        let response = self.post("/testcases/", Some(token), &json!({"name": name})).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let payload: Value = response.json().await.expect("create json");
        payload["test_case"]["id"].as_i64().expect("test case id")
    }
}

/// Reads the `error` field of a JSON error response.
pub async fn error_message(response: Response) -> String {
    let payload: Value = response.json().await.expect("error json");
    payload["error"].as_str().expect("error field").to_string()
}
