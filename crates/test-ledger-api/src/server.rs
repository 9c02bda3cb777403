// crates/test-ledger-api/src/server.rs
// ============================================================================
// Module: API Server
// Description: Server assembly from configuration and HTTP serving.
// Purpose: Build the store, service and router, then serve over TCP.
// Dependencies: axum, tokio, tracing, test-ledger-config, test-ledger-store-sqlite
// ============================================================================

//! ## Overview
//! [`ApiServer`] turns a validated [`LedgerConfig`] into a running HTTP
//! service: it opens the configured store, resolves the token secret, wires
//! the request log sink and serves the router until shutdown.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use test_ledger_config::LedgerConfig;
use test_ledger_config::StoreType;
use test_ledger_core::InMemoryLedgerStore;
use test_ledger_core::SharedLedgerStore;
use test_ledger_store_sqlite::SqliteLedgerStore;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::identity::PasswordHasher;
use crate::identity::TokenIssuer;
use crate::request_log::NoopLogSink;
use crate::request_log::RequestLogSink;
use crate::request_log::StoreLogSink;
use crate::routes::build_router;
use crate::service::LedgerService;
use crate::service::ServiceSettings;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server startup and transport errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration rejected.
    #[error("config error: {0}")]
    Config(String),
    /// Store or service initialization failed.
    #[error("init error: {0}")]
    Init(String),
    /// Listener or connection handling failed.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Test Ledger HTTP server.
pub struct ApiServer {
    /// Configured bind address.
    bind: SocketAddr,
    /// Request body limit.
    max_body_bytes: usize,
    /// Shared ledger service.
    service: Arc<LedgerService>,
    /// Request log destination.
    log_sink: Arc<dyn RequestLogSink>,
}

impl ApiServer {
    /// Builds a server from configuration, opening the configured store.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when validation or store initialization fails.
    pub fn from_config(config: &LedgerConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let store = build_store(config)?;
        Self::with_store(config, store)
    }

    /// Builds a server over an existing store.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when the bind address or token secret
    /// cannot be resolved.
    pub fn with_store(config: &LedgerConfig, store: SharedLedgerStore) -> Result<Self, ServerError> {
        let bind = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let secret =
            config.auth.resolve_token_secret().map_err(|err| ServerError::Config(err.to_string()))?;
        let log_sink: Arc<dyn RequestLogSink> = if config.server.request_log {
            Arc::new(StoreLogSink::new(store.clone()))
        } else {
            Arc::new(NoopLogSink)
        };
        let settings = ServiceSettings {
            log_access: config.server.access.logs.into(),
            cookie_name: config.auth.cookie_name.clone(),
        };
        let service = LedgerService::new(
            store,
            PasswordHasher::new(config.auth.password_iterations),
            TokenIssuer::new(secret.as_bytes(), config.auth.token_ttl_secs),
            settings,
        );
        Ok(Self {
            bind,
            max_body_bytes: config.server.max_body_bytes,
            service: Arc::new(service),
            log_sink,
        })
    }

    /// Replaces the request log sink.
    #[must_use]
    pub fn with_log_sink(mut self, log_sink: Arc<dyn RequestLogSink>) -> Self {
        self.log_sink = log_sink;
        self
    }

    /// Returns the configured bind address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Returns the store backing the service.
    #[must_use]
    pub fn store(&self) -> SharedLedgerStore {
        self.service.store().clone()
    }

    /// Builds the application router.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.service), Arc::clone(&self.log_sink), self.max_body_bytes)
    }

    /// Binds the configured address and serves until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|err| ServerError::Transport(format!("bind {} failed: {err}", self.bind)))?;
        self.serve_with_listener(listener, shutdown_signal()).await
    }

    /// Serves on `listener` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when serving fails.
    pub async fn serve_with_listener<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|err| ServerError::Transport(format!("local addr unavailable: {err}")))?;
        tracing::info!(%addr, "test ledger listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))?;
        tracing::info!("test ledger stopped");
        Ok(())
    }
}

/// Builds the ledger store from configuration.
fn build_store(config: &LedgerConfig) -> Result<SharedLedgerStore, ServerError> {
    let store = match config.store.store_type {
        StoreType::Memory => SharedLedgerStore::from_store(InMemoryLedgerStore::new()),
        StoreType::Sqlite => {
            let sqlite_config = config
                .store
                .sqlite_config()
                .ok_or_else(|| ServerError::Config("sqlite store requires path".to_string()))?;
            let store = SqliteLedgerStore::new(&sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            tracing::info!(path = %sqlite_config.path.display(), "sqlite ledger store opened");
            SharedLedgerStore::from_store(store)
        }
    };
    Ok(store)
}

/// Resolves when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}
