// crates/test-ledger-api/src/request_log.rs
// ============================================================================
// Module: Request Log
// Description: Middleware and sinks recording one row per HTTP request.
// Purpose: Keep an audit trail of endpoint, method, status and error note.
// Dependencies: axum, tracing, test-ledger-core
// ============================================================================

//! ## Overview
//! [`record_requests`] wraps the whole router. Once the inner service has
//! produced a response it writes a [`NewLogEntry`] through the configured
//! [`RequestLogSink`]. Sink failures are logged and suppressed; the response
//! is returned unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::extract::Request;
use axum::extract::State;
use axum::middleware::Next;
use axum::response::Response;
use test_ledger_core::LedgerStore;
use test_ledger_core::MAX_ENDPOINT_NAME_LENGTH;
use test_ledger_core::MAX_METHOD_LENGTH;
use test_ledger_core::NewLogEntry;
use test_ledger_core::SharedLedgerStore;
use test_ledger_core::StoreError;
use test_ledger_core::Timestamp;

use crate::error::ErrorNote;
use crate::service::run_blocking;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for request log entries.
pub trait RequestLogSink: Send + Sync {
    /// Records one request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the entry cannot be written.
    fn record(&self, entry: NewLogEntry) -> Result<(), StoreError>;
}

/// Sink writing entries to the ledger store.
pub struct StoreLogSink {
    /// Backing store.
    store: SharedLedgerStore,
}

impl StoreLogSink {
    /// Creates a sink over `store`.
    #[must_use]
    pub const fn new(store: SharedLedgerStore) -> Self {
        Self {
            store,
        }
    }
}

impl RequestLogSink for StoreLogSink {
    fn record(&self, entry: NewLogEntry) -> Result<(), StoreError> {
        self.store.insert_log(entry).map(|_| ())
    }
}

/// Sink that discards entries.
pub struct NoopLogSink;

impl RequestLogSink for NoopLogSink {
    fn record(&self, _entry: NewLogEntry) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Truncates `value` to at most `max` characters.
fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Records the request after the inner service responded.
pub async fn record_requests(
    State(sink): State<Arc<dyn RequestLogSink>>,
    request: Request,
    next: Next,
) -> Response {
    let endpoint_name = truncate(request.uri().path(), MAX_ENDPOINT_NAME_LENGTH);
    let method = truncate(request.method().as_str(), MAX_METHOD_LENGTH);
    let response = next.run(request).await;
    let entry = NewLogEntry {
        endpoint_name,
        method,
        status_code: response.status().as_u16(),
        error: response.extensions().get::<ErrorNote>().map(|note| note.0.clone()),
        created_at: Timestamp::now(),
    };
    if let Err(err) = run_blocking(|| sink.record(entry)) {
        tracing::warn!(error = %err, "request log write failed");
    }
    response
}
