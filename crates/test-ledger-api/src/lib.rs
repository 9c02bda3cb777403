// crates/test-ledger-api/src/lib.rs
// ============================================================================
// Module: Test Ledger API Library
// Description: HTTP API for users, test cases, execution results and logs.
// Purpose: Expose the ledger over JSON/HTTP with token auth and request logs.
// Dependencies: axum, tokio, tower-http, tracing, test-ledger-{core,config}
// ============================================================================

//! ## Overview
//! `test-ledger-api` assembles the HTTP surface of the Test Ledger:
//! identity primitives ([`identity`]), access policy ([`auth`]), request
//! validation, the [`service::LedgerService`] operations, the request log
//! middleware, error normalization and the [`server::ApiServer`] that wires
//! them to a configured store.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod error;
pub mod identity;
pub mod request_log;
pub mod routes;
pub mod server;
pub mod service;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::AccessPolicy;
pub use auth::AuthError;
pub use auth::Identity;
pub use auth::RequestContext;
pub use auth::authorize;
pub use error::ApiError;
pub use error::ErrorNote;
pub use identity::IdentityError;
pub use identity::PasswordHasher;
pub use identity::TokenClaims;
pub use identity::TokenIssuer;
pub use request_log::NoopLogSink;
pub use request_log::RequestLogSink;
pub use request_log::StoreLogSink;
pub use server::ApiServer;
pub use server::ServerError;
pub use service::LedgerService;
pub use service::ServiceSettings;
