// crates/test-ledger-core/src/lib.rs
// ============================================================================
// Module: Test Ledger Core Library
// Description: Public API surface for the Test Ledger core.
// Purpose: Expose the domain model, store contract and in-memory backend.
// Dependencies: crate::{interfaces, model, store, time}
// ============================================================================

//! ## Overview
//! Test Ledger core defines the records kept by the ledger (users, test
//! cases, execution results, request logs), the [`LedgerStore`] persistence
//! contract, and an in-memory backend. It has no HTTP or database
//! dependencies; the API and SQLite crates build on it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod interfaces;
pub mod model;
pub mod store;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use interfaces::LedgerStore;
pub use interfaces::StoreError;
pub use model::ExecutionResult;
pub use model::LogEntry;
pub use model::LogFilter;
pub use model::MAX_ENDPOINT_NAME_LENGTH;
pub use model::MAX_METHOD_LENGTH;
pub use model::MAX_RESULT_LENGTH;
pub use model::MAX_TEST_CASE_NAME_LENGTH;
pub use model::MAX_USERNAME_LENGTH;
pub use model::NewExecutionResult;
pub use model::NewLogEntry;
pub use model::NewUser;
pub use model::Role;
pub use model::TestCase;
pub use model::TestCaseFields;
pub use model::User;
pub use store::InMemoryLedgerStore;
pub use store::SharedLedgerStore;
pub use time::Timestamp;
pub use time::TimestampError;
