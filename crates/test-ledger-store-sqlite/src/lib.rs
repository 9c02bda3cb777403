// crates/test-ledger-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Ledger Store
// Description: Durable LedgerStore backend using SQLite.
// Purpose: Provide persistent storage for users, test cases, results and logs.
// Dependencies: test-ledger-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`test_ledger_core::LedgerStore`].
//! Uniqueness and the execution-result foreign key (with cascading delete)
//! are enforced by the database itself, and the schema is versioned so an
//! incompatible file fails closed on open.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteLedgerStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
