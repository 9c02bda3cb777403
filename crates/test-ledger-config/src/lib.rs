// crates/test-ledger-config/src/lib.rs
// ============================================================================
// Module: Test Ledger Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for test-ledger.toml semantics.
// Dependencies: serde, toml, test-ledger-store-sqlite
// ============================================================================

//! ## Overview
//! `test-ledger-config` defines the configuration model for the Test Ledger
//! server and validates it fail-closed before anything binds or opens a
//! database.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
