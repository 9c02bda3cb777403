// crates/test-ledger-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate SQLite LedgerStore behavior.
// Purpose: Ensure durable persistence and database-enforced integrity.
// Dependencies: test-ledger-store-sqlite, test-ledger-core, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed ledger store: persistence across
//! reopen, uniqueness, foreign keys with cascade, log filtering, and
//! fail-closed handling of incompatible or corrupted files.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use rusqlite::Connection;
use rusqlite::params;
use tempfile::TempDir;
use test_ledger_core::LedgerStore;
use test_ledger_core::LogFilter;
use test_ledger_core::NewExecutionResult;
use test_ledger_core::NewLogEntry;
use test_ledger_core::NewUser;
use test_ledger_core::Role;
use test_ledger_core::StoreError;
use test_ledger_core::TestCaseFields;
use test_ledger_core::Timestamp;
use test_ledger_store_sqlite::SqliteLedgerStore;
use test_ledger_store_sqlite::SqliteStoreConfig;
use test_ledger_store_sqlite::SqliteStoreError;
use test_ledger_store_sqlite::SqliteStoreMode;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens a store at `path` with default pragmas.
fn open(path: &Path) -> SqliteLedgerStore {
    SqliteLedgerStore::new(&SqliteStoreConfig::new(path)).unwrap()
}

/// Builds a user insert input.
fn new_user(username: &str, role: Role) -> NewUser {
    NewUser {
        username: username.to_string(),
        password_hash: "pbkdf2_sha256$1000$c2FsdA$aGFzaA".to_string(),
        role,
        created_at: Timestamp::from_unix_micros(1_000),
    }
}

/// Builds test case fields.
fn fields(name: &str, description: Option<&str>) -> TestCaseFields {
    TestCaseFields {
        name: name.to_string(),
        description: description.map(str::to_string),
    }
}

/// Builds an execution result insert input.
fn new_result(test_case_id: i64, test_asset_id: i64) -> NewExecutionResult {
    NewExecutionResult {
        test_case_id,
        test_asset_id,
        result: "passed".to_string(),
        created_at: Timestamp::from_unix_micros(2_000),
    }
}

/// Builds a log insert input.
fn new_log(endpoint: &str, status_code: u16, micros: i64, error: Option<&str>) -> NewLogEntry {
    NewLogEntry {
        endpoint_name: endpoint.to_string(),
        method: "POST".to_string(),
        status_code,
        error: error.map(str::to_string),
        created_at: Timestamp::from_unix_micros(micros),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.db");
    {
        let store = open(&path);
        store.create_user(new_user("alice", Role::Admin)).unwrap();
        store
            .insert_test_case(fields("Login", Some("checks login")), Timestamp::from_unix_micros(5))
            .unwrap();
        store.insert_log(new_log("/auth/login", 200, 10, None)).unwrap();
    }
    let store = open(&path);
    let user = store.find_user("alice").unwrap().unwrap();
    assert_eq!(user.role, Role::Admin);
    assert_eq!(user.created_at, Timestamp::from_unix_micros(1_000));
    let cases = store.list_test_cases().unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].description.as_deref(), Some("checks login"));
    assert_eq!(store.query_logs(&LogFilter::default()).unwrap().len(), 1);
}

#[test]
fn duplicate_username_maps_to_conflict() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("ledger.db"));
    store.create_user(new_user("alice", Role::Admin)).unwrap();
    let err = store.create_user(new_user("alice", Role::User)).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "{err}");
}

#[test]
fn update_replaces_fields_and_reports_unknown_ids() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("ledger.db"));
    let created = store
        .insert_test_case(fields("Login", Some("old")), Timestamp::from_unix_micros(5))
        .unwrap();
    let updated = store.update_test_case(created.id, fields("Login v2", None)).unwrap().unwrap();
    assert_eq!(updated.name, "Login v2");
    assert_eq!(updated.description, None);
    assert_eq!(updated.created_at, created.created_at);
    assert!(store.update_test_case(404, fields("x", None)).unwrap().is_none());
    assert!(!store.delete_test_case(404).unwrap());
}

#[test]
fn foreign_key_and_cascade_are_enforced() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("ledger.db"));
    let err = store.insert_execution_result(new_result(42, 7)).unwrap_err();
    assert!(matches!(err, StoreError::MissingReference(_)), "{err}");

    let case = store.insert_test_case(fields("a", None), Timestamp::from_unix_micros(1)).unwrap();
    store.insert_execution_result(new_result(case.id, 7)).unwrap();
    store.insert_execution_result(new_result(case.id, 7)).unwrap();
    assert_eq!(store.list_execution_results_for_asset(7).unwrap().len(), 2);

    assert!(store.delete_test_case(case.id).unwrap());
    assert!(store.list_execution_results_for_asset(7).unwrap().is_empty());
}

#[test]
fn log_filters_translate_to_sql() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir.path().join("ledger.db"));
    store.insert_log(new_log("/testcases/", 201, 100, None)).unwrap();
    store.insert_log(new_log("/testcases/", 500, 200, Some("boom"))).unwrap();
    store.insert_log(new_log("/execution_results", 500, 300, Some("boom"))).unwrap();

    let failures = store
        .query_logs(&LogFilter {
            status_code: Some(500),
            ..LogFilter::default()
        })
        .unwrap();
    assert_eq!(failures.iter().map(|entry| entry.id).collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(failures[0].error.as_deref(), Some("boom"));

    let window = store
        .query_logs(&LogFilter {
            created_from: Some(Timestamp::from_unix_micros(150)),
            created_until: Some(Timestamp::from_unix_micros(250)),
            ..LogFilter::default()
        })
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, 2);

    let exact = store
        .query_logs(&LogFilter {
            endpoint_name: Some("/testcases/".to_string()),
            created_at: Some(Timestamp::from_unix_micros(100)),
            ..LogFilter::default()
        })
        .unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].status_code, 201);
}

#[test]
fn delete_journal_mode_is_supported() {
    let dir = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::new(dir.path().join("nested").join("ledger.db"));
    config.journal_mode = SqliteStoreMode::Delete;
    let store = SqliteLedgerStore::new(&config).unwrap();
    store.create_user(new_user("bob", Role::User)).unwrap();
    assert!(store.find_user("bob").unwrap().is_some());
}

#[test]
fn schema_version_mismatch_fails_closed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.db");
    drop(open(&path));
    let connection = Connection::open(&path).unwrap();
    connection.execute("UPDATE store_meta SET version = ?1", params![99]).unwrap();
    drop(connection);

    let Err(err) = SqliteLedgerStore::new(&SqliteStoreConfig::new(&path)) else {
        panic!("expected version mismatch");
    };
    assert!(matches!(err, SqliteStoreError::VersionMismatch(_)), "{err}");
}

#[test]
fn unknown_role_in_row_is_corruption() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.db");
    let store = open(&path);
    store.create_user(new_user("mallory", Role::User)).unwrap();
    let connection = Connection::open(&path).unwrap();
    connection
        .execute("UPDATE users SET role = 'superuser' WHERE username = ?1", params!["mallory"])
        .unwrap();
    drop(connection);

    let err = store.find_user("mallory").unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)), "{err}");
}

#[test]
fn directory_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let Err(err) = SqliteLedgerStore::new(&SqliteStoreConfig::new(dir.path())) else {
        panic!("expected invalid path");
    };
    assert!(matches!(err, SqliteStoreError::Invalid(_)), "{err}");
}
