// crates/test-ledger-core/tests/in_memory_store.rs
// ============================================================================
// Module: In-Memory Ledger Store Tests
// Description: Behavioral checks for the in-memory ledger backend.
// Purpose: Prove uniqueness, foreign-key, cascade and filter semantics.
// ============================================================================

//! In-memory ledger store integration tests.

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

use test_ledger_core::InMemoryLedgerStore;
use test_ledger_core::LedgerStore;
use test_ledger_core::LogFilter;
use test_ledger_core::NewExecutionResult;
use test_ledger_core::NewLogEntry;
use test_ledger_core::NewUser;
use test_ledger_core::Role;
use test_ledger_core::SharedLedgerStore;
use test_ledger_core::StoreError;
use test_ledger_core::TestCaseFields;
use test_ledger_core::Timestamp;

/// Builds a user insert input.
fn new_user(username: &str, role: Role) -> NewUser {
    NewUser {
        username: username.to_string(),
        password_hash: "hash".to_string(),
        role,
        created_at: Timestamp::from_unix_micros(1),
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
fn new_result(test_case_id: i64, test_asset_id: i64, result: &str) -> NewExecutionResult {
    NewExecutionResult {
        test_case_id,
        test_asset_id,
        result: result.to_string(),
        created_at: Timestamp::from_unix_micros(2),
    }
}

/// Builds a log insert input.
fn new_log(endpoint: &str, status_code: u16, micros: i64) -> NewLogEntry {
    NewLogEntry {
        endpoint_name: endpoint.to_string(),
        method: "GET".to_string(),
        status_code,
        error: None,
        created_at: Timestamp::from_unix_micros(micros),
    }
}

#[test]
fn duplicate_username_is_a_conflict() {
    let store = InMemoryLedgerStore::new();
    let first = store.create_user(new_user("alice", Role::Admin)).unwrap();
    assert_eq!(first.id, 1);
    let err = store.create_user(new_user("alice", Role::User)).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
    let found = store.find_user("alice").unwrap().unwrap();
    assert_eq!(found.role, Role::Admin);
    assert!(store.find_user("bob").unwrap().is_none());
}

#[test]
fn test_case_crud_round() {
    let store = InMemoryLedgerStore::new();
    let created = store
        .insert_test_case(fields("Login", Some("checks login")), Timestamp::from_unix_micros(5))
        .unwrap();
    assert_eq!(created.id, 1);
    assert_eq!(store.get_test_case(1).unwrap(), Some(created));

    let updated = store.update_test_case(1, fields("Login v2", None)).unwrap().unwrap();
    assert_eq!(updated.name, "Login v2");
    assert_eq!(updated.description, None);
    assert!(store.update_test_case(9, fields("x", None)).unwrap().is_none());

    store.insert_test_case(fields("Logout", None), Timestamp::from_unix_micros(6)).unwrap();
    let ids: Vec<i64> = store.list_test_cases().unwrap().iter().map(|case| case.id).collect();
    assert_eq!(ids, vec![1, 2]);

    assert!(store.delete_test_case(1).unwrap());
    assert!(!store.delete_test_case(1).unwrap());
    assert!(store.get_test_case(1).unwrap().is_none());
}

#[test]
fn ids_are_not_reused_after_delete() {
    let store = InMemoryLedgerStore::new();
    store.insert_test_case(fields("a", None), Timestamp::from_unix_micros(1)).unwrap();
    store.delete_test_case(1).unwrap();
    let next = store.insert_test_case(fields("b", None), Timestamp::from_unix_micros(2)).unwrap();
    assert_eq!(next.id, 2);
}

#[test]
fn execution_result_requires_existing_test_case() {
    let store = InMemoryLedgerStore::new();
    let err = store.insert_execution_result(new_result(99, 10, "passed")).unwrap_err();
    assert!(matches!(err, StoreError::MissingReference(_)));
    assert!(store.list_execution_results_for_asset(10).unwrap().is_empty());
}

#[test]
fn deleting_a_test_case_cascades_to_results() {
    let store = InMemoryLedgerStore::new();
    store.insert_test_case(fields("a", None), Timestamp::from_unix_micros(1)).unwrap();
    store.insert_test_case(fields("b", None), Timestamp::from_unix_micros(1)).unwrap();
    store.insert_execution_result(new_result(1, 10, "passed")).unwrap();
    store.insert_execution_result(new_result(2, 10, "failed")).unwrap();
    store.insert_execution_result(new_result(1, 11, "passed")).unwrap();

    assert!(store.delete_test_case(1).unwrap());
    let remaining = store.list_execution_results_for_asset(10).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].test_case_id, 2);
    assert!(store.list_execution_results_for_asset(11).unwrap().is_empty());
}

#[test]
fn log_queries_filter_conjunctively() {
    let store = SharedLedgerStore::from_store(InMemoryLedgerStore::new());
    store.insert_log(new_log("/testcases/", 200, 10)).unwrap();
    store.insert_log(new_log("/testcases/", 500, 20)).unwrap();
    store.insert_log(new_log("/auth/login", 500, 30)).unwrap();

    let errors = store
        .query_logs(&LogFilter {
            status_code: Some(500),
            ..LogFilter::default()
        })
        .unwrap();
    assert_eq!(errors.iter().map(|entry| entry.id).collect::<Vec<_>>(), vec![2, 3]);

    let windowed = store
        .query_logs(&LogFilter {
            endpoint_name: Some("/testcases/".to_string()),
            created_from: Some(Timestamp::from_unix_micros(15)),
            ..LogFilter::default()
        })
        .unwrap();
    assert_eq!(windowed.len(), 1);
    assert_eq!(windowed[0].status_code, 500);

    assert_eq!(store.query_logs(&LogFilter::default()).unwrap().len(), 3);
}

#[test]
fn serialized_records_render_rfc3339_timestamps() {
    let store = InMemoryLedgerStore::new();
    let entry = store.insert_log(new_log("/", 200, 1_700_000_000_000_000)).unwrap();
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["created_at"], "2023-11-14T22:13:20Z");
    assert_eq!(json["error"], serde_json::Value::Null);
}
