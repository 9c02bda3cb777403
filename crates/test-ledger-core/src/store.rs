// crates/test-ledger-core/src/store.rs
// ============================================================================
// Module: Test Ledger In-Memory Store
// Description: Mutex-guarded in-memory ledger store and a shared store handle.
// Purpose: Provide a deterministic backend for tests and ephemeral servers.
// Dependencies: crate::interfaces, crate::model
// ============================================================================

//! ## Overview
//! [`InMemoryLedgerStore`] keeps every table behind one mutex so uniqueness,
//! foreign-key and cascade rules are checked atomically, mirroring what the
//! SQLite backend gets from the database. Data is lost when the process exits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::interfaces::LedgerStore;
use crate::interfaces::StoreError;
use crate::model::ExecutionResult;
use crate::model::LogEntry;
use crate::model::LogFilter;
use crate::model::NewExecutionResult;
use crate::model::NewLogEntry;
use crate::model::NewUser;
use crate::model::TestCase;
use crate::model::TestCaseFields;
use crate::model::User;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Tables
// ============================================================================

/// Table contents keyed by id; ids start at 1 and are never reused.
#[derive(Debug, Default)]
struct Tables {
    /// Users by id.
    users: BTreeMap<i64, User>,
    /// Test cases by id.
    test_cases: BTreeMap<i64, TestCase>,
    /// Execution results by id.
    execution_results: BTreeMap<i64, ExecutionResult>,
    /// Request log entries by id.
    logs: BTreeMap<i64, LogEntry>,
    /// Last assigned user id.
    last_user_id: i64,
    /// Last assigned test case id.
    last_test_case_id: i64,
    /// Last assigned execution result id.
    last_execution_result_id: i64,
    /// Last assigned log id.
    last_log_id: i64,
}

/// Advances an id sequence and returns the new id.
const fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory ledger store for tests and ephemeral deployments.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerStore {
    /// All tables protected by a single mutex.
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryLedgerStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the tables.
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Store("ledger store mutex poisoned".to_string()))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|existing| existing.username == user.username) {
            return Err(StoreError::Conflict(format!("username {} already exists", user.username)));
        }
        let id = next_id(&mut tables.last_user_id);
        let record = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            created_at: user.created_at,
        };
        tables.users.insert(id, record.clone());
        Ok(record)
    }

    fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.users.values().find(|user| user.username == username).cloned())
    }

    fn list_test_cases(&self) -> Result<Vec<TestCase>, StoreError> {
        Ok(self.lock()?.test_cases.values().cloned().collect())
    }

    fn get_test_case(&self, id: i64) -> Result<Option<TestCase>, StoreError> {
        Ok(self.lock()?.test_cases.get(&id).cloned())
    }

    fn insert_test_case(
        &self,
        fields: TestCaseFields,
        created_at: Timestamp,
    ) -> Result<TestCase, StoreError> {
        let mut tables = self.lock()?;
        let id = next_id(&mut tables.last_test_case_id);
        let record = TestCase {
            id,
            name: fields.name,
            description: fields.description,
            created_at,
        };
        tables.test_cases.insert(id, record.clone());
        Ok(record)
    }

    fn update_test_case(
        &self,
        id: i64,
        fields: TestCaseFields,
    ) -> Result<Option<TestCase>, StoreError> {
        let mut tables = self.lock()?;
        let Some(record) = tables.test_cases.get_mut(&id) else {
            return Ok(None);
        };
        record.name = fields.name;
        record.description = fields.description;
        Ok(Some(record.clone()))
    }

    fn delete_test_case(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        if tables.test_cases.remove(&id).is_none() {
            return Ok(false);
        }
        tables.execution_results.retain(|_, result| result.test_case_id != id);
        Ok(true)
    }

    fn insert_execution_result(
        &self,
        result: NewExecutionResult,
    ) -> Result<ExecutionResult, StoreError> {
        let mut tables = self.lock()?;
        if !tables.test_cases.contains_key(&result.test_case_id) {
            return Err(StoreError::MissingReference(format!(
                "test case {} does not exist",
                result.test_case_id
            )));
        }
        let id = next_id(&mut tables.last_execution_result_id);
        let record = ExecutionResult {
            id,
            test_case_id: result.test_case_id,
            test_asset_id: result.test_asset_id,
            result: result.result,
            created_at: result.created_at,
        };
        tables.execution_results.insert(id, record.clone());
        Ok(record)
    }

    fn list_execution_results_for_asset(
        &self,
        test_asset_id: i64,
    ) -> Result<Vec<ExecutionResult>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .execution_results
            .values()
            .filter(|result| result.test_asset_id == test_asset_id)
            .cloned()
            .collect())
    }

    fn insert_log(&self, entry: NewLogEntry) -> Result<LogEntry, StoreError> {
        let mut tables = self.lock()?;
        let id = next_id(&mut tables.last_log_id);
        let record = LogEntry {
            id,
            endpoint_name: entry.endpoint_name,
            method: entry.method,
            status_code: entry.status_code,
            error: entry.error,
            created_at: entry.created_at,
        };
        tables.logs.insert(id, record.clone());
        Ok(record)
    }

    fn query_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.logs.values().filter(|entry| filter.matches(entry)).cloned().collect())
    }
}

// ============================================================================
// SECTION: Shared Store
// ============================================================================

/// Shared ledger store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedLedgerStore {
    /// Inner store implementation.
    inner: Arc<dyn LedgerStore + Send + Sync>,
}

impl SharedLedgerStore {
    /// Wraps a ledger store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl LedgerStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }
}

impl LedgerStore for SharedLedgerStore {
    fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.inner.create_user(user)
    }

    fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user(username)
    }

    fn list_test_cases(&self) -> Result<Vec<TestCase>, StoreError> {
        self.inner.list_test_cases()
    }

    fn get_test_case(&self, id: i64) -> Result<Option<TestCase>, StoreError> {
        self.inner.get_test_case(id)
    }

    fn insert_test_case(
        &self,
        fields: TestCaseFields,
        created_at: Timestamp,
    ) -> Result<TestCase, StoreError> {
        self.inner.insert_test_case(fields, created_at)
    }

    fn update_test_case(
        &self,
        id: i64,
        fields: TestCaseFields,
    ) -> Result<Option<TestCase>, StoreError> {
        self.inner.update_test_case(id, fields)
    }

    fn delete_test_case(&self, id: i64) -> Result<bool, StoreError> {
        self.inner.delete_test_case(id)
    }

    fn insert_execution_result(
        &self,
        result: NewExecutionResult,
    ) -> Result<ExecutionResult, StoreError> {
        self.inner.insert_execution_result(result)
    }

    fn list_execution_results_for_asset(
        &self,
        test_asset_id: i64,
    ) -> Result<Vec<ExecutionResult>, StoreError> {
        self.inner.list_execution_results_for_asset(test_asset_id)
    }

    fn insert_log(&self, entry: NewLogEntry) -> Result<LogEntry, StoreError> {
        self.inner.insert_log(entry)
    }

    fn query_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, StoreError> {
        self.inner.query_logs(filter)
    }
}
