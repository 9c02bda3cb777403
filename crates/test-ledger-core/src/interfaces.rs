// crates/test-ledger-core/src/interfaces.rs
// ============================================================================
// Module: Test Ledger Interfaces
// Description: Persistence contract shared by every ledger backend.
// Purpose: Decouple request handling from the concrete storage engine.
// Dependencies: thiserror, crate::model
// ============================================================================

//! ## Overview
//! [`LedgerStore`] is the synchronous persistence boundary. Backends enforce
//! username uniqueness and the execution-result foreign key themselves so a
//! race between two writers still surfaces as [`StoreError::Conflict`] or
//! [`StoreError::MissingReference`]. All list operations return rows ordered
//! by ascending id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

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
// SECTION: Errors
// ============================================================================

/// Ledger store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("ledger store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("ledger store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("ledger store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("ledger store invalid data: {0}")]
    Invalid(String),
    /// A uniqueness constraint rejected the write.
    #[error("ledger store conflict: {0}")]
    Conflict(String),
    /// A referenced record does not exist.
    #[error("ledger store missing reference: {0}")]
    MissingReference(String),
    /// Store reported an error.
    #[error("ledger store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Ledger Store
// ============================================================================

/// Persistence contract for users, test cases, execution results and logs.
pub trait LedgerStore {
    /// Inserts a user and returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the username already exists.
    fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Looks up a user by exact username.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn find_user(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Lists every test case.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn list_test_cases(&self) -> Result<Vec<TestCase>, StoreError>;

    /// Loads one test case.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn get_test_case(&self, id: i64) -> Result<Option<TestCase>, StoreError>;

    /// Inserts a test case and returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_test_case(
        &self,
        fields: TestCaseFields,
        created_at: Timestamp,
    ) -> Result<TestCase, StoreError>;

    /// Replaces the mutable fields of a test case. Returns `None` when unknown.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn update_test_case(
        &self,
        id: i64,
        fields: TestCaseFields,
    ) -> Result<Option<TestCase>, StoreError>;

    /// Deletes a test case and its execution results. Returns `false` when unknown.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn delete_test_case(&self, id: i64) -> Result<bool, StoreError>;

    /// Inserts an execution result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingReference`] when the test case does not exist.
    fn insert_execution_result(
        &self,
        result: NewExecutionResult,
    ) -> Result<ExecutionResult, StoreError>;

    /// Lists execution results recorded against a test asset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn list_execution_results_for_asset(
        &self,
        test_asset_id: i64,
    ) -> Result<Vec<ExecutionResult>, StoreError>;

    /// Appends a request log entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_log(&self, entry: NewLogEntry) -> Result<LogEntry, StoreError>;

    /// Returns log entries matching every populated filter criterion.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn query_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, StoreError>;
}
