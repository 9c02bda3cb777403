// crates/test-ledger-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Ledger Store
// Description: Durable LedgerStore backed by SQLite.
// Purpose: Persist ledger tables with database-enforced integrity rules.
// Dependencies: test-ledger-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`LedgerStore`] on a single `SQLite` connection
//! guarded by a mutex. Timestamps are stored as integer unix microseconds so
//! log range filters are plain integer comparisons. Rows read back from the
//! database are untrusted: unknown roles or out-of-range status codes fail as
//! corruption instead of being coerced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use serde::Deserialize;
use test_ledger_core::ExecutionResult;
use test_ledger_core::LedgerStore;
use test_ledger_core::LogEntry;
use test_ledger_core::LogFilter;
use test_ledger_core::NewExecutionResult;
use test_ledger_core::NewLogEntry;
use test_ledger_core::NewUser;
use test_ledger_core::Role;
use test_ledger_core::StoreError;
use test_ledger_core::TestCase;
use test_ledger_core::TestCaseFields;
use test_ledger_core::Timestamp;
use test_ledger_core::User;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Column list for user reads.
const USER_COLUMNS: &str = "id, username, password_hash, role, created_at";
/// Column list for test case reads.
const TEST_CASE_COLUMNS: &str = "id, name, description, created_at";
/// Column list for execution result reads.
const EXECUTION_RESULT_COLUMNS: &str = "id, test_case_id, test_asset_id, result, created_at";
/// Column list for log reads.
const LOG_COLUMNS: &str = "id, endpoint_name, method, status_code, error, created_at";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` ledger store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config for `path` with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row fails integrity checks.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Unique constraint violation.
    #[error("sqlite store unique constraint violated: {0}")]
    Unique(String),
    /// Foreign key constraint violation.
    #[error("sqlite store foreign key violated: {0}")]
    ForeignKey(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Unique(message) => Self::Conflict(message),
            SqliteStoreError::ForeignKey(message) => Self::MissingReference(message),
        }
    }
}

/// Classifies an engine error, separating constraint violations.
fn db_error(err: &rusqlite::Error) -> SqliteStoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = err {
        match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return SqliteStoreError::Unique(err.to_string());
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return SqliteStoreError::ForeignKey(err.to_string());
            }
            _ => {}
        }
    }
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed ledger store.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteLedgerStore {
    /// Opens (creating if needed) an `SQLite`-backed ledger store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized, or carries an incompatible schema version.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Inserts a user row.
    fn insert_user(&self, user: NewUser) -> Result<User, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO users (username, password_hash, role, created_at) VALUES (?1, ?2, \
                 ?3, ?4)",
                params![
                    user.username,
                    user.password_hash,
                    user.role.as_str(),
                    user.created_at.as_unix_micros()
                ],
            )
            .map_err(|err| db_error(&err))?;
        let id = guard.last_insert_rowid();
        drop(guard);
        Ok(User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            created_at: user.created_at,
        })
    }

    /// Loads a user row by username.
    fn select_user(&self, username: &str) -> Result<Option<User>, SqliteStoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username],
                read_user_row,
            )
            .optional()
            .map_err(|err| db_error(&err))?;
        drop(guard);
        row.map(UserRow::into_user).transpose()
    }

    /// Loads every test case row.
    fn select_test_cases(&self) -> Result<Vec<TestCase>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(&format!("SELECT {TEST_CASE_COLUMNS} FROM test_cases ORDER BY id"))
            .map_err(|err| db_error(&err))?;
        let rows = statement
            .query_map(params![], read_test_case_row)
            .map_err(|err| db_error(&err))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| db_error(&err))?;
        Ok(rows)
    }

    /// Loads one test case row.
    fn select_test_case(&self, id: i64) -> Result<Option<TestCase>, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                &format!("SELECT {TEST_CASE_COLUMNS} FROM test_cases WHERE id = ?1"),
                params![id],
                read_test_case_row,
            )
            .optional()
            .map_err(|err| db_error(&err))
    }

    /// Inserts a test case row.
    fn insert_test_case_row(
        &self,
        fields: TestCaseFields,
        created_at: Timestamp,
    ) -> Result<TestCase, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO test_cases (name, description, created_at) VALUES (?1, ?2, ?3)",
                params![fields.name, fields.description, created_at.as_unix_micros()],
            )
            .map_err(|err| db_error(&err))?;
        let id = guard.last_insert_rowid();
        drop(guard);
        Ok(TestCase {
            id,
            name: fields.name,
            description: fields.description,
            created_at,
        })
    }

    /// Replaces a test case row's mutable fields.
    fn update_test_case_row(
        &self,
        id: i64,
        fields: TestCaseFields,
    ) -> Result<Option<TestCase>, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| db_error(&err))?;
        let changed = tx
            .execute(
                "UPDATE test_cases SET name = ?1, description = ?2 WHERE id = ?3",
                params![fields.name, fields.description, id],
            )
            .map_err(|err| db_error(&err))?;
        let updated = if changed == 0 {
            None
        } else {
            Some(
                tx.query_row(
                    &format!("SELECT {TEST_CASE_COLUMNS} FROM test_cases WHERE id = ?1"),
                    params![id],
                    read_test_case_row,
                )
                .map_err(|err| db_error(&err))?,
            )
        };
        tx.commit().map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(updated)
    }

    /// Deletes a test case row; results cascade through the foreign key.
    fn delete_test_case_row(&self, id: i64) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute("DELETE FROM test_cases WHERE id = ?1", params![id])
            .map_err(|err| db_error(&err))?;
        Ok(changed > 0)
    }

    /// Inserts an execution result row.
    fn insert_execution_result_row(
        &self,
        result: NewExecutionResult,
    ) -> Result<ExecutionResult, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO execution_results (test_case_id, test_asset_id, result, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    result.test_case_id,
                    result.test_asset_id,
                    result.result,
                    result.created_at.as_unix_micros()
                ],
            )
            .map_err(|err| db_error(&err))?;
        let id = guard.last_insert_rowid();
        drop(guard);
        Ok(ExecutionResult {
            id,
            test_case_id: result.test_case_id,
            test_asset_id: result.test_asset_id,
            result: result.result,
            created_at: result.created_at,
        })
    }

    /// Loads execution result rows for one asset.
    fn select_execution_results(
        &self,
        test_asset_id: i64,
    ) -> Result<Vec<ExecutionResult>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(&format!(
                "SELECT {EXECUTION_RESULT_COLUMNS} FROM execution_results WHERE test_asset_id = \
                 ?1 ORDER BY id"
            ))
            .map_err(|err| db_error(&err))?;
        let rows = statement
            .query_map(params![test_asset_id], read_execution_result_row)
            .map_err(|err| db_error(&err))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| db_error(&err))?;
        Ok(rows)
    }

    /// Inserts a log row.
    fn insert_log_row(&self, entry: NewLogEntry) -> Result<LogEntry, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO request_logs (endpoint_name, method, status_code, error, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.endpoint_name,
                    entry.method,
                    entry.status_code,
                    entry.error,
                    entry.created_at.as_unix_micros()
                ],
            )
            .map_err(|err| db_error(&err))?;
        let id = guard.last_insert_rowid();
        drop(guard);
        Ok(LogEntry {
            id,
            endpoint_name: entry.endpoint_name,
            method: entry.method,
            status_code: entry.status_code,
            error: entry.error,
            created_at: entry.created_at,
        })
    }

    /// Loads log rows matching the filter.
    fn select_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, SqliteStoreError> {
        let (clause, values) = log_filter_clause(filter);
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(&format!("SELECT {LOG_COLUMNS} FROM request_logs{clause} ORDER BY id"))
            .map_err(|err| db_error(&err))?;
        let rows = statement
            .query_map(params_from_iter(values), read_log_row)
            .map_err(|err| db_error(&err))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| db_error(&err))?;
        drop(statement);
        drop(guard);
        rows.into_iter().map(LogRow::into_entry).collect()
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.insert_user(user).map_err(StoreError::from)
    }

    fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.select_user(username).map_err(StoreError::from)
    }

    fn list_test_cases(&self) -> Result<Vec<TestCase>, StoreError> {
        self.select_test_cases().map_err(StoreError::from)
    }

    fn get_test_case(&self, id: i64) -> Result<Option<TestCase>, StoreError> {
        self.select_test_case(id).map_err(StoreError::from)
    }

    fn insert_test_case(
        &self,
        fields: TestCaseFields,
        created_at: Timestamp,
    ) -> Result<TestCase, StoreError> {
        self.insert_test_case_row(fields, created_at).map_err(StoreError::from)
    }

    fn update_test_case(
        &self,
        id: i64,
        fields: TestCaseFields,
    ) -> Result<Option<TestCase>, StoreError> {
        self.update_test_case_row(id, fields).map_err(StoreError::from)
    }

    fn delete_test_case(&self, id: i64) -> Result<bool, StoreError> {
        self.delete_test_case_row(id).map_err(StoreError::from)
    }

    fn insert_execution_result(
        &self,
        result: NewExecutionResult,
    ) -> Result<ExecutionResult, StoreError> {
        self.insert_execution_result_row(result).map_err(StoreError::from)
    }

    fn list_execution_results_for_asset(
        &self,
        test_asset_id: i64,
    ) -> Result<Vec<ExecutionResult>, StoreError> {
        self.select_execution_results(test_asset_id).map_err(StoreError::from)
    }

    fn insert_log(&self, entry: NewLogEntry) -> Result<LogEntry, StoreError> {
        self.insert_log_row(entry).map_err(StoreError::from)
    }

    fn query_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, StoreError> {
        self.select_logs(filter).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// User row prior to role validation.
struct UserRow {
    /// Row id.
    id: i64,
    /// Username.
    username: String,
    /// Encoded password hash.
    password_hash: String,
    /// Raw role label.
    role: String,
    /// Creation time in unix micros.
    created_at: i64,
}

impl UserRow {
    /// Validates the role label and builds the domain record.
    fn into_user(self) -> Result<User, SqliteStoreError> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("unknown role for user {}", self.id))
        })?;
        Ok(User {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            role,
            created_at: Timestamp::from_unix_micros(self.created_at),
        })
    }
}

/// Log row prior to status validation.
struct LogRow {
    /// Row id.
    id: i64,
    /// Request path.
    endpoint_name: String,
    /// HTTP method.
    method: String,
    /// Raw status code.
    status_code: i64,
    /// Error note.
    error: Option<String>,
    /// Creation time in unix micros.
    created_at: i64,
}

impl LogRow {
    /// Validates the status code and builds the domain record.
    fn into_entry(self) -> Result<LogEntry, SqliteStoreError> {
        let status_code = u16::try_from(self.status_code).map_err(|_| {
            SqliteStoreError::Corrupt(format!("invalid status code for log {}", self.id))
        })?;
        Ok(LogEntry {
            id: self.id,
            endpoint_name: self.endpoint_name,
            method: self.method,
            status_code,
            error: self.error,
            created_at: Timestamp::from_unix_micros(self.created_at),
        })
    }
}

/// Reads a user row.
fn read_user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Reads a test case row.
fn read_test_case_row(row: &Row<'_>) -> rusqlite::Result<TestCase> {
    Ok(TestCase {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: Timestamp::from_unix_micros(row.get(3)?),
    })
}

/// Reads an execution result row.
fn read_execution_result_row(row: &Row<'_>) -> rusqlite::Result<ExecutionResult> {
    Ok(ExecutionResult {
        id: row.get(0)?,
        test_case_id: row.get(1)?,
        test_asset_id: row.get(2)?,
        result: row.get(3)?,
        created_at: Timestamp::from_unix_micros(row.get(4)?),
    })
}

/// Reads a log row.
fn read_log_row(row: &Row<'_>) -> rusqlite::Result<LogRow> {
    Ok(LogRow {
        id: row.get(0)?,
        endpoint_name: row.get(1)?,
        method: row.get(2)?,
        status_code: row.get(3)?,
        error: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Builds the `WHERE` clause and bound values for a log filter.
fn log_filter_clause(filter: &LogFilter) -> (String, Vec<Value>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    let mut push = |column_test: &str, value: Value| {
        values.push(value);
        conditions.push(format!("{column_test} ?{}", values.len()));
    };
    if let Some(endpoint_name) = &filter.endpoint_name {
        push("endpoint_name =", Value::Text(endpoint_name.clone()));
    }
    if let Some(status_code) = filter.status_code {
        push("status_code =", Value::Integer(status_code));
    }
    if let Some(from) = filter.created_from {
        push("created_at >=", Value::Integer(from.as_unix_micros()));
    }
    if let Some(until) = filter.created_until {
        push("created_at <=", Value::Integer(until.as_unix_micros()));
    }
    if let Some(at) = filter.created_at {
        push("created_at =", Value::Integer(at.as_unix_micros()));
    }
    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for integrity and durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL,
                    role TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS test_cases (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT,
                    created_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS execution_results (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    test_case_id INTEGER NOT NULL,
                    test_asset_id INTEGER NOT NULL,
                    result TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    FOREIGN KEY (test_case_id) REFERENCES test_cases(id) ON DELETE CASCADE
                );
                CREATE INDEX IF NOT EXISTS idx_execution_results_asset
                    ON execution_results (test_asset_id);
                CREATE TABLE IF NOT EXISTS request_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    endpoint_name TEXT NOT NULL,
                    method TEXT NOT NULL,
                    status_code INTEGER NOT NULL,
                    error TEXT,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_request_logs_created_at
                    ON request_logs (created_at);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
