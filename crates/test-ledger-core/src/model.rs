// crates/test-ledger-core/src/model.rs
// ============================================================================
// Module: Test Ledger Domain Model
// Description: Users, test cases, execution results and request log entries.
// Purpose: Define the records persisted by every ledger store.
// Dependencies: serde, crate::time
// ============================================================================

//! ## Overview
//! Records returned by a [`crate::LedgerStore`] carry a store-assigned `id` and
//! a `created_at` timestamp. Insert inputs (`New*`) carry the timestamp
//! supplied by the caller so stores stay deterministic.
//!
//! Invariants:
//! - Usernames are unique across users.
//! - Every execution result references an existing test case.
//! - Only test cases are deleted; deletion cascades to their results.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::time::Timestamp;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum username length in characters.
pub const MAX_USERNAME_LENGTH: usize = 50;
/// Maximum test case name length in characters.
pub const MAX_TEST_CASE_NAME_LENGTH: usize = 100;
/// Maximum execution result label length in characters.
pub const MAX_RESULT_LENGTH: usize = 50;
/// Maximum logged endpoint length in characters.
pub const MAX_ENDPOINT_NAME_LENGTH: usize = 100;
/// Maximum logged method length in characters.
pub const MAX_METHOD_LENGTH: usize = 10;

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May create, update and delete test cases and record results.
    Admin,
    /// Read-only access to test cases.
    User,
}

impl Role {
    /// Parses a role label. Only the exact lowercase labels are accepted.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    /// Returns the canonical role label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// Stored user account.
///
/// Not serializable so the password hash never leaves the process by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    /// Store-assigned identifier.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Encoded password hash.
    pub password_hash: String,
    /// Account role.
    pub role: Role,
    /// Creation time.
    pub created_at: Timestamp,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Insert input for a user account.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Unique login name.
    pub username: String,
    /// Encoded password hash.
    pub password_hash: String,
    /// Account role.
    pub role: Role,
    /// Creation time.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Test Cases
// ============================================================================

/// Stored test case definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Store-assigned identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
}

/// Mutable test case fields, used for both create and full-replace update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseFields {
    /// Display name.
    pub name: String,
    /// Optional free-form description; `None` clears it on update.
    pub description: Option<String>,
}

// ============================================================================
// SECTION: Execution Results
// ============================================================================

/// Stored execution outcome of a test case against a test asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Store-assigned identifier.
    pub id: i64,
    /// Referenced test case.
    pub test_case_id: i64,
    /// Caller-supplied asset identifier (not referentially checked).
    pub test_asset_id: i64,
    /// Free-form outcome label such as `passed` or `failed`.
    pub result: String,
    /// Creation time.
    pub created_at: Timestamp,
}

/// Insert input for an execution result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExecutionResult {
    /// Referenced test case.
    pub test_case_id: i64,
    /// Caller-supplied asset identifier.
    pub test_asset_id: i64,
    /// Outcome label.
    pub result: String,
    /// Creation time.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Request Log
// ============================================================================

/// Stored request log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Store-assigned identifier.
    pub id: i64,
    /// Request path.
    pub endpoint_name: String,
    /// HTTP method.
    pub method: String,
    /// Final response status.
    pub status_code: u16,
    /// Caller-facing error message, when the response was an error.
    pub error: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
}

/// Insert input for a request log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    /// Request path.
    pub endpoint_name: String,
    /// HTTP method.
    pub method: String,
    /// Final response status.
    pub status_code: u16,
    /// Caller-facing error message.
    pub error: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
}

/// Conjunctive filter over request log entries. Empty filter matches all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Exact endpoint match.
    pub endpoint_name: Option<String>,
    /// Exact status match.
    pub status_code: Option<i64>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<Timestamp>,
    /// Inclusive upper bound on `created_at`.
    pub created_until: Option<Timestamp>,
    /// Exact `created_at` match.
    pub created_at: Option<Timestamp>,
}

impl LogFilter {
    /// Returns true when the entry satisfies every populated criterion.
    #[must_use]
    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.endpoint_name.as_deref().is_none_or(|name| name == entry.endpoint_name)
            && self.status_code.is_none_or(|code| code == i64::from(entry.status_code))
            && self.created_from.is_none_or(|from| entry.created_at >= from)
            && self.created_until.is_none_or(|until| entry.created_at <= until)
            && self.created_at.is_none_or(|at| entry.created_at == at)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
