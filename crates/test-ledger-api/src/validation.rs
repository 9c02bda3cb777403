// crates/test-ledger-api/src/validation.rs
// ============================================================================
// Module: Request Validation
// Description: Parsing of JSON bodies and query filters into typed inputs.
// Purpose: Reject malformed input before any store access.
// Dependencies: serde_json, test-ledger-core
// ============================================================================

//! ## Overview
//! Bodies are parsed into a JSON object first, then each operation pulls its
//! fields out with the exact messages callers rely on. Nothing here touches
//! the store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Map;
use serde_json::Value;
use test_ledger_core::LogFilter;
use test_ledger_core::MAX_RESULT_LENGTH;
use test_ledger_core::MAX_TEST_CASE_NAME_LENGTH;
use test_ledger_core::MAX_USERNAME_LENGTH;
use test_ledger_core::Role;
use test_ledger_core::TestCaseFields;
use test_ledger_core::Timestamp;

use crate::error::ApiError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// JSON object body.
pub type JsonObject = Map<String, Value>;

/// Validated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterInput {
    /// Requested username.
    pub username: String,
    /// Plaintext password.
    pub password: String,
    /// Requested role.
    pub role: Role,
}

/// Validated login input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginInput {
    /// Username.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// Validated execution result input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResultInput {
    /// Referenced test case id.
    pub test_case_id: i64,
    /// Asset id.
    pub test_asset_id: i64,
    /// Outcome label.
    pub result: String,
}

// ============================================================================
// SECTION: Bodies
// ============================================================================

/// Parses a request body as a JSON object.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] when the body is not a JSON object.
pub fn parse_object(body: &[u8]) -> Result<JsonObject, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        _ => Err(ApiError::Validation("Request body must be a JSON object".to_string())),
    }
}

/// Returns the string value under `key`, if present and a string.
fn string_field<'a>(body: &'a JsonObject, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str)
}

/// Validates a registration body.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] for missing fields, an unknown role, or
/// out-of-range username/password.
pub fn register_input(body: &JsonObject) -> Result<RegisterInput, ApiError> {
    let (Some(username), Some(password), Some(role)) = (
        string_field(body, "username"),
        string_field(body, "password"),
        string_field(body, "role"),
    ) else {
        return Err(ApiError::Validation(
            "Username, password, and role are required fields".to_string(),
        ));
    };
    let role = Role::parse(role)
        .ok_or_else(|| ApiError::Validation("Role must be 'admin' or 'user'".to_string()))?;
    let length = username.chars().count();
    if length == 0 || length > MAX_USERNAME_LENGTH {
        return Err(ApiError::Validation(format!(
            "Username must be between 1 and {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if password.is_empty() {
        return Err(ApiError::Validation("Password must not be empty".to_string()));
    }
    Ok(RegisterInput {
        username: username.to_string(),
        password: password.to_string(),
        role,
    })
}

/// Validates a login body.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] when either field is missing.
pub fn login_input(body: &JsonObject) -> Result<LoginInput, ApiError> {
    let (Some(username), Some(password)) =
        (string_field(body, "username"), string_field(body, "password"))
    else {
        return Err(ApiError::Validation("Username and password are required fields".to_string()));
    };
    Ok(LoginInput {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Validates a test case body for create or update.
///
/// An update with an empty object is rejected outright. An absent or null
/// description is stored as none.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] for an invalid name or description.
pub fn test_case_fields(body: &JsonObject, for_update: bool) -> Result<TestCaseFields, ApiError> {
    if for_update && body.is_empty() {
        return Err(ApiError::Validation("No data provided for update".to_string()));
    }
    let name = string_field(body, "name")
        .filter(|name| !name.trim().is_empty() && name.chars().count() <= MAX_TEST_CASE_NAME_LENGTH)
        .ok_or_else(|| ApiError::Validation("Invalid name provided for test case".to_string()))?;
    let description = match body.get("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(description)) => Some(description.clone()),
        Some(_) => {
            return Err(ApiError::Validation(
                "Invalid description provided for test case".to_string(),
            ));
        }
    };
    Ok(TestCaseFields {
        name: name.to_string(),
        description,
    })
}

/// Validates an execution result body.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] for missing or mistyped fields.
pub fn execution_result_input(body: &JsonObject) -> Result<ExecutionResultInput, ApiError> {
    let (Some(test_case_id), Some(test_asset_id), Some(result)) =
        (body.get("test_case_id"), body.get("test_asset_id"), body.get("result"))
    else {
        return Err(ApiError::Validation(
            "Missing required fields: test_case_id, test_asset_id, result".to_string(),
        ));
    };
    let (Some(test_case_id), Some(test_asset_id)) = (test_case_id.as_i64(), test_asset_id.as_i64())
    else {
        return Err(ApiError::Validation(
            "test_case_id and test_asset_id must be integers".to_string(),
        ));
    };
    let result = result
        .as_str()
        .filter(|result| result.chars().count() <= MAX_RESULT_LENGTH)
        .ok_or_else(|| {
            ApiError::Validation(format!(
                "result must be a string of at most {MAX_RESULT_LENGTH} characters"
            ))
        })?;
    Ok(ExecutionResultInput {
        test_case_id,
        test_asset_id,
        result: result.to_string(),
    })
}

// ============================================================================
// SECTION: Query Filters
// ============================================================================

/// Parses one time filter value.
fn time_filter(params: &BTreeMap<String, String>, key: &str) -> Result<Option<Timestamp>, ApiError> {
    match params.get(key).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => Timestamp::parse_iso8601(value).map(Some).map_err(|_| {
            ApiError::Validation(format!(
                "Invalid date format for {key}. Please provide date in ISO 8601 format"
            ))
        }),
    }
}

/// Builds a log filter from query parameters; empty values are ignored.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] for a non-integer status code or a
/// malformed timestamp.
pub fn log_filter(params: &BTreeMap<String, String>) -> Result<LogFilter, ApiError> {
    let endpoint_name = params.get("endpoint_name").filter(|value| !value.is_empty()).cloned();
    let status_code = match params.get("status_code").filter(|value| !value.is_empty()) {
        None => None,
        Some(value) => Some(
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| ApiError::Validation("Invalid status_code filter".to_string()))?,
        ),
    };
    Ok(LogFilter {
        endpoint_name,
        status_code,
        created_from: time_filter(params, "time[gte]")?,
        created_until: time_filter(params, "time[lte]")?,
        created_at: time_filter(params, "time")?,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
