// crates/test-ledger-api/src/service.rs
// ============================================================================
// Module: Ledger Service
// Description: Operation logic behind every HTTP route.
// Purpose: Apply policy, validation and store calls in a fixed order.
// Dependencies: test-ledger-core, crate::{auth, identity, validation}
// ============================================================================

//! ## Overview
//! [`LedgerService`] owns the store handle, the identity primitives, the
//! access settings and the start instant. Each operation authorizes first,
//! then validates its body, then touches the store, so a denied caller never
//! learns whether a record exists or a body is well formed.
//!
//! Store calls are synchronous; handlers run them through [`run_blocking`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;
use std::time::Instant;

use test_ledger_core::ExecutionResult;
use test_ledger_core::LedgerStore;
use test_ledger_core::LogEntry;
use test_ledger_core::NewExecutionResult;
use test_ledger_core::NewUser;
use test_ledger_core::SharedLedgerStore;
use test_ledger_core::StoreError;
use test_ledger_core::TestCase;
use test_ledger_core::Timestamp;

use crate::auth::AccessPolicy;
use crate::auth::Identity;
use crate::auth::RequestContext;
use crate::auth::authorize;
use crate::error::ApiError;
use crate::identity::IdentityError;
use crate::identity::PasswordHasher;
use crate::identity::TokenIssuer;
use crate::validation;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message for unknown test cases.
const TEST_CASE_NOT_FOUND: &str = "Test case not found";
/// Message for failed logins.
const INVALID_CREDENTIALS: &str = "Invalid username or password";

// ============================================================================
// SECTION: Blocking Helper
// ============================================================================

/// Runs a synchronous store call without stalling the async executor.
///
/// Uses `block_in_place` on the multi-thread runtime and calls directly
/// otherwise.
pub fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Access and cookie settings for the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Policy guarding the log query.
    pub log_access: AccessPolicy,
    /// Cookie consulted when no authorization header is present.
    pub cookie_name: String,
}

/// Ledger operations shared by all handlers.
pub struct LedgerService {
    /// Persistence backend.
    store: SharedLedgerStore,
    /// Password hasher.
    passwords: PasswordHasher,
    /// Token issuer and verifier.
    tokens: TokenIssuer,
    /// Access and cookie settings.
    settings: ServiceSettings,
    /// Instant the service was created.
    started_at: Instant,
}

impl LedgerService {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(
        store: SharedLedgerStore,
        passwords: PasswordHasher,
        tokens: TokenIssuer,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            passwords,
            tokens,
            settings,
            started_at: Instant::now(),
        }
    }

    /// Returns the store handle.
    #[must_use]
    pub const fn store(&self) -> &SharedLedgerStore {
        &self.store
    }

    /// Returns the home-route status line.
    #[must_use]
    pub fn status_message(&self) -> String {
        format!("The server is up and running for {}", format_uptime(self.started_at.elapsed()))
    }

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------

    /// Registers a user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for bad input and
    /// [`ApiError::Conflict`] when the username is taken.
    pub fn register(&self, body: Result<&[u8], ApiError>) -> Result<(), ApiError> {
        let body = validation::parse_object(body?)?;
        let input = validation::register_input(&body)?;
        if self.store.find_user(&input.username)?.is_some() {
            return Err(username_taken());
        }
        let password_hash = self
            .passwords
            .hash(&input.password)
            .map_err(|err| ApiError::Internal(err.to_string()))?;
        let user = NewUser {
            username: input.username,
            password_hash,
            role: input.role,
            created_at: Timestamp::now(),
        };
        match self.store.create_user(user) {
            Ok(user) => {
                tracing::info!(user = %user.username, role = %user.role, "user registered");
                Ok(())
            }
            Err(StoreError::Conflict(_)) => Err(username_taken()),
            Err(err) => Err(err.into()),
        }
    }

    /// Verifies credentials and issues a token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] for an unknown user or a wrong password.
    pub fn login(&self, body: Result<&[u8], ApiError>) -> Result<String, ApiError> {
        let body = validation::parse_object(body?)?;
        let input = validation::login_input(&body)?;
        let Some(user) = self.store.find_user(&input.username)? else {
            return Err(ApiError::Auth(INVALID_CREDENTIALS.to_string()));
        };
        let verified = self
            .passwords
            .verify(&input.password, &user.password_hash)
            .map_err(|err| ApiError::Internal(err.to_string()))?;
        if !verified {
            return Err(ApiError::Auth(INVALID_CREDENTIALS.to_string()));
        }
        self.tokens
            .issue(&user.username, now_secs())
            .map_err(|err| ApiError::Internal(err.to_string()))
    }

    /// Resolves the presented token to an identity.
    ///
    /// Returns `None` when no token is presented.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] when a token is present but invalid,
    /// expired, or names an unknown user.
    pub fn authenticate(&self, context: &RequestContext) -> Result<Option<Identity>, ApiError> {
        let Some(token) = context.token(&self.settings.cookie_name)? else {
            return Ok(None);
        };
        let claims = self.tokens.verify(&token, now_secs()).map_err(|err| match err {
            IdentityError::Expired => ApiError::Auth("Token has expired".to_string()),
            _ => ApiError::Auth("Invalid token".to_string()),
        })?;
        let Some(user) = self.store.find_user(&claims.sub)? else {
            return Err(ApiError::Auth("Invalid token".to_string()));
        };
        Ok(Some(Identity {
            user_id: user.id,
            username: user.username,
            role: user.role,
        }))
    }

    // ------------------------------------------------------------------------
    // Test Cases
    // ------------------------------------------------------------------------

    /// Lists all test cases.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] without an identity.
    pub fn list_test_cases(&self, identity: Option<&Identity>) -> Result<Vec<TestCase>, ApiError> {
        authorize(identity, AccessPolicy::Authenticated, "")?;
        Ok(self.store.list_test_cases()?)
    }

    /// Fetches one test case.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    pub fn get_test_case(&self, identity: Option<&Identity>, id: i64) -> Result<TestCase, ApiError> {
        authorize(identity, AccessPolicy::Authenticated, "")?;
        self.store.get_test_case(id)?.ok_or_else(test_case_not_found)
    }

    /// Creates a test case.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] for non-admins and
    /// [`ApiError::Validation`] for bad input.
    pub fn create_test_case(
        &self,
        identity: Option<&Identity>,
        body: Result<&[u8], ApiError>,
    ) -> Result<TestCase, ApiError> {
        authorize(identity, AccessPolicy::Admin, "Only admins can create test cases")?;
        let body = validation::parse_object(body?)?;
        let fields = validation::test_case_fields(&body, false)?;
        let test_case = self.store.insert_test_case(fields, Timestamp::now())?;
        tracing::info!(test_case = test_case.id, "test case created");
        Ok(test_case)
    }

    /// Replaces the fields of a test case.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] for non-admins, [`ApiError::NotFound`] for
    /// an unknown id and [`ApiError::Validation`] for bad input, in that
    /// order.
    pub fn update_test_case(
        &self,
        identity: Option<&Identity>,
        id: i64,
        body: Result<&[u8], ApiError>,
    ) -> Result<TestCase, ApiError> {
        authorize(identity, AccessPolicy::Admin, "Only admins can update test cases")?;
        if self.store.get_test_case(id)?.is_none() {
            return Err(test_case_not_found());
        }
        let body = validation::parse_object(body?)?;
        let fields = validation::test_case_fields(&body, true)?;
        self.store.update_test_case(id, fields)?.ok_or_else(test_case_not_found)
    }

    /// Deletes a test case and its execution results.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] for non-admins and [`ApiError::NotFound`]
    /// for an unknown id.
    pub fn delete_test_case(&self, identity: Option<&Identity>, id: i64) -> Result<(), ApiError> {
        authorize(identity, AccessPolicy::Admin, "Only admins can delete test cases")?;
        if self.store.delete_test_case(id)? {
            tracing::info!(test_case = id, "test case deleted");
            Ok(())
        } else {
            Err(test_case_not_found())
        }
    }

    // ------------------------------------------------------------------------
    // Execution Results
    // ------------------------------------------------------------------------

    /// Records an execution result.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] for non-admins, [`ApiError::Validation`]
    /// for bad input and [`ApiError::NotFound`] when the test case is
    /// unknown.
    pub fn record_execution_result(
        &self,
        identity: Option<&Identity>,
        body: Result<&[u8], ApiError>,
    ) -> Result<ExecutionResult, ApiError> {
        authorize(identity, AccessPolicy::Admin, "Unauthorized to record execution results")?;
        let body = validation::parse_object(body?)?;
        let input = validation::execution_result_input(&body)?;
        if self.store.get_test_case(input.test_case_id)?.is_none() {
            return Err(test_case_not_found());
        }
        let result = NewExecutionResult {
            test_case_id: input.test_case_id,
            test_asset_id: input.test_asset_id,
            result: input.result,
            created_at: Timestamp::now(),
        };
        match self.store.insert_execution_result(result) {
            Ok(result) => Ok(result),
            Err(StoreError::MissingReference(_)) => Err(test_case_not_found()),
            Err(err) => Err(err.into()),
        }
    }

    /// Lists the execution results of a test asset. Identity is optional.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the asset has no results.
    pub fn execution_results_for_asset(
        &self,
        identity: Option<&Identity>,
        test_asset_id: i64,
    ) -> Result<Vec<ExecutionResult>, ApiError> {
        authorize(identity, AccessPolicy::Public, "")?;
        let results = self.store.list_execution_results_for_asset(test_asset_id)?;
        if results.is_empty() {
            return Err(ApiError::NotFound(
                "No execution results found for the specified test asset".to_string(),
            ));
        }
        Ok(results)
    }

    // ------------------------------------------------------------------------
    // Request Logs
    // ------------------------------------------------------------------------

    /// Resolves the identity needed for the log query.
    ///
    /// A public log policy never reads the presented credentials, so stale
    /// or malformed tokens do not block the query.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] when the policy needs an identity and the
    /// presented token is invalid.
    pub fn log_identity(&self, context: &RequestContext) -> Result<Option<Identity>, ApiError> {
        match self.settings.log_access {
            AccessPolicy::Public => Ok(None),
            AccessPolicy::Authenticated | AccessPolicy::Admin => self.authenticate(context),
        }
    }

    /// Queries the request log with filters taken from query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] when the configured policy denies the
    /// caller and [`ApiError::Validation`] for malformed filters.
    pub fn query_logs(
        &self,
        identity: Option<&Identity>,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<LogEntry>, ApiError> {
        authorize(identity, self.settings.log_access, "Only admins can view request logs")?;
        let filter = validation::log_filter(params)?;
        Ok(self.store.query_logs(&filter)?)
    }
}

/// Builds the duplicate-username error.
fn username_taken() -> ApiError {
    ApiError::Conflict("Username already exists".to_string())
}

/// Builds the unknown-test-case error.
fn test_case_not_found() -> ApiError {
    ApiError::NotFound(TEST_CASE_NOT_FOUND.to_string())
}

/// Returns the current unix time in seconds.
fn now_secs() -> i64 {
    Timestamp::now().as_unix_micros().div_euclid(1_000_000)
}

/// Renders an uptime as `H:MM:SS.ffffff`, prefixed by `N day(s), `.
///
/// The microsecond fraction is always rendered, even when it is zero.
#[must_use]
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    let micros = uptime.subsec_micros();
    let clock = format!("{hours}:{minutes:02}:{seconds:02}.{micros:06}");
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        _ => format!("{days} days, {clock}"),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used, reason = "Test assertions.")]

    use std::time::Duration;

    use test_ledger_core::ExecutionResult;
    use test_ledger_core::InMemoryLedgerStore;
    use test_ledger_core::LedgerStore;
    use test_ledger_core::LogEntry;
    use test_ledger_core::LogFilter;
    use test_ledger_core::NewExecutionResult;
    use test_ledger_core::NewLogEntry;
    use test_ledger_core::NewUser;
    use test_ledger_core::SharedLedgerStore;
    use test_ledger_core::StoreError;
    use test_ledger_core::TestCase;
    use test_ledger_core::TestCaseFields;
    use test_ledger_core::Timestamp;
    use test_ledger_core::User;

    use super::LedgerService;
    use super::ServiceSettings;
    use super::format_uptime;
    use crate::auth::AccessPolicy;
    use crate::auth::RequestContext;
    use crate::error::ApiError;
    use crate::identity::PasswordHasher;
    use crate::identity::TokenIssuer;

    /// Store whose username lookup misses but whose insert hits the
    /// uniqueness constraint, as when a concurrent registration wins.
    struct LosingRaceStore {
        /// Backing store for every other operation.
        inner: InMemoryLedgerStore,
    }

    impl LedgerStore for LosingRaceStore {
        fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
            Err(StoreError::Conflict(format!("UNIQUE constraint failed: {}", user.username)))
        }

        fn find_user(&self, _username: &str) -> Result<Option<User>, StoreError> {
            Ok(None)
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

    /// Builds a service over `store` with the given log policy.
    fn service_with(store: SharedLedgerStore, log_access: AccessPolicy) -> LedgerService {
        LedgerService::new(
            store,
            PasswordHasher::new(1_000),
            TokenIssuer::new(&[7_u8; 32], 900),
            ServiceSettings {
                log_access,
                cookie_name: "access_token_cookie".to_string(),
            },
        )
    }

    /// Builds a service over a fresh in-memory store.
    fn service() -> LedgerService {
        service_with(
            SharedLedgerStore::from_store(InMemoryLedgerStore::new()),
            AccessPolicy::Public,
        )
    }

    /// Builds a request context carrying a bearer token.
    fn bearer(token: &str) -> RequestContext {
        RequestContext {
            auth_header: Some(format!("Bearer {token}")),
            cookie_header: None,
            auth_header_unreadable: false,
        }
    }

    #[test]
    fn uptime_formats_like_a_clock() {
        assert_eq!(format_uptime(Duration::from_micros(3_723_000_042)), "1:02:03.000042");
        assert_eq!(format_uptime(Duration::from_secs(86_400 + 5)), "1 day, 0:00:05.000000");
        assert_eq!(format_uptime(Duration::from_secs(3 * 86_400)), "3 days, 0:00:00.000000");
    }

    #[test]
    fn login_token_resolves_to_registered_user() {
        let service = service();
        let register = br#"{"username":"alice","password":"pw","role":"admin"}"#;
        service.register(Ok(register.as_slice())).unwrap();
        let login = br#"{"username":"alice","password":"pw"}"#;
        let token = service.login(Ok(login.as_slice())).unwrap();
        let identity = service.authenticate(&bearer(&token)).unwrap().unwrap();
        assert_eq!(identity.username, "alice");
        let wrong = br#"{"username":"alice","password":"nope"}"#;
        let denied = service.login(Ok(wrong.as_slice()));
        assert_eq!(denied, Err(ApiError::Auth("Invalid username or password".to_string())));
    }

    #[test]
    fn denied_update_reveals_nothing_about_the_record() {
        let service = service();
        let register = br#"{"username":"bob","password":"pw","role":"user"}"#;
        service.register(Ok(register.as_slice())).unwrap();
        let login = br#"{"username":"bob","password":"pw"}"#;
        let token = service.login(Ok(login.as_slice())).unwrap();
        let identity = service.authenticate(&bearer(&token)).unwrap();
        let result = service.update_test_case(identity.as_ref(), 999, Ok(b"not json".as_slice()));
        assert_eq!(result, Err(ApiError::Auth("Only admins can update test cases".to_string())));
        assert!(service.store().list_test_cases().unwrap().is_empty());
    }

    #[test]
    fn registration_losing_uniqueness_race_is_a_conflict() {
        let store = LosingRaceStore {
            inner: InMemoryLedgerStore::new(),
        };
        let service = service_with(SharedLedgerStore::from_store(store), AccessPolicy::Public);
        let register = br#"{"username":"carol","password":"pw","role":"user"}"#;
        let result = service.register(Ok(register.as_slice()));
        assert_eq!(result, Err(ApiError::Conflict("Username already exists".to_string())));
    }

    #[test]
    fn log_identity_ignores_tokens_only_when_public() {
        let public = service();
        assert_eq!(public.log_identity(&bearer("garbage")), Ok(None));
        let admin_only = service_with(
            SharedLedgerStore::from_store(InMemoryLedgerStore::new()),
            AccessPolicy::Admin,
        );
        assert_eq!(
            admin_only.log_identity(&bearer("garbage")),
            Err(ApiError::Auth("Invalid token".to_string()))
        );
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = service();
        let result = service.authenticate(&bearer("a.b.c"));
        assert_eq!(result, Err(ApiError::Auth("Invalid token".to_string())));
    }
}
