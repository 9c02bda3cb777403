// crates/test-ledger-config/src/config.rs
// ============================================================================
// Module: Test Ledger Configuration
// Description: Configuration loading and validation for Test Ledger.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, test-ledger-store-sqlite
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys, missing secrets and out-of-range limits are rejected so a
//! typo never silently falls back to a default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use test_ledger_store_sqlite::SqliteStoreConfig;
use test_ledger_store_sqlite::SqliteStoreMode;
use test_ledger_store_sqlite::SqliteSyncMode;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "test-ledger.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TEST_LEDGER_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
/// Default request body limit in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Minimum accepted request body limit in bytes.
pub const MIN_MAX_BODY_BYTES: usize = 1024;
/// Maximum accepted request body limit in bytes.
pub const MAX_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
/// Minimum token secret length in bytes.
pub const MIN_TOKEN_SECRET_BYTES: usize = 32;
/// Default token lifetime in seconds.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 15 * 60;
/// Minimum token lifetime in seconds.
pub const MIN_TOKEN_TTL_SECS: u64 = 60;
/// Maximum token lifetime in seconds.
pub const MAX_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
/// Default PBKDF2 iteration count.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 210_000;
/// Minimum PBKDF2 iteration count.
pub const MIN_PASSWORD_ITERATIONS: u32 = 1_000;
/// Default cookie carrying the access token.
pub const DEFAULT_COOKIE_NAME: &str = "access_token_cookie";
/// Maximum cookie name length.
const MAX_COOKIE_NAME_LENGTH: usize = 64;
/// Default busy timeout (ms) for the sqlite store.
const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Test Ledger configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Identity configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Persistence configuration.
    #[serde(default)]
    pub store: StoreConfig,
}

impl LedgerConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// the explicit path, then `TEST_LEDGER_CONFIG`, then `test-ledger.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.auth.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Whether completed requests are written to the request log.
    #[serde(default = "default_request_log")]
    pub request_log: bool,
    /// Endpoint access settings.
    #[serde(default)]
    pub access: AccessConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            request_log: default_request_log(),
            access: AccessConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("server.bind must be set".to_string()));
        }
        bind.parse().map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if !(MIN_MAX_BODY_BYTES..=MAX_MAX_BODY_BYTES).contains(&self.max_body_bytes) {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between {MIN_MAX_BODY_BYTES} and \
                 {MAX_MAX_BODY_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Endpoint access settings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    /// Who may query the request log.
    #[serde(default)]
    pub logs: LogAccess,
}

/// Access level required to query the request log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAccess {
    /// Anyone, including anonymous callers.
    #[default]
    Public,
    /// Any authenticated user.
    Authenticated,
    /// Administrators only.
    Admin,
}

/// Identity configuration.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Inline token signing secret.
    #[serde(default)]
    pub token_secret: Option<String>,
    /// Name of the environment variable holding the token secret.
    #[serde(default)]
    pub token_secret_env: Option<String>,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// PBKDF2 iteration count for new password hashes.
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
    /// Cookie name accepted as an alternative token carrier.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            token_secret_env: None,
            token_ttl_secs: default_token_ttl_secs(),
            password_iterations: default_password_iterations(),
            cookie_name: default_cookie_name(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &self.token_secret.as_ref().map(|_| "<redacted>"))
            .field("token_secret_env", &self.token_secret_env)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("password_iterations", &self.password_iterations)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

impl AuthConfig {
    /// Resolves the token secret from the inline value or the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no usable secret is available.
    pub fn resolve_token_secret(&self) -> Result<String, ConfigError> {
        self.resolve_token_secret_with(|name| env::var(name).ok())
    }

    /// Resolves the token secret using `lookup` for environment access.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no usable secret is available.
    pub fn resolve_token_secret_with<F>(&self, lookup: F) -> Result<String, ConfigError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let secret = match (&self.token_secret, &self.token_secret_env) {
            (Some(secret), None) => secret.clone(),
            (None, Some(name)) => lookup(name).ok_or_else(|| {
                ConfigError::Invalid(format!("auth.token_secret_env {name} is not set"))
            })?,
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "auth.token_secret and auth.token_secret_env are mutually exclusive"
                        .to_string(),
                ));
            }
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "auth.token_secret or auth.token_secret_env must be set".to_string(),
                ));
            }
        };
        validate_secret(&secret)?;
        Ok(secret)
    }

    /// Validates identity configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.token_secret, &self.token_secret_env) {
            (Some(secret), None) => validate_secret(secret)?,
            (None, Some(name)) => {
                if name.trim().is_empty() {
                    return Err(ConfigError::Invalid(
                        "auth.token_secret_env must be non-empty".to_string(),
                    ));
                }
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "auth.token_secret and auth.token_secret_env are mutually exclusive"
                        .to_string(),
                ));
            }
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "auth.token_secret or auth.token_secret_env must be set".to_string(),
                ));
            }
        }
        if !(MIN_TOKEN_TTL_SECS..=MAX_TOKEN_TTL_SECS).contains(&self.token_ttl_secs) {
            return Err(ConfigError::Invalid(format!(
                "auth.token_ttl_secs must be between {MIN_TOKEN_TTL_SECS} and \
                 {MAX_TOKEN_TTL_SECS}"
            )));
        }
        if self.password_iterations < MIN_PASSWORD_ITERATIONS {
            return Err(ConfigError::Invalid(format!(
                "auth.password_iterations must be at least {MIN_PASSWORD_ITERATIONS}"
            )));
        }
        validate_cookie_name(&self.cookie_name)
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the sqlite store config when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_store_path(path)
            }
        }
    }
}

/// Store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Returns the default request body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Request logging is on by default.
const fn default_request_log() -> bool {
    true
}

/// Returns the default token lifetime.
const fn default_token_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

/// Returns the default PBKDF2 iteration count.
const fn default_password_iterations() -> u32 {
    DEFAULT_PASSWORD_ITERATIONS
}

/// Returns the default token cookie name.
fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

/// Returns the default busy timeout for the sqlite store.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument, environment or default name.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates the sqlite store path against length limits.
fn validate_store_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid("store path must be non-empty".to_string()));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("store path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("store path component too long".to_string()));
        }
    }
    Ok(())
}

/// Rejects token secrets that are too short to key a signer.
fn validate_secret(secret: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_TOKEN_SECRET_BYTES {
        return Err(ConfigError::Invalid(format!(
            "auth token secret must be at least {MIN_TOKEN_SECRET_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Cookie names must be short RFC 6265 tokens.
fn validate_cookie_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_COOKIE_NAME_LENGTH
        && name.bytes().all(|byte| byte.is_ascii_alphanumeric() || b"-_.".contains(&byte));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(
            "auth.cookie_name must be 1-64 characters of [A-Za-z0-9._-]".to_string(),
        ))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
