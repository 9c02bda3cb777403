// crates/test-ledger-api/src/auth.rs
// ============================================================================
// Module: API Authn/Authz
// Description: Token extraction, resolved identities and access policies.
// Purpose: Provide one fail-closed policy check used by every handler.
// Dependencies: axum, test-ledger-config, test-ledger-core, thiserror
// ============================================================================

//! ## Overview
//! Tokens are read from the `Authorization: Bearer` header or from the
//! configured cookie; the header wins when both are present. Handlers resolve
//! the token to an [`Identity`] and then call [`authorize`] with the
//! [`AccessPolicy`] of the operation. Denials emit a `tracing` warning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::header::COOKIE;
use test_ledger_config::LogAccess;
use test_ledger_core::Role;
use thiserror::Error;

use crate::error::ApiError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted size of an authorization or cookie header.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

/// Message for requests that need a token but carry none.
pub const MISSING_TOKEN_MESSAGE: &str = "Missing authorization token";

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request credential carriers used for auth decisions.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Authorization header value.
    pub auth_header: Option<String>,
    /// Cookie header values joined with `; `.
    pub cookie_header: Option<String>,
    /// Authorization header present but not visible ASCII.
    pub auth_header_unreadable: bool,
}

impl RequestContext {
    /// Captures the credential headers of a request.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let raw_auth = headers.get(AUTHORIZATION);
        let auth_header = raw_auth.and_then(|value| value.to_str().ok()).map(str::to_string);
        let auth_header_unreadable = raw_auth.is_some() && auth_header.is_none();
        let cookies: Vec<&str> =
            headers.get_all(COOKIE).iter().filter_map(|value| value.to_str().ok()).collect();
        let cookie_header = (!cookies.is_empty()).then(|| cookies.join("; "));
        Self {
            auth_header,
            cookie_header,
            auth_header_unreadable,
        }
    }

    /// Returns the presented token, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] when a carrier is present but
    /// malformed or oversized.
    pub fn token(&self, cookie_name: &str) -> Result<Option<String>, AuthError> {
        if self.auth_header_unreadable {
            return Err(AuthError::Unauthenticated("Invalid authorization header".to_string()));
        }
        if let Some(header) = self.auth_header.as_deref() {
            return parse_bearer_token(header).map(Some);
        }
        match self.cookie_header.as_deref() {
            Some(cookies) => parse_cookie_token(cookies, cookie_name),
            None => Ok(None),
        }
    }
}

/// Parses a bearer token from an authorization header.
fn parse_bearer_token(header: &str) -> Result<String, AuthError> {
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("Authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("Invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

/// Finds the named cookie in a cookie header.
fn parse_cookie_token(cookies: &str, cookie_name: &str) -> Result<Option<String>, AuthError> {
    if cookies.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("Cookie header too large".to_string()));
    }
    let token = cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty());
    Ok(token)
}

// ============================================================================
// SECTION: Identity and Policy
// ============================================================================

/// Caller resolved from a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stored user id.
    pub user_id: i64,
    /// Username (token subject).
    pub username: String,
    /// Stored role.
    pub role: Role,
}

/// Access requirement of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Anyone, with or without a token.
    Public,
    /// Any resolved identity.
    Authenticated,
    /// Identities holding the admin role.
    Admin,
}

impl From<LogAccess> for AccessPolicy {
    fn from(access: LogAccess) -> Self {
        match access {
            LogAccess::Public => Self::Public,
            LogAccess::Authenticated => Self::Authenticated,
            LogAccess::Admin => Self::Admin,
        }
    }
}

/// Authn/authz failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No usable credential was presented.
    #[error("{0}")]
    Unauthenticated(String),
    /// Credential valid but not permitted.
    #[error("{0}")]
    Unauthorized(String),
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unauthenticated(message) | AuthError::Unauthorized(message) => {
                Self::Auth(message)
            }
        }
    }
}

/// Checks `identity` against `policy`.
///
/// `denial` is the message returned when an identity is present but lacks
/// the admin role.
///
/// # Errors
///
/// Returns [`AuthError`] when the policy is not satisfied.
pub fn authorize(
    identity: Option<&Identity>,
    policy: AccessPolicy,
    denial: &str,
) -> Result<(), AuthError> {
    let result = match (policy, identity) {
        (AccessPolicy::Public, _) => Ok(()),
        (AccessPolicy::Authenticated | AccessPolicy::Admin, None) => {
            Err(AuthError::Unauthenticated(MISSING_TOKEN_MESSAGE.to_string()))
        }
        (AccessPolicy::Authenticated, Some(_)) => Ok(()),
        (AccessPolicy::Admin, Some(identity)) if identity.role == Role::Admin => Ok(()),
        (AccessPolicy::Admin, Some(_)) => Err(AuthError::Unauthorized(denial.to_string())),
    };
    if let Err(error) = &result {
        tracing::warn!(
            user = identity.map_or("-", |identity| identity.username.as_str()),
            reason = %error,
            "access denied"
        );
    }
    result
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used, reason = "Test assertions.")]

    use axum::http::HeaderMap;
    use axum::http::HeaderValue;
    use test_ledger_core::Role;

    use super::AccessPolicy;
    use super::AuthError;
    use super::Identity;
    use super::MAX_AUTH_HEADER_BYTES;
    use super::RequestContext;
    use super::authorize;

    /// Builds an identity with the given role.
    fn identity(role: Role) -> Identity {
        Identity {
            user_id: 1,
            username: "alice".to_string(),
            role,
        }
    }

    #[test]
    fn header_token_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer header-token"));
        headers.insert("cookie", HeaderValue::from_static("access_token_cookie=cookie-token"));
        let context = RequestContext::from_headers(&headers);
        assert_eq!(
            context.token("access_token_cookie").unwrap().as_deref(),
            Some("header-token")
        );
    }

    #[test]
    fn cookie_token_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("theme=dark; access_token_cookie=abc"));
        let context = RequestContext::from_headers(&headers);
        assert_eq!(context.token("access_token_cookie").unwrap().as_deref(), Some("abc"));
        assert_eq!(context.token("other").unwrap(), None);
    }

    #[test]
    fn malformed_and_oversized_headers_are_rejected() {
        let context = RequestContext {
            auth_header: Some("Basic abc".to_string()),
            cookie_header: None,
            auth_header_unreadable: false,
        };
        assert!(matches!(context.token("c"), Err(AuthError::Unauthenticated(_))));
        let context = RequestContext {
            auth_header: Some(format!("Bearer {}", "a".repeat(MAX_AUTH_HEADER_BYTES))),
            cookie_header: None,
            auth_header_unreadable: false,
        };
        assert!(matches!(context.token("c"), Err(AuthError::Unauthenticated(_))));
        let context = RequestContext {
            auth_header: Some("bearer lower".to_string()),
            cookie_header: None,
            auth_header_unreadable: false,
        };
        assert_eq!(context.token("c").unwrap().as_deref(), Some("lower"));
    }

    #[test]
    fn unreadable_authorization_header_does_not_fall_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap());
        headers.insert("cookie", HeaderValue::from_static("access_token_cookie=cookie-token"));
        let context = RequestContext::from_headers(&headers);
        assert_eq!(
            context.token("access_token_cookie"),
            Err(AuthError::Unauthenticated("Invalid authorization header".to_string()))
        );
    }

    #[test]
    fn admin_policy_distinguishes_roles() {
        let admin = identity(Role::Admin);
        let user = identity(Role::User);
        assert!(authorize(Some(&admin), AccessPolicy::Admin, "no").is_ok());
        assert_eq!(
            authorize(Some(&user), AccessPolicy::Admin, "Only admins"),
            Err(AuthError::Unauthorized("Only admins".to_string()))
        );
        assert!(matches!(
            authorize(None, AccessPolicy::Admin, "Only admins"),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn public_and_authenticated_policies() {
        assert!(authorize(None, AccessPolicy::Public, "").is_ok());
        assert!(authorize(None, AccessPolicy::Authenticated, "").is_err());
        assert!(authorize(Some(&identity(Role::User)), AccessPolicy::Authenticated, "").is_ok());
    }
}
