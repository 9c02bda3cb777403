// crates/test-ledger-api/src/identity.rs
// ============================================================================
// Module: Identity Primitives
// Description: Password hashing and signed identity tokens.
// Purpose: Verify credentials and issue/validate compact EdDSA tokens.
// Dependencies: pbkdf2, hmac, sha2, ed25519-dalek, base64, rand, subtle
// ============================================================================

//! ## Overview
//! Passwords are stored as salted PBKDF2-HMAC-SHA256 hashes encoded as
//! `pbkdf2_sha256$<iterations>$<salt>$<hash>` and compared in constant time.
//! Identity tokens are compact JWS strings (`header.claims.signature`, each
//! base64url without padding) signed with an Ed25519 key derived from the
//! configured secret. Callers supply the current time so expiry checks are
//! deterministic under test.
//!
//! Security posture: tokens and stored hashes are untrusted input; every
//! parse failure is an error, never a partial success.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Encoded hash scheme label.
const HASH_SCHEME: &str = "pbkdf2_sha256";
/// Salt length in bytes.
const SALT_BYTES: usize = 16;
/// Derived key length in bytes.
const HASH_BYTES: usize = 32;
/// Upper bound on iterations accepted from stored hashes.
const MAX_STORED_ITERATIONS: u32 = 10_000_000;
/// Token header algorithm.
const TOKEN_ALG: &str = "EdDSA";
/// Token header type.
const TOKEN_TYP: &str = "JWT";
/// Maximum accepted token length in bytes.
pub const MAX_TOKEN_BYTES: usize = 4 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identity primitive errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hash(String),
    /// Stored password hash is not in the expected encoding.
    #[error("malformed password hash")]
    MalformedHash,
    /// Token failed structural, header or signature checks.
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// Token is past its expiry.
    #[error("token expired")]
    Expired,
    /// Token could not be produced.
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

// ============================================================================
// SECTION: Password Hashing
// ============================================================================

/// Salted PBKDF2 password hasher.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    /// Iterations applied to new hashes.
    iterations: u32,
}

impl PasswordHasher {
    /// Creates a hasher applying `iterations` rounds to new hashes.
    #[must_use]
    pub const fn new(iterations: u32) -> Self {
        Self {
            iterations,
        }
    }

    /// Hashes a password with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Hash`] when key derivation fails.
    pub fn hash(&self, password: &str) -> Result<String, IdentityError> {
        let mut salt = [0_u8; SALT_BYTES];
        OsRng.fill_bytes(&mut salt);
        let derived = derive(password, &salt, self.iterations)?;
        Ok(format!(
            "{HASH_SCHEME}${}${}${}",
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(derived)
        ))
    }

    /// Verifies a password against an encoded hash in constant time.
    ///
    /// The iteration count stored in the hash is used, so hashes created
    /// under a different configuration keep verifying.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::MalformedHash`] when the stored hash cannot be parsed.
    pub fn verify(&self, password: &str, encoded: &str) -> Result<bool, IdentityError> {
        let mut parts = encoded.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(IdentityError::MalformedHash);
        };
        if scheme != HASH_SCHEME {
            return Err(IdentityError::MalformedHash);
        }
        let iterations: u32 = iterations.parse().map_err(|_| IdentityError::MalformedHash)?;
        if iterations == 0 || iterations > MAX_STORED_ITERATIONS {
            return Err(IdentityError::MalformedHash);
        }
        let salt = STANDARD_NO_PAD.decode(salt).map_err(|_| IdentityError::MalformedHash)?;
        let expected =
            STANDARD_NO_PAD.decode(expected).map_err(|_| IdentityError::MalformedHash)?;
        if expected.len() != HASH_BYTES {
            return Err(IdentityError::MalformedHash);
        }
        let derived = derive(password, &salt, iterations)?;
        Ok(derived.as_slice().ct_eq(expected.as_slice()).into())
    }
}

/// Runs PBKDF2-HMAC-SHA256.
fn derive(password: &str, salt: &[u8], iterations: u32) -> Result<[u8; HASH_BYTES], IdentityError> {
    let mut out = [0_u8; HASH_BYTES];
    pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, iterations, &mut out)
        .map_err(|err| IdentityError::Hash(err.to_string()))?;
    Ok(out)
}

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// Token header.
#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    /// Signature algorithm.
    alg: String,
    /// Token type.
    typ: String,
}

/// Claims carried by an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject username.
    pub sub: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Issues and validates signed identity tokens.
pub struct TokenIssuer {
    /// Signing key.
    signing_key: SigningKey,
    /// Verifying key derived from the signing key.
    verifying_key: VerifyingKey,
    /// Token lifetime in seconds.
    ttl_secs: i64,
}

impl TokenIssuer {
    /// Derives the signing key as SHA-256 of `secret`.
    #[must_use]
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        let seed: [u8; 32] = Sha256::digest(secret).into();
        let signing_key = SigningKey::from_bytes(&seed);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Issues a token for `subject` valid from `now_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Encoding`] when serialization fails.
    pub fn issue(&self, subject: &str, now_secs: i64) -> Result<String, IdentityError> {
        let header = TokenHeader {
            alg: TOKEN_ALG.to_string(),
            typ: TOKEN_TYP.to_string(),
        };
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now_secs,
            exp: now_secs.saturating_add(self.ttl_secs),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|err| IdentityError::Encoding(err.to_string()))?;
        let claims_json =
            serde_json::to_vec(&claims).map_err(|err| IdentityError::Encoding(err.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = self.signing_key.sign(signing_input.as_bytes());
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes())))
    }

    /// Validates structure, header, signature and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidToken`] or [`IdentityError::Expired`].
    pub fn verify(&self, token: &str, now_secs: i64) -> Result<TokenClaims, IdentityError> {
        if token.len() > MAX_TOKEN_BYTES {
            return Err(IdentityError::InvalidToken("token too large".to_string()));
        }
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(IdentityError::InvalidToken("expected three segments".to_string()));
        };
        let header: TokenHeader = decode_segment(header_b64)?;
        if header.alg != TOKEN_ALG {
            return Err(IdentityError::InvalidToken("unsupported algorithm".to_string()));
        }
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| IdentityError::InvalidToken("signature encoding".to_string()))?;
        let signature = Signature::try_from(signature_bytes.as_slice())
            .map_err(|_| IdentityError::InvalidToken("signature length".to_string()))?;
        let signing_input_len = header_b64.len() + 1 + claims_b64.len();
        self.verifying_key
            .verify_strict(&token.as_bytes()[..signing_input_len], &signature)
            .map_err(|_| IdentityError::InvalidToken("signature mismatch".to_string()))?;
        let claims: TokenClaims = decode_segment(claims_b64)?;
        if now_secs >= claims.exp {
            return Err(IdentityError::Expired);
        }
        Ok(claims)
    }
}

/// Decodes a base64url JSON segment.
fn decode_segment<T>(segment: &str) -> Result<T, IdentityError>
where
    T: for<'de> Deserialize<'de>,
{
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| IdentityError::InvalidToken("segment encoding".to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| IdentityError::InvalidToken("segment json".to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only assertions."
    )]

    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use proptest::prelude::*;

    use super::IdentityError;
    use super::PasswordHasher;
    use super::TokenIssuer;

    /// Fast iteration count for tests.
    const TEST_ITERATIONS: u32 = 1_000;
    /// Secret used for test issuers.
    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn password_round_trip_and_mismatch() {
        let hasher = PasswordHasher::new(TEST_ITERATIONS);
        let encoded = hasher.hash("s3cret").unwrap();
        assert!(encoded.starts_with("pbkdf2_sha256$1000$"));
        assert!(hasher.verify("s3cret", &encoded).unwrap());
        assert!(!hasher.verify("S3cret", &encoded).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = PasswordHasher::new(TEST_ITERATIONS);
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn stored_iterations_take_precedence() {
        let old = PasswordHasher::new(TEST_ITERATIONS).hash("pw").unwrap();
        assert!(PasswordHasher::new(5_000).verify("pw", &old).unwrap());
    }

    #[test]
    fn malformed_hashes_are_rejected() {
        let hasher = PasswordHasher::new(TEST_ITERATIONS);
        for encoded in [
            "",
            "plain",
            "bcrypt$1000$c2FsdA$aGFzaA",
            "pbkdf2_sha256$0$c2FsdA$aGFzaA",
            "pbkdf2_sha256$abc$c2FsdA$aGFzaA",
            "pbkdf2_sha256$1000$c2FsdA$aGFzaA",
            "pbkdf2_sha256$1000$c2FsdA$aGFzaA$extra",
        ] {
            assert!(matches!(hasher.verify("pw", encoded), Err(IdentityError::MalformedHash)));
        }
    }

    #[test]
    fn token_round_trip() {
        let issuer = TokenIssuer::new(SECRET, 900);
        let token = issuer.issue("alice", 1_000).unwrap();
        assert_eq!(token.split('.').count(), 3);
        let claims = issuer.verify(&token, 1_001).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 1_900);
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new(SECRET, 60);
        let token = issuer.issue("alice", 1_000).unwrap();
        assert!(matches!(issuer.verify(&token, 1_060), Err(IdentityError::Expired)));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = TokenIssuer::new(SECRET, 60);
        let other = TokenIssuer::new(b"another-secret-another-secret-xx", 60);
        let token = other.issue("alice", 1_000).unwrap();
        assert!(matches!(issuer.verify(&token, 1_001), Err(IdentityError::InvalidToken(_))));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let issuer = TokenIssuer::new(SECRET, 60);
        let token = issuer.issue("alice", 1_000).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"sub":"root","iat":1000,"exp":99999}"#);
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert!(matches!(issuer.verify(&tampered, 1_001), Err(IdentityError::InvalidToken(_))));
    }

    #[test]
    fn unsupported_algorithm_is_rejected() {
        let issuer = TokenIssuer::new(SECRET, 60);
        let token = issuer.issue("alice", 1_000).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let downgraded = format!("{header}.{}.{}", parts[1], parts[2]);
        assert!(matches!(
            issuer.verify(&downgraded, 1_001),
            Err(IdentityError::InvalidToken(_))
        ));
    }

    proptest! {
        #[test]
        fn garbage_tokens_never_verify(raw in "[A-Za-z0-9._-]{0,200}") {
            let issuer = TokenIssuer::new(SECRET, 60);
            prop_assert!(issuer.verify(&raw, 0).is_err());
        }

        #[test]
        fn any_password_verifies_against_its_own_hash(password in ".{0,32}") {
            let hasher = PasswordHasher::new(TEST_ITERATIONS);
            let encoded = hasher.hash(&password).unwrap();
            prop_assert!(hasher.verify(&password, &encoded).unwrap());
        }
    }
}
