// crates/test-ledger-core/src/time.rs
// ============================================================================
// Module: Test Ledger Time Model
// Description: Canonical UTC timestamps for ledger records and log filters.
// Purpose: Provide a single microsecond-precision timestamp with ISO-8601 I/O.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Every ledger record carries a creation timestamp. Timestamps are stored as
//! unix microseconds so range filters compare integers, and are rendered as
//! RFC 3339 in UTC. Stores never read the wall clock; callers supply
//! timestamps through the `New*` inputs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Nanoseconds per microsecond.
const NANOS_PER_MICRO: i128 = 1_000;

/// Maximum accepted length of a timestamp string.
pub const MAX_TIMESTAMP_INPUT_LENGTH: usize = 64;

/// Naive date-time layouts accepted in addition to RFC 3339 (interpreted as UTC).
const NAIVE_LAYOUTS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
];

/// Date-only layout (midnight UTC).
const DATE_LAYOUT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timestamp parsing and conversion errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// Input is not a supported ISO-8601 form.
    #[error("invalid iso-8601 timestamp: {0}")]
    Invalid(String),
    /// Value is outside the representable range.
    #[error("timestamp out of range")]
    OutOfRange,
}

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// UTC timestamp with microsecond precision.
///
/// # Invariants
/// - Ordering matches chronological ordering.
/// - The wrapped value is unix epoch microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch microseconds.
    #[must_use]
    pub const fn from_unix_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Returns the unix epoch microseconds.
    #[must_use]
    pub const fn as_unix_micros(self) -> i64 {
        self.0
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        // Clamp instead of failing: the clock cannot realistically exceed i64 micros.
        Self::from_offset_datetime(OffsetDateTime::now_utc()).unwrap_or(Self(i64::MAX))
    }

    /// Converts an offset date-time into a UTC timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::OutOfRange`] when the value does not fit.
    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, TimestampError> {
        let micros = value.unix_timestamp_nanos() / NANOS_PER_MICRO;
        i64::try_from(micros).map(Self).map_err(|_| TimestampError::OutOfRange)
    }

    /// Converts the timestamp into a UTC offset date-time.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::OutOfRange`] when the value does not fit.
    pub fn to_offset_datetime(self) -> Result<OffsetDateTime, TimestampError> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0) * NANOS_PER_MICRO)
            .map_err(|_| TimestampError::OutOfRange)
    }

    /// Parses an ISO-8601 timestamp.
    ///
    /// Accepts RFC 3339 with an explicit offset, naive
    /// `YYYY-MM-DDTHH:MM[:SS[.ffffff]]` (a space separator is also accepted)
    /// and date-only `YYYY-MM-DD`. Naive values are interpreted as UTC.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError`] when the input is not a supported form.
    pub fn parse_iso8601(input: &str) -> Result<Self, TimestampError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_TIMESTAMP_INPUT_LENGTH {
            return Err(TimestampError::Invalid(truncate_for_error(trimmed)));
        }
        let normalized = normalize_separator(trimmed);
        if let Ok(value) = OffsetDateTime::parse(&normalized, &Rfc3339) {
            return Self::from_offset_datetime(value);
        }
        for layout in NAIVE_LAYOUTS {
            if let Ok(value) = PrimitiveDateTime::parse(&normalized, layout) {
                return Self::from_offset_datetime(value.assume_utc());
            }
        }
        if let Ok(date) = Date::parse(&normalized, DATE_LAYOUT) {
            return Self::from_offset_datetime(date.midnight().assume_utc());
        }
        Err(TimestampError::Invalid(truncate_for_error(trimmed)))
    }

    /// Renders the timestamp as RFC 3339 in UTC.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        self.to_offset_datetime()
            .ok()
            .and_then(|value| value.format(&Rfc3339).ok())
            .unwrap_or_else(|| self.0.to_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse_iso8601(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Replaces a single space date/time separator with `T`.
fn normalize_separator(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() > 10 && bytes[10] == b' ' {
        let mut normalized = String::with_capacity(value.len());
        normalized.push_str(&value[..10]);
        normalized.push('T');
        normalized.push_str(&value[11..]);
        normalized
    } else {
        value.to_string()
    }
}

/// Bounds untrusted input echoed back in error messages.
fn truncate_for_error(value: &str) -> String {
    value.chars().take(MAX_TIMESTAMP_INPUT_LENGTH).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
