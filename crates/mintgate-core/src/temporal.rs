//! # Temporal Types — UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC-only timestamp type truncated to seconds
//! precision.
//!
//! ## Invariant
//!
//! Every timestamp persisted on an order (`created_at`, `updated_at`,
//! `claimed_at`, `used_at`, …) is UTC with a Z suffix. `updated_at` is
//! monotonically non-decreasing across writes; sub-second noise and
//! local offsets would make that comparison unreliable across
//! independent request handlers, so both are rejected at construction.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`] — current UTC time, truncated.
/// - [`Timestamp::from_utc()`] — from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`] — from an ISO8601 string, rejecting non-UTC offsets.
/// - [`Timestamp::from_epoch_secs()`] — from Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 / ISO8601 string.
    ///
    /// **Rejects non-UTC inputs.** Only timestamps with the `Z` suffix
    /// are accepted — even `+00:00`, which is semantically equivalent,
    /// is rejected so the stored representation stays deterministic.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid RFC 3339 or uses a
    /// non-Z timezone offset.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::Malformed {
                field: "timestamp",
                reason: format!("must use Z suffix (UTC only), got: {s:?}"),
            });
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::Malformed {
            field: "timestamp",
            reason: format!("invalid RFC 3339 timestamp {s:?}: {e}"),
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        let dt = DateTime::from_timestamp(secs, 0).ok_or_else(|| ValidationError::Malformed {
            field: "timestamp",
            reason: format!("invalid Unix timestamp: {secs}"),
        })?;
        Ok(Self(dt))
    }

    /// Returns this timestamp shifted forward by `secs` seconds.
    ///
    /// Saturates at the representable boundary rather than wrapping.
    pub fn plus_secs(&self, secs: i64) -> Self {
        match Duration::try_seconds(secs).and_then(|d| self.0.checked_add_signed(d)) {
            Some(dt) => Self(dt),
            None => *self,
        }
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
