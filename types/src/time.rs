//! Timestamp type used throughout the voting protocol.
//!
//! Timestamps are Unix epoch seconds (UTC). Documents carry them as ISO
//! `YYYY-MM-DD HH:MM:SS` strings.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::TypesError;

const ISO_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Seconds in one day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn plus(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn minus(self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Midnight (UTC) at the start of this timestamp's day.
    pub fn start_of_day(self) -> Self {
        Self(self.0 - self.0 % SECONDS_PER_DAY)
    }

    /// Format as `YYYY-MM-DD HH:MM:SS`.
    pub fn to_iso(&self) -> String {
        match DateTime::from_timestamp(self.0 as i64, 0) {
            Some(dt) => dt.format(ISO_FORMAT).to_string(),
            None => "9999-12-31 23:59:59".to_string(),
        }
    }

    /// Parse a `YYYY-MM-DD HH:MM:SS` string.
    pub fn parse_iso(s: &str) -> Result<Self, TypesError> {
        let naive = NaiveDateTime::parse_from_str(s, ISO_FORMAT)
            .map_err(|e| TypesError::BadTimestamp(format!("{s}: {e}")))?;
        let secs = naive.and_utc().timestamp();
        if secs < 0 {
            return Err(TypesError::BadTimestamp(format!("{s}: before epoch")));
        }
        Ok(Self(secs as u64))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso())
    }
}
