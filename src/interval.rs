//! Statement time windows

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Timestamp format the statements API expects
pub const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Error)]
pub enum IntervalError {
    #[error("Unknown time unit: {0}")]
    UnknownUnit(String),
}

/// Unit for a configurable lookback window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaUnit {
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl DeltaUnit {
    /// `value` units as a duration, or `None` on overflow
    pub fn duration(self, value: i64) -> Option<TimeDelta> {
        match self {
            DeltaUnit::Weeks => TimeDelta::try_weeks(value),
            DeltaUnit::Days => TimeDelta::try_days(value),
            DeltaUnit::Hours => TimeDelta::try_hours(value),
            DeltaUnit::Minutes => TimeDelta::try_minutes(value),
            DeltaUnit::Seconds => TimeDelta::try_seconds(value),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            DeltaUnit::Weeks => "weeks",
            DeltaUnit::Days => "days",
            DeltaUnit::Hours => "hours",
            DeltaUnit::Minutes => "minutes",
            DeltaUnit::Seconds => "seconds",
        }
    }
}

impl fmt::Display for DeltaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeltaUnit {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weeks" => Ok(DeltaUnit::Weeks),
            "days" => Ok(DeltaUnit::Days),
            "hours" => Ok(DeltaUnit::Hours),
            "minutes" => Ok(DeltaUnit::Minutes),
            "seconds" => Ok(DeltaUnit::Seconds),
            other => Err(IntervalError::UnknownUnit(other.to_string())),
        }
    }
}

/// Closed time window `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Both bounds formatted for statement queries
    pub fn to_query(&self) -> (String, String) {
        (utc_to_str(&self.start), utc_to_str(&self.end))
    }
}

/// The window of length `delta` ending at `now`
pub fn last_delta(delta: TimeDelta, now: DateTime<Utc>) -> Interval {
    Interval {
        start: now - delta,
        end: now,
    }
}

pub fn last_24_hours(now: DateTime<Utc>) -> Interval {
    last_delta(TimeDelta::hours(24), now)
}

pub fn utc_to_str(dt: &DateTime<Utc>) -> String {
    dt.format(UTC_FORMAT).to_string()
}
