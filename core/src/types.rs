//! Shared primitive types used across the entire simulation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Count of simulated days crossed since the run started.
pub type DayNumber = u64;

/// The canonical run identifier.
pub type RunId = String;

pub const MS_PER_MINUTE: i64 = 60_000;
pub const MINUTES_PER_DAY: i64 = 1_440;
pub const MS_PER_DAY: i64 = MS_PER_MINUTE * MINUTES_PER_DAY;

/// Absolute simulated timestamp: milliseconds since the Unix epoch in game time.
///
/// Only the clock moves it forward, and only by whole simulated minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SimTime(pub i64);

impl SimTime {
    pub fn from_date(date: NaiveDate) -> Self {
        let ms = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or(0);
        Self(ms)
    }

    /// Index of the calendar day (UTC) containing this timestamp.
    pub fn day_index(self) -> i64 {
        self.0.div_euclid(MS_PER_DAY)
    }

    pub fn start_of_day(day_index: i64) -> Self {
        Self(day_index * MS_PER_DAY)
    }

    pub fn date(self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp_millis(self.0)
            .unwrap_or_default()
            .date_naive()
    }

    pub fn plus_minutes(self, minutes: i64) -> Self {
        Self(self.0 + minutes * MS_PER_MINUTE)
    }

    pub fn plus_days(self, days: i64) -> Self {
        Self(self.0 + days * MS_PER_DAY)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::<Utc>::from_timestamp_millis(self.0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            None => write!(f, "t+{}ms", self.0),
        }
    }
}

/// Stable aircraft identifier. Allocated monotonically and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AircraftId(pub u32);

impl fmt::Display for AircraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AC-{:04}", self.0)
    }
}

/// Route identifier, conventionally "ORIGIN-DEST".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub String);

impl RouteId {
    pub fn between(origin: &str, destination: &str) -> Self {
        Self(format!("{origin}-{destination}"))
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
