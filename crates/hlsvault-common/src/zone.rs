//! Calendar-day boundaries.
//!
//! Day playlists and segment directories are named after the calendar day a
//! segment started in. [`DayZone`] decides which timezone that day is
//! measured in.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seconds in a calendar day without DST transitions.
pub const SECS_PER_DAY: i64 = 86_400;

/// Timezone used to split recordings into calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DayZone {
    /// The host's local timezone.
    #[default]
    Local,
    /// Coordinated universal time.
    Utc,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

impl DayZone {
    /// Calendar day containing the instant `t`.
    pub fn date_of(&self, t: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => t.with_timezone(&Local).date_naive(),
            Self::Utc => t.date_naive(),
            Self::Fixed(offset) => t.with_timezone(offset).date_naive(),
        }
    }

    /// Calendar day containing the unix second `secs`.
    pub fn date_of_unix(&self, secs: i64) -> Option<NaiveDate> {
        Utc.timestamp_opt(secs, 0).single().map(|t| self.date_of(t))
    }

    /// Unix second at which `date` begins in this zone.
    ///
    /// Returns `None` when midnight does not exist locally (a DST gap).
    pub fn day_start(&self, date: NaiveDate) -> Option<i64> {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        match self {
            Self::Local => Local
                .from_local_datetime(&midnight)
                .earliest()
                .map(|t| t.timestamp()),
            Self::Utc => Some(Utc.from_utc_datetime(&midnight).timestamp()),
            Self::Fixed(offset) => offset
                .from_local_datetime(&midnight)
                .single()
                .map(|t| t.timestamp()),
        }
    }

    /// Half-open `[start, end)` window of `date` in unix seconds.
    pub fn day_window(&self, date: NaiveDate) -> Option<(i64, i64)> {
        let start = self.day_start(date)?;
        Some((start, start + SECS_PER_DAY))
    }
}

impl fmt::Display for DayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Utc => f.write_str("utc"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

impl FromStr for DayZone {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "local" | "" => return Ok(Self::Local),
            "utc" | "z" => return Ok(Self::Utc),
            _ => {}
        }

        trimmed
            .parse::<FixedOffset>()
            .map(Self::Fixed)
            .map_err(|_| crate::Error::parse(format!("invalid timezone: {trimmed}")))
    }
}

impl TryFrom<String> for DayZone {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DayZone> for String {
    fn from(zone: DayZone) -> Self {
        zone.to_string()
    }
}
