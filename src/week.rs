//! Week-key and timezone helpers.
//!
//! All persisted instants are UTC; a week-key is the ISO (year, week) pair
//! with Monday as the first day. Week bounds are half-open
//! `[monday 00:00:00, next monday 00:00:00)` so an instant exactly on a
//! Monday midnight boundary belongs to the new week.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, week) = s
            .split_once("-W")
            .ok_or_else(|| format!("invalid week key: {s}"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid week key year: {s}"))?;
        let week: u32 = week
            .parse()
            .map_err(|_| format!("invalid week key week: {s}"))?;
        if !(1..=53).contains(&week) {
            return Err(format!("week number out of range: {s}"));
        }
        Ok(WeekKey { year, week })
    }
}

impl TryFrom<String> for WeekKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<WeekKey> for String {
    fn from(key: WeekKey) -> String {
        key.to_string()
    }
}

/// Map an instant to its ISO week-key.
pub fn week_key_of(instant: DateTime<Utc>) -> WeekKey {
    let iso = instant.date_naive().iso_week();
    WeekKey {
        year: iso.year(),
        week: iso.week(),
    }
}

/// Half-open UTC bounds of a week: Monday 00:00:00 up to (excluding) the
/// next Monday 00:00:00. `None` when the key names a week the calendar
/// does not contain (e.g. W53 of a 52-week year).
pub fn week_bounds(key: WeekKey) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let monday = NaiveDate::from_isoywd_opt(key.year, key.week, Weekday::Mon)?;
    let start = monday.and_hms_opt(0, 0, 0)?.and_utc();
    Some((start, start + Duration::days(7)))
}

pub fn to_local(instant: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    instant.with_timezone(&tz)
}

/// Display formatting used in reminder payloads, e.g. `Mon Nov 24, 05:00 PM`.
pub fn format_local(instant: DateTime<Utc>, tz: Tz) -> String {
    to_local(instant, tz).format("%a %b %d, %I:%M %p").to_string()
}
