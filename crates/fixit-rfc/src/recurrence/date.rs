//! Identity of one occurrence within a recurring series.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use super::Frequency;
use crate::datetime::DateTokenError;

const DATE_FORMAT: &str = "%Y%m%d";
const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// The calendar position of an occurrence, at the granularity its series needs.
///
/// Daily-or-coarser series identify occurrences by local date; sub-daily
/// series need the local date-time because several occurrences share a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecurrenceDate {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl RecurrenceDate {
    /// ## Summary
    /// Derives the identity of an occurrence starting at `start`.
    ///
    /// The local wall-clock time of `start` is used, truncated to seconds.
    #[must_use]
    pub fn for_instant<Tz: TimeZone>(start: &DateTime<Tz>, frequency: Frequency) -> Self {
        if frequency.is_sub_daily() {
            let local = start.naive_local();
            Self::DateTime(local.with_nanosecond(0).unwrap_or(local))
        } else {
            Self::Date(start.date_naive())
        }
    }

    /// Local calendar date of the occurrence.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(date) => *date,
            Self::DateTime(date_time) => date_time.date(),
        }
    }

    /// ## Summary
    /// Returns whether two recurrence dates refer to the same occurrence.
    ///
    /// Mixed granularities compare by date, so a whole-day entry covers every
    /// sub-daily occurrence on that day.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            _ => self.date() == other.date(),
        }
    }
}

impl fmt::Display for RecurrenceDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            Self::DateTime(date_time) => write!(f, "{}", date_time.format(DATE_TIME_FORMAT)),
        }
    }
}

impl FromStr for RecurrenceDate {
    type Err = DateTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DateTokenError::Malformed(s.to_string());
        match s.len() {
            8 => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map(Self::Date)
                .map_err(|_err| malformed()),
            15 => NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT)
                .map(Self::DateTime)
                .map_err(|_err| malformed()),
            _ => Err(malformed()),
        }
    }
}

impl TryFrom<String> for RecurrenceDate {
    type Error = DateTokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecurrenceDate> for String {
    fn from(value: RecurrenceDate) -> Self {
        value.to_string()
    }
}
