//! Calendar-month handling for summaries and exports.
//!
//! A [`Month`] is parsed from the strict `YYYY-MM` form and turns into a
//! half-open UTC range `[first-of-month, first-of-next-month)`. Half-open
//! on the right so an entry booked at exactly midnight on the first belongs
//! to one month, never two.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors from parsing a month string.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum MonthError {
    /// The input is not in `YYYY-MM` form.
    #[error("invalid month {0:?}: expected YYYY-MM")]
    Malformed(String),

    /// The month number is outside 1..=12.
    #[error("invalid month number {0}: expected 01-12")]
    OutOfRange(u32),
}

/// A calendar month in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Constructs a month, validating the month number.
    pub fn new(year: i32, month: u32) -> Result<Self, MonthError> {
        if !(1..=12).contains(&month) {
            return Err(MonthError::OutOfRange(month));
        }
        Ok(Self { year, month })
    }

    /// The month containing the given instant.
    pub fn containing(ts: DateTime<Utc>) -> Self {
        use chrono::Datelike;
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }

    /// The current UTC month.
    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    /// Half-open UTC range covering this month: `[start, end)`.
    pub fn range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc
            .with_ymd_and_hms(self.year, self.month, 1, 0, 0, 0)
            .single()
            .expect("first of month is always a valid instant");
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        let end = Utc
            .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
            .single()
            .expect("first of month is always a valid instant");
        (start, end)
    }

    /// Whether the instant falls inside this month.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        let (start, end) = self.range();
        ts >= start && ts < end
    }
}

impl FromStr for Month {
    type Err = MonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MonthError::Malformed(s.to_string());

        let (year_part, month_part) = s.trim().split_once('-').ok_or_else(malformed)?;
        if year_part.len() != 4 || month_part.len() != 2 {
            return Err(malformed());
        }
        let year: i32 = year_part.parse().map_err(|_| malformed())?;
        let month: u32 = month_part.parse().map_err(|_| malformed())?;
        Self::new(year, month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// serde adapters so a Month travels as its "YYYY-MM" string form.

impl TryFrom<String> for Month {
    type Error = MonthError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Month> for String {
    fn from(m: Month) -> Self {
        m.to_string()
    }
}
