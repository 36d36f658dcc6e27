//! Explicit UTC calendar-day type.
//!
//! Daily counters are keyed by `(player, day)` where the day is the UTC
//! calendar date of the action. Modelling the day as a dedicated type
//! (rather than an ad-hoc formatted string) keeps day-boundary logic
//! testable and makes the retention arithmetic explicit.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A calendar day in UTC (`YYYY-MM-DD`).
///
/// Derived from a UTC timestamp; two timestamps on opposite sides of
/// midnight UTC map to distinct days regardless of local timezones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct UtcDay(pub NaiveDate);

impl UtcDay {
    /// Derive the UTC day from a timestamp.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.date_naive())
    }

    /// Return the day `days` before this one, saturating at the calendar
    /// minimum. Used to compute retention cutoffs.
    pub fn minus_days(self, days: u64) -> Self {
        let delta = chrono::Days::new(days);
        Self(self.0.checked_sub_days(delta).unwrap_or(NaiveDate::MIN))
    }

    /// Return the inner [`NaiveDate`].
    pub const fn into_inner(self) -> NaiveDate {
        self.0
    }

    /// The year component.
    pub fn year(self) -> i32 {
        self.0.year()
    }
}

impl core::fmt::Display for UtcDay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for UtcDay {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}
