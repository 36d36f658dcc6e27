//! Clock abstraction for testable time.
//!
//! All temporal logic -- income accrual windows, UTC day boundaries,
//! retention cutoffs -- reads time through the [`Clock`] trait rather than
//! calling `Utc::now()` directly. Production uses [`SystemClock`]; tests
//! use [`ManualClock`] to place actions on exact instants (one second
//! before midnight, 48 hours after a collection) without sleeping.

use chrono::{DateTime, Duration, Utc};

use idlemint_types::UtcDay;

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    /// The current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// The current UTC calendar day.
    fn today(&self) -> UtcDay {
        UtcDay::from_datetime(self.now())
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Shared by `Arc`; `advance` and `set` take `&self` so a test can hold a
/// handle while the engine owns a `dyn Clock` view of the same instance.
#[derive(Debug)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at the given instant.
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *now = now
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Jump the clock to an exact instant.
    pub fn set(&self, at: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *now = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_advances_deterministically() {
        let start = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(3));
        assert_eq!(clock.now(), start + Duration::hours(3));
    }

    #[test]
    fn today_follows_the_clock_across_midnight() {
        let start = Utc.with_ymd_and_hms(2026, 5, 1, 23, 59, 59).unwrap();
        let clock = ManualClock::new(start);
        let before = clock.today();

        clock.advance(Duration::seconds(2));
        let after = clock.today();
        assert_ne!(before, after);
        assert_eq!(after.to_string(), "2026-05-02");
    }
}
