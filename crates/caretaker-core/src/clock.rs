//! Wall-clock source for timestamps and overdue calculations.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

pub trait Clock {
    /// Current UTC time in microseconds since the Unix epoch.
    fn now_us(&self) -> i64;

    /// Current UTC calendar date.
    fn today(&self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp_micros(self.now_us())
            .map_or(NaiveDate::MIN, |ts| ts.date_naive())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_us(&self) -> i64 {
        Utc::now().timestamp_micros()
    }
}

/// Manually advanced clock. Each read ticks forward by one microsecond so
/// consecutive log rows keep a strict order.
#[derive(Debug)]
pub struct FixedClock {
    now_us: AtomicI64,
}

impl FixedClock {
    #[must_use]
    pub const fn at_micros(now_us: i64) -> Self {
        Self {
            now_us: AtomicI64::new(now_us),
        }
    }

    /// Start at midnight UTC of `date`.
    #[must_use]
    pub fn on(date: NaiveDate) -> Self {
        let start = date
            .and_hms_opt(0, 0, 0)
            .map_or(0, |dt| dt.and_utc().timestamp_micros());
        Self::at_micros(start)
    }

    pub fn advance(&self, by: Duration) {
        let micros = i64::try_from(by.as_micros()).unwrap_or(i64::MAX);
        self.now_us.fetch_add(micros, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_us(&self) -> i64 {
        self.now_us.fetch_add(1, Ordering::SeqCst)
    }
}

/// Format microsecond timestamps as RFC 3339, falling back to the raw number.
#[must_use]
pub fn micros_to_rfc3339(us: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(us).map_or_else(|| us.to_string(), |ts| ts.to_rfc3339())
}
