//! Clock abstraction for logroll.
//!
//! Rolling decisions depend on the calendar day, so the stream asks a
//! [`Clock`] for the local wall-clock time instead of reading it directly.
//! Tests hand the stream a [`MockClock`] and move it around to simulate days
//! passing.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime};

/// Trait for getting the current local time.
pub trait Clock: Send + Sync {
    /// Returns the current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Returns the current calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Real system clock implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Mock clock for testing.
///
/// Cloning creates a new handle to the same instant, so a test can keep one
/// handle and move time while the stream under test owns another.
#[derive(Debug, Clone)]
pub struct MockClock {
    // Milliseconds since the epoch of the naive local time.
    millis: Arc<AtomicI64>,
}

impl MockClock {
    /// Create a mock clock fixed at `now`.
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(now.and_utc().timestamp_millis())),
        }
    }

    /// Create a mock clock at midnight-relative `hour:min:sec` on the given day.
    ///
    /// Returns `None` if the date or time is out of range.
    pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let now = date.and_hms_opt(hour, min, sec)?;
        Some(Self::new(now))
    }

    /// Move the clock to an absolute instant.
    pub fn set(&self, now: NaiveDateTime) {
        self.millis
            .store(now.and_utc().timestamp_millis(), Ordering::SeqCst);
    }

    /// Move the clock forward (or backward, for negative durations).
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    /// Move the clock forward by whole days.
    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }
}

impl Clock for MockClock {
    fn now(&self) -> NaiveDateTime {
        let millis = self.millis.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.naive_utc())
            .unwrap_or_default()
    }
}
