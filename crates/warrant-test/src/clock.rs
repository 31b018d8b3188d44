//! A clock that only moves when told to.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use std::sync::Mutex;
use warrant_core::{Clock, Timestamp};

/// Manually driven [`Clock`].
///
/// Defaults to Wednesday 2025-06-04 12:00 UTC with a UTC local offset.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<Timestamp>,
    offset: FixedOffset,
}

impl FixedClock {
    /// A clock frozen at `now`, local time in UTC.
    #[must_use]
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
            offset: utc_offset(),
        }
    }

    /// A clock frozen at the given UTC wall time.
    ///
    /// # Panics
    ///
    /// Panics if the components do not form a valid date-time.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn at_utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let dt = Utc
            .with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .unwrap();
        Self::new(Timestamp::from_datetime(dt))
    }

    /// Use a different local offset for hour and day boundaries.
    #[must_use]
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Jump to `now`.
    pub fn set(&self, now: Timestamp) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    /// Jump to the given instant.
    pub fn set_datetime(&self, now: DateTime<Utc>) {
        self.set(Timestamp::from_datetime(now));
    }

    /// Move forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = guard.saturating_add(by);
        }
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at_utc(2025, 6, 4, 12, 0)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
            .lock()
            .map_or_else(|poisoned| *poisoned.into_inner(), |guard| *guard)
    }

    fn local_offset(&self) -> FixedOffset {
        self.offset
    }
}

#[allow(clippy::unwrap_used)]
fn utc_offset() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}
