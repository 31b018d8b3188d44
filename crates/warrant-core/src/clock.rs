//! Injectable time source.
//!
//! Every service reads "now" through a [`Clock`] handed to it at
//! construction, so decisions involving expiry, rollback windows, allowed
//! hours and per-day limits are reproducible under test.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, NaiveTime, TimeZone, Timelike, Utc, Weekday,
};

use crate::types::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> Timestamp;

    /// The offset of the user-facing local timezone at the current instant.
    ///
    /// Used to evaluate allowed-hours windows and day/week boundaries.
    fn local_offset(&self) -> FixedOffset;

    /// The current instant expressed in local time.
    fn local_now(&self) -> DateTime<FixedOffset> {
        self.now().0.with_timezone(&self.local_offset())
    }

    /// The current local hour (0–23).
    fn local_hour(&self) -> u32 {
        self.local_now().hour()
    }
}

/// Wall-clock time in the host's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(Utc::now())
    }

    fn local_offset(&self) -> FixedOffset {
        *Local::now().offset()
    }
}

/// Start of the current local day, as a UTC timestamp.
#[must_use]
pub fn start_of_local_day(clock: &dyn Clock) -> Timestamp {
    let local = clock.local_now();
    local_midnight(local)
}

/// Start of the current local week, as a UTC timestamp.
///
/// `week_start` is the first day of the week (Sunday or Monday in practice).
#[must_use]
pub fn start_of_local_week(clock: &dyn Clock, week_start: Weekday) -> Timestamp {
    let local = clock.local_now();
    let days_back = (7_u32
        .saturating_add(local.weekday().num_days_from_monday())
        .saturating_sub(week_start.num_days_from_monday()))
        % 7;
    let day = local
        .checked_sub_signed(Duration::days(i64::from(days_back)))
        .unwrap_or(local);
    local_midnight(day)
}

fn local_midnight(local: DateTime<FixedOffset>) -> Timestamp {
    let naive = local.date_naive().and_time(NaiveTime::MIN);
    let midnight = local
        .offset()
        .from_local_datetime(&naive)
        .single()
        .unwrap_or(local);
    Timestamp(midnight.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct At(DateTime<Utc>, FixedOffset);

    impl Clock for At {
        fn now(&self) -> Timestamp {
            Timestamp(self.0)
        }
        fn local_offset(&self) -> FixedOffset {
            self.1
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_local_hour_uses_offset() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 23, 30, 0).unwrap();
        let clock = At(now, FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(clock.local_hour(), 1);
    }

    #[test]
    fn test_start_of_local_day() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 15, 45, 12).unwrap();
        let clock = At(now, utc());
        assert_eq!(
            start_of_local_day(&clock).0,
            Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_start_of_local_week() {
        // 2026-03-04 is a Wednesday.
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap();
        let clock = At(now, utc());
        assert_eq!(
            start_of_local_week(&clock, Weekday::Sun).0,
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            start_of_local_week(&clock, Weekday::Mon).0,
            Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(
            start_of_local_week(&clock, Weekday::Wed).0,
            Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap()
        );
    }
}
