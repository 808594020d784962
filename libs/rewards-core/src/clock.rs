//! Injectable time source and study-day helpers.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Study day containing `now`.
///
/// Before `daily_reset_hour` the study day is still the previous calendar
/// day, so late-night sessions count toward the day they started.
pub fn study_day(now: DateTime<Utc>, daily_reset_hour: u32) -> NaiveDate {
    if now.hour() < daily_reset_hour {
        (now - Duration::days(1)).date_naive()
    } else {
        now.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn midnight_reset_uses_calendar_day() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 0, 30, 0).unwrap();
        assert_eq!(study_day(now, 0), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn before_reset_hour_counts_as_previous_day() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 3, 0, 0).unwrap();
        assert_eq!(study_day(now, 4), NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    }

    #[test]
    fn fixed_clock_is_frozen() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let clock = FixedClock(instant);
        assert_eq!(clock.now(), instant);
        assert_eq!(clock.now(), instant);
    }
}
