//! Calendar-day iteration, local-time conversion, and half-hour rounding.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// A finite, restartable sequence of calendar days between two inclusive bounds.
///
/// Cloning the iterator restarts it from wherever the clone was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDays {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl CalendarDays {
    /// Days from `first` through `last`. Empty when `first > last`.
    pub fn between(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            next: Some(first),
            last,
        }
    }
}

impl Iterator for CalendarDays {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let day = self.next.filter(|day| *day <= self.last)?;
        self.next = day.succ_opt();
        Some(day)
    }
}

/// The local calendar date of `instant` in `tz`.
pub fn local_date(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Resolve a local wall-clock time in `tz` to an instant.
///
/// Ambiguous times (DST fall-back) take the earlier instant. Times inside a DST
/// gap are shifted forward one hour.
pub fn local_to_utc(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return Some(dt.with_timezone(&Utc));
    }
    let shifted = naive + Duration::hours(1);
    let resolved = tz.from_local_datetime(&shifted).earliest()?;
    tracing::warn!(%naive, %tz, "local time falls in a DST gap, shifted forward one hour");
    Some(resolved.with_timezone(&Utc))
}

/// The instant of `time` on local `date` in `tz`.
pub fn at_local_time(tz: &Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    local_to_utc(tz, date.and_time(time))
}

/// Round forward to the next `:00` or `:30` boundary of the datetime's own
/// wall clock.
///
/// Minutes in `(0, 30)` become `:30`, minutes in `(30, 60)` become the next
/// hour, and exact boundaries pass through. Seconds count: `14:00:01` is not on
/// a boundary. The result is never earlier than the input.
pub fn round_up_to_half_hour<T: TimeZone>(dt: DateTime<T>) -> DateTime<T> {
    let past_boundary = past_half_hour(&dt);
    if past_boundary == Duration::zero() {
        dt
    } else {
        dt + (Duration::minutes(30) - past_boundary)
    }
}

/// Round back to the latest `:00` or `:30` boundary at or before `dt`.
pub(crate) fn round_down_to_half_hour<T: TimeZone>(dt: DateTime<T>) -> DateTime<T> {
    let past_boundary = past_half_hour(&dt);
    dt - past_boundary
}

fn past_half_hour<T: TimeZone>(dt: &DateTime<T>) -> Duration {
    Duration::minutes(i64::from(dt.minute() % 30))
        + Duration::seconds(i64::from(dt.second()))
        + Duration::nanoseconds(i64::from(dt.nanosecond() % 1_000_000_000))
}

/// [`round_up_to_half_hour`] evaluated on the wall clock of `tz`.
pub fn round_up_in(instant: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    round_up_to_half_hour(instant.with_timezone(tz)).with_timezone(&Utc)
}

pub(crate) fn round_down_in(instant: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    round_down_to_half_hour(instant.with_timezone(tz)).with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn calendar_days_inclusive_and_restartable() {
        let days = CalendarDays::between(date(2026, 2, 27), date(2026, 3, 2));
        let first: Vec<_> = days.clone().collect();
        let second: Vec<_> = days.collect();
        assert_eq!(
            first,
            vec![
                date(2026, 2, 27),
                date(2026, 2, 28),
                date(2026, 3, 1),
                date(2026, 3, 2)
            ]
        );
        assert_eq!(first, second);
    }

    #[test]
    fn calendar_days_empty_when_bounds_inverted() {
        assert_eq!(
            CalendarDays::between(date(2026, 3, 2), date(2026, 3, 1)).count(),
            0
        );
    }

    #[test]
    fn round_down_keeps_boundaries() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap();
        assert_eq!(round_down_to_half_hour(dt), dt);
        let dt = Utc.with_ymd_and_hms(2026, 3, 2, 14, 59, 0).unwrap();
        assert_eq!(
            round_down_to_half_hour(dt),
            Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap()
        );
    }

    #[test]
    fn dst_gap_shifts_forward() {
        // 2026-03-08 02:30 does not exist in New York.
        let tz: Tz = "America/New_York".parse().unwrap();
        let naive = date(2026, 3, 8).and_hms_opt(2, 30, 0).unwrap();
        let resolved = local_to_utc(&tz, naive).unwrap();
        assert_eq!(resolved, Utc.with_ymd_and_hms(2026, 3, 8, 7, 30, 0).unwrap());
    }
}
