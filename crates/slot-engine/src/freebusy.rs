//! Compute free working windows from busy intervals.
//!
//! Each calendar day in the horizon contributes one working window per the
//! [`WorkingDayPolicy`]; every busy interval touching that window is then
//! subtracted with the buffer applied on both sides.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::{at_local_time, local_date, CalendarDays};
use crate::config::{SlotRules, WorkingDayPolicy};
use crate::error::Result;
use crate::interval::{overlaps, subtract_all, BusyInterval, FreeWindow, Span};

/// The free windows of one local calendar day, ordered by start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayWindows {
    pub date: NaiveDate,
    pub windows: Vec<FreeWindow>,
}

impl DayWindows {
    pub fn free_minutes(&self) -> i64 {
        self.windows.iter().map(Span::duration_minutes).sum()
    }
}

/// Build the day-ordered free windows between `from` and `until`.
///
/// Days run from the local date of `from` through the local date of `until`,
/// inclusive. The first day's window never starts before `from`, and a day
/// whose working window is already over is left out entirely, as is a day with
/// no window left after subtraction.
///
/// # Errors
/// Returns `EngineError::InvalidInterval` if any busy interval has `end <= start`.
pub fn build_free_windows(
    busy: &[BusyInterval],
    policy: &WorkingDayPolicy,
    tz: &Tz,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    rules: &SlotRules,
) -> Result<Vec<DayWindows>> {
    policy.validate()?;
    for interval in busy {
        interval.validate()?;
    }

    let mut sorted: Vec<BusyInterval> = busy.to_vec();
    sorted.sort_by_key(|b| (b.start, b.end));

    let days = CalendarDays::between(local_date(from, tz), local_date(until, tz));
    let mut result = Vec::new();

    for date in days {
        let Some(working) = working_window(policy, tz, date, from) else {
            continue;
        };

        let mut windows = if working.len() >= rules.min_slot {
            vec![working]
        } else {
            Vec::new()
        };
        for interval in sorted
            .iter()
            .filter(|b| overlaps(*b, &working, rules.buffer))
        {
            windows = subtract_all(&windows, interval, rules.buffer, rules.min_slot);
            if windows.is_empty() {
                break;
            }
        }

        tracing::trace!(%date, windows = windows.len(), "built free windows for day");
        if !windows.is_empty() {
            result.push(DayWindows { date, windows });
        }
    }

    Ok(result)
}

/// The policy's window on `date`, clipped so it starts no earlier than `from`.
fn working_window(
    policy: &WorkingDayPolicy,
    tz: &Tz,
    date: NaiveDate,
    from: DateTime<Utc>,
) -> Option<FreeWindow> {
    let start = at_local_time(tz, date, policy.day_start)?;
    let end = at_local_time(tz, date, policy.day_end)?;
    let window = FreeWindow::new(start.max(from), end);
    (!window.is_empty()).then_some(window)
}
