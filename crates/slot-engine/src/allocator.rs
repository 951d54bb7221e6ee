//! Place work items into free windows.
//!
//! Items are processed strictly by ascending `sequence`, so earlier items get
//! first claim on their preferred times. For each item:
//!
//! 1. If its time hint resolves, the window offering a start closest to the
//!    target (while still overlapping `[target, target + duration)`) wins and the
//!    placement is marked `matched_preferred`.
//! 2. Otherwise the item goes to the window on the least-loaded day (load is the
//!    minutes already placed that day in this run), ties broken by earliest day
//!    and then earliest start. This spreads work over the horizon instead of
//!    filling the first open day.
//! 3. If nothing before the deadline can hold it, the item is deferred.
//!
//! Every placement passes the overlap guard before it is accepted, is carved out
//! of the free windows with the buffer applied, and joins the committed set.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::{at_local_time, local_date, round_down_in, round_up_in};
use crate::config::SlotRules;
use crate::conflict::admit;
use crate::error::{EngineError, Result};
use crate::freebusy::DayWindows;
use crate::hint::{resolve_hint, ResolvedHint};
use crate::interval::{overlaps, subtract_all, BusyInterval, FreeWindow, Span};

/// Duration assumed for an item with no usable estimate.
pub const DEFAULT_ESTIMATE_MINUTES: u32 = 120;
pub const MIN_ESTIMATE_MINUTES: u32 = 30;
pub const MAX_ESTIMATE_MINUTES: u32 = 360;

/// A unit of work that needs a slot before its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Placement order; lower goes first.
    pub sequence: u32,
    pub estimated_minutes: u32,
    #[serde(default)]
    pub raw_time_hint: Option<String>,
    pub deadline: DateTime<Utc>,
}

impl WorkItem {
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.estimated_minutes))
    }

    pub fn validate(&self) -> Result<()> {
        if self.estimated_minutes == 0 {
            return Err(EngineError::InvalidWorkItem {
                sequence: self.sequence,
                reason: "estimated duration must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Convert a free-form hour estimate into minutes.
    ///
    /// Missing or non-finite estimates fall back to two hours; everything else
    /// is clamped to half an hour through six hours.
    pub fn minutes_from_hours(hours: Option<f64>) -> u32 {
        match hours {
            Some(h) if h.is_finite() => {
                let minutes = (h * 60.0).round();
                minutes.clamp(
                    f64::from(MIN_ESTIMATE_MINUTES),
                    f64::from(MAX_ESTIMATE_MINUTES),
                ) as u32
            }
            _ => DEFAULT_ESTIMATE_MINUTES,
        }
    }
}

/// The deadline implied by a date-only due date: 23:59 local time.
pub fn end_of_day_deadline(date: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    at_local_time(tz, date, NaiveTime::from_hms_opt(23, 59, 0)?)
}

/// When a recorded item is due: an exact instant, or just a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Due {
    At(DateTime<Utc>),
    Date(NaiveDate),
}

/// A work item as callers usually record it: an estimate in hours that may be
/// missing, and a due date that may lack a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub sequence: u32,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub raw_time_hint: Option<String>,
    pub due: Due,
}

impl ItemRecord {
    /// Normalise into a [`WorkItem`], reading a bare due date as 23:59 in `tz`.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidWorkItem` when the due date has no 23:59
    /// in `tz`.
    pub fn to_work_item(&self, tz: &Tz) -> Result<WorkItem> {
        let deadline = match self.due {
            Due::At(at) => at,
            Due::Date(date) => {
                end_of_day_deadline(date, tz).ok_or_else(|| EngineError::InvalidWorkItem {
                    sequence: self.sequence,
                    reason: format!("due date {date} has no end of day in {tz}"),
                })?
            }
        };
        Ok(WorkItem {
            sequence: self.sequence,
            estimated_minutes: WorkItem::minutes_from_hours(self.estimated_hours),
            raw_time_hint: self.raw_time_hint.clone(),
            deadline,
        })
    }
}

/// The accepted time assignment for one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub work_item_sequence: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub matched_preferred: bool,
}

impl Span for Placement {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }

    fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

impl From<&Placement> for BusyInterval {
    fn from(placement: &Placement) -> Self {
        BusyInterval {
            start: placement.start,
            end: placement.end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferReason {
    /// The deadline is not after the start of the scheduling horizon.
    DeadlinePassed,
    /// No free window before the deadline is long enough.
    NoCapacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deferral {
    pub work_item_sequence: u32,
    pub reason: DeferReason,
}

/// Lifecycle of a work item within one run.
///
/// `Placed` and `Failed` are terminal. `Deferred` is left to the caller, who may
/// widen the horizon or shorten other items and run again. `Failed` is only
/// observable through the error that aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Pending,
    Placed,
    Deferred,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleEntry {
    Placed(Placement),
    Deferred(Deferral),
}

impl ScheduleEntry {
    pub fn sequence(&self) -> u32 {
        match self {
            ScheduleEntry::Placed(p) => p.work_item_sequence,
            ScheduleEntry::Deferred(d) => d.work_item_sequence,
        }
    }

    pub fn state(&self) -> ItemState {
        match self {
            ScheduleEntry::Placed(_) => ItemState::Placed,
            ScheduleEntry::Deferred(_) => ItemState::Deferred,
        }
    }
}

/// The outcome of one run, one entry per work item in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub entries: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.entries.iter().filter_map(|entry| match entry {
            ScheduleEntry::Placed(p) => Some(p),
            ScheduleEntry::Deferred(_) => None,
        })
    }

    pub fn deferred(&self) -> impl Iterator<Item = &Deferral> {
        self.entries.iter().filter_map(|entry| match entry {
            ScheduleEntry::Deferred(d) => Some(d),
            ScheduleEntry::Placed(_) => None,
        })
    }

    pub fn entry(&self, sequence: u32) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.sequence() == sequence)
    }

    /// True when every item was placed.
    pub fn is_complete(&self) -> bool {
        self.deferred().next().is_none()
    }

    /// Minutes placed per local calendar day.
    pub fn load_by_day(&self, tz: &Tz) -> BTreeMap<NaiveDate, i64> {
        let mut load = BTreeMap::new();
        for placement in self.placements() {
            *load.entry(local_date(placement.start, tz)).or_insert(0) +=
                placement.duration_minutes();
        }
        load
    }
}

/// Run-wide inputs the allocator does not own.
#[derive(Debug, Clone, Copy)]
pub struct AllocationContext<'a> {
    /// The caller's current time, used to resolve relative hints.
    pub now: DateTime<Utc>,
    /// Nothing is placed before this instant.
    pub horizon_start: DateTime<Utc>,
    pub tz: &'a Tz,
    pub rules: SlotRules,
}

/// Place `items` into `days`, never clashing with `busy` or with each other.
///
/// # Errors
/// Returns `EngineError::InvalidWorkItem` before placing anything if an item has
/// a zero duration, and `EngineError::AllocationInvariantViolation` if a
/// placement fails the overlap guard. No partial schedule is returned.
pub fn allocate(
    items: &[WorkItem],
    days: Vec<DayWindows>,
    busy: &[BusyInterval],
    ctx: &AllocationContext<'_>,
) -> Result<Schedule> {
    for item in items {
        item.validate()?;
    }

    let mut order: Vec<&WorkItem> = items.iter().collect();
    order.sort_by_key(|item| item.sequence);

    let mut run = Run {
        ctx,
        days,
        committed: busy.to_vec(),
        load: BTreeMap::new(),
    };

    let mut schedule = Schedule::default();
    for item in order {
        tracing::debug!(sequence = item.sequence, state = ?ItemState::Pending, "allocating work item");
        let entry = run.place(item)?;
        tracing::debug!(sequence = item.sequence, state = ?entry.state(), "work item settled");
        schedule.entries.push(entry);
    }
    Ok(schedule)
}

/// Mutable state of one allocation run.
struct Run<'c, 'a> {
    ctx: &'c AllocationContext<'a>,
    days: Vec<DayWindows>,
    committed: Vec<BusyInterval>,
    /// Minutes placed per day in this run.
    load: BTreeMap<NaiveDate, i64>,
}

/// A window able to hold the item, with the range of clean start times it offers.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    date: NaiveDate,
    window: FreeWindow,
    earliest: DateTime<Utc>,
    latest: DateTime<Utc>,
}

impl Run<'_, '_> {
    fn place(&mut self, item: &WorkItem) -> Result<ScheduleEntry> {
        let ctx = self.ctx;
        if item.deadline <= ctx.horizon_start {
            return Ok(deferred(item, DeferReason::DeadlinePassed));
        }

        let duration = item.duration();
        let candidates = self.candidates(item, duration);
        let hint = resolve_hint(
            item.raw_time_hint.as_deref(),
            ctx.now,
            item.deadline,
            ctx.tz,
        );

        let chosen = hint
            .and_then(|hint| preferred_start(&candidates, &hint, duration))
            .map(|(date, start)| (date, start, true))
            .or_else(|| {
                self.least_loaded(&candidates)
                    .map(|c| (c.date, c.earliest, false))
            });

        let Some((date, start, matched_preferred)) = chosen else {
            tracing::debug!(sequence = item.sequence, minutes = item.estimated_minutes, "no window before deadline");
            return Ok(deferred(item, DeferReason::NoCapacity));
        };

        let placement = Placement {
            work_item_sequence: item.sequence,
            start,
            end: start + duration,
            matched_preferred,
        };
        if let Err(err) = admit(&placement, &self.committed, ctx.rules.buffer) {
            tracing::error!(sequence = item.sequence, state = ?ItemState::Failed, %err, "placement rejected by overlap guard");
            return Err(err);
        }
        self.commit(date, &placement);
        tracing::debug!(
            sequence = item.sequence,
            start = %placement.start,
            end = %placement.end,
            matched_preferred,
            "work item placed"
        );
        Ok(ScheduleEntry::Placed(placement))
    }

    /// Windows on days up to the deadline, clipped to end by the deadline,
    /// that can still hold `duration` at a clean start time.
    fn candidates(&self, item: &WorkItem, duration: Duration) -> Vec<Candidate> {
        let tz = self.ctx.tz;
        let last_day = local_date(item.deadline, tz);

        self.days
            .iter()
            .take_while(|day| day.date <= last_day)
            .flat_map(|day| day.windows.iter().map(move |w| (day.date, *w)))
            .filter(|(_, w)| w.start <= item.deadline)
            .filter_map(|(date, w)| {
                let end = w.end.min(item.deadline);
                let earliest = round_up_in(w.start, tz);
                let latest = round_down_in(end - duration, tz);
                (earliest <= latest).then_some(Candidate {
                    date,
                    window: w,
                    earliest,
                    latest,
                })
            })
            .collect()
    }

    fn least_loaded(&self, candidates: &[Candidate]) -> Option<Candidate> {
        candidates.iter().copied().min_by_key(|c| {
            (
                self.load.get(&c.date).copied().unwrap_or(0),
                c.date,
                c.window.start,
            )
        })
    }

    fn commit(&mut self, date: NaiveDate, placement: &Placement) {
        let rules = self.ctx.rules;
        for day in &mut self.days {
            if day
                .windows
                .iter()
                .any(|w| overlaps(w, placement, rules.buffer))
            {
                day.windows = subtract_all(&day.windows, placement, rules.buffer, rules.min_slot);
            }
        }
        self.days.retain(|day| !day.windows.is_empty());
        *self.load.entry(date).or_insert(0) += placement.duration_minutes();
        self.committed.push(BusyInterval::from(placement));
    }
}

/// The clean start closest to the hint's target whose span still overlaps
/// `[target, target + duration)`. Ties go to the earliest start.
fn preferred_start(
    candidates: &[Candidate],
    hint: &ResolvedHint,
    duration: Duration,
) -> Option<(NaiveDate, DateTime<Utc>)> {
    let target = hint.target;
    candidates
        .iter()
        .filter_map(|c| {
            let start = target.clamp(c.earliest, c.latest);
            let overlaps_target = start < target + duration && start + duration > target;
            overlaps_target.then_some((c.date, start))
        })
        .min_by_key(|(_, start)| ((*start - target).abs(), *start))
}

fn deferred(item: &WorkItem, reason: DeferReason) -> ScheduleEntry {
    ScheduleEntry::Deferred(Deferral {
        work_item_sequence: item.sequence,
        reason,
    })
}
