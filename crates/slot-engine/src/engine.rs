//! The scheduling entry point.
//!
//! A [`SlotEngine`] holds validated configuration and nothing else. Each call
//! takes an immutable snapshot of the caller's calendar and work items, builds
//! its own free windows and placements, and returns. Engines can be shared
//! freely across threads; runs for the same user's calendar must be serialised
//! by the caller.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::allocator::{allocate, AllocationContext, ItemRecord, Schedule, WorkItem};
use crate::config::{EngineConfig, SlotRules, WorkingDayPolicy};
use crate::error::Result;
use crate::freebusy::{build_free_windows, DayWindows};
use crate::hint::{resolve_hint, ResolvedHint};
use crate::interval::BusyInterval;

/// One scheduling run's input snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// The caller's current time. The engine never reads a clock.
    pub now: DateTime<Utc>,
    /// Optional lower bound for placements; ignored when earlier than `now`.
    #[serde(default)]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub busy: Vec<BusyInterval>,
    #[serde(default)]
    pub items: Vec<WorkItem>,
    /// Items with hour estimates and possibly date-only due dates; normalised
    /// in the engine's zone and scheduled after `items` of equal sequence.
    #[serde(default)]
    pub records: Vec<ItemRecord>,
    /// Overrides the configured working-day policy for this run.
    #[serde(default)]
    pub policy: Option<WorkingDayPolicy>,
}

impl ScheduleRequest {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            not_before: None,
            busy: Vec::new(),
            items: Vec::new(),
            records: Vec::new(),
            policy: None,
        }
    }

    pub fn horizon_start(&self) -> DateTime<Utc> {
        self.not_before.map_or(self.now, |bound| bound.max(self.now))
    }
}

#[derive(Debug, Clone)]
pub struct SlotEngine {
    config: EngineConfig,
    tz: Tz,
    rules: SlotRules,
}

impl SlotEngine {
    /// # Errors
    /// Returns the first configuration problem found by [`EngineConfig::validate`].
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let tz = config.tz()?;
        let rules = config.rules();
        Ok(Self { config, tz, rules })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    /// Free windows per day from the horizon start through the latest deadline.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidInterval` for a malformed busy interval and
    /// `EngineError::InvalidPolicy` for a malformed policy override.
    pub fn free_windows(&self, request: &ScheduleRequest) -> Result<Vec<DayWindows>> {
        let items = self.work_items(request)?;
        self.windows_for(request, &items)
    }

    /// Every work item of `request`: `items` as given, then `records` normalised
    /// with this engine's zone.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidWorkItem` for a record whose due date
    /// cannot be resolved.
    pub fn work_items(&self, request: &ScheduleRequest) -> Result<Vec<WorkItem>> {
        let mut items = request.items.clone();
        for record in &request.records {
            items.push(record.to_work_item(&self.tz)?);
        }
        Ok(items)
    }

    /// Windows from the horizon start through the latest deadline of `items`.
    fn windows_for(
        &self,
        request: &ScheduleRequest,
        items: &[WorkItem],
    ) -> Result<Vec<DayWindows>> {
        let policy = request.policy.unwrap_or(self.config.policy);
        let Some(until) = items.iter().map(|item| item.deadline).max() else {
            policy.validate()?;
            for interval in &request.busy {
                interval.validate()?;
            }
            return Ok(Vec::new());
        };
        build_free_windows(
            &request.busy,
            &policy,
            &self.tz,
            request.horizon_start(),
            until,
            &self.rules,
        )
    }

    /// Place every work item of `request`, deferring the ones that do not fit.
    ///
    /// # Errors
    /// Fails without a partial schedule on malformed input
    /// (`InvalidInterval`, `InvalidPolicy`, `InvalidWorkItem`) or on an
    /// `AllocationInvariantViolation`.
    pub fn schedule(&self, request: &ScheduleRequest) -> Result<Schedule> {
        let items = self.work_items(request)?;
        let days = self.windows_for(request, &items)?;
        tracing::debug!(
            items = items.len(),
            busy = request.busy.len(),
            days = days.len(),
            "starting scheduling run"
        );

        let ctx = AllocationContext {
            now: request.now,
            horizon_start: request.horizon_start(),
            tz: &self.tz,
            rules: self.rules,
        };
        let schedule = allocate(&items, days, &request.busy, &ctx)?;

        tracing::debug!(
            placed = schedule.placements().count(),
            deferred = schedule.deferred().count(),
            "scheduling run finished"
        );
        Ok(schedule)
    }

    /// Resolve one time hint with this engine's zone.
    pub fn resolve_hint(
        &self,
        raw: &str,
        now: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Option<ResolvedHint> {
        resolve_hint(Some(raw), now, deadline, &self.tz)
    }
}

impl Default for SlotEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            tz: Tz::UTC,
            rules: SlotRules::default(),
        }
    }
}
