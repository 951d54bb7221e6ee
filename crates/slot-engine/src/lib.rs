//! # slot-engine
//!
//! Deterministic time-slot scheduling for deadline-bound work.
//!
//! Given a user's existing commitments and a list of work items, the engine
//! computes a conflict-free placement of each item into the user's working
//! hours. It honors a preferred-time hint when it can, otherwise spreads load
//! evenly across days, and never double-books. Items that cannot fit before
//! their deadline are reported as deferred rather than clipped.
//!
//! The engine is synchronous and never reads a clock: "now" is always an input.
//!
//! ## Modules
//!
//! - [`interval`]: Busy intervals, free windows, buffered overlap and subtraction
//! - [`calendar`]: Calendar-day iteration, local time, half-hour rounding
//! - [`freebusy`]: Free windows per day from busy intervals and working hours
//! - [`hint`]: Preferred-time hint resolution
//! - [`allocator`]: Work items, placements, and the placement heuristic
//! - [`conflict`]: Overlap detection and the admission guard
//! - [`engine`]: [`SlotEngine`] entry point
//! - [`config`]: Working-day policy and engine configuration
//! - [`error`]: Error types

pub mod allocator;
pub mod calendar;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod freebusy;
pub mod hint;
pub mod interval;

pub use allocator::{
    DeferReason, Deferral, Due, ItemRecord, ItemState, Placement, Schedule, ScheduleEntry,
    WorkItem,
};
pub use calendar::round_up_to_half_hour;
pub use config::{EngineConfig, SlotRules, WorkingDayPolicy};
pub use conflict::find_conflicts;
pub use engine::{ScheduleRequest, SlotEngine};
pub use error::EngineError;
pub use freebusy::{build_free_windows, DayWindows};
pub use hint::{resolve_hint, Confidence, PartOfDay, ResolvedHint};
pub use interval::{overlaps, subtract, BusyInterval, FreeWindow, Span};
