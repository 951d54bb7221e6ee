//! Detect buffered overlaps, and the admission check every placement must pass.
//!
//! Two spans conflict when they come closer than the buffer:
//! `a.end + buffer > b.start && b.end + buffer > a.start`. With a zero buffer,
//! adjacent spans (one ends exactly when the other starts) are NOT conflicts.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::allocator::Placement;
use crate::error::{EngineError, Result};
use crate::interval::{overlaps, BusyInterval, Span};

/// A detected conflict between two spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub first: BusyInterval,
    pub second: BusyInterval,
    /// Raw overlap, ignoring the buffer. Zero when the spans only violate the buffer.
    pub overlap_minutes: i64,
}

/// Find all pairwise conflicts between two span lists.
pub fn find_conflicts<A: Span, B: Span>(a: &[A], b: &[B], buffer: Duration) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for x in a {
        for y in b {
            if overlaps(x, y, buffer) {
                let overlap_start = x.start().max(y.start());
                let overlap_end = x.end().min(y.end());
                let overlap_minutes = (overlap_end - overlap_start).num_minutes().max(0);

                conflicts.push(Conflict {
                    first: as_interval(x),
                    second: as_interval(y),
                    overlap_minutes,
                });
            }
        }
    }

    conflicts
}

/// Find conflicts among the members of one list, each unordered pair once.
pub fn find_internal_conflicts<A: Span>(spans: &[A], buffer: Duration) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for (i, x) in spans.iter().enumerate() {
        conflicts.extend(find_conflicts(std::slice::from_ref(x), &spans[i + 1..], buffer));
    }
    conflicts
}

/// Admit `placement` only if it keeps the buffer to every committed interval.
///
/// # Errors
/// Returns `EngineError::AllocationInvariantViolation` naming the first blocker.
pub fn admit(placement: &Placement, committed: &[BusyInterval], buffer: Duration) -> Result<()> {
    match committed.iter().find(|c| overlaps(placement, *c, buffer)) {
        None => Ok(()),
        Some(blocker) => Err(EngineError::AllocationInvariantViolation {
            sequence: placement.work_item_sequence,
            start: placement.start,
            end: placement.end,
            blocker_start: blocker.start,
            blocker_end: blocker.end,
        }),
    }
}

fn as_interval<S: Span>(span: &S) -> BusyInterval {
    BusyInterval {
        start: span.start(),
        end: span.end(),
    }
}
