//! Half-open time intervals and the buffered arithmetic the engine is built on.
//!
//! Busy time is subtracted from free windows with a buffer applied on both sides
//! of the busy interval. Any remaining piece shorter than the minimum slot length
//! is discarded, which keeps the subtraction order-independent: the surviving
//! windows are exactly the maximal gaps long enough to be useful, whatever order
//! the busy intervals arrive in.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Anything with a start and an end instant.
pub trait Span {
    fn start(&self) -> DateTime<Utc>;
    fn end(&self) -> DateTime<Utc>;

    fn duration_minutes(&self) -> i64 {
        (self.end() - self.start()).num_minutes()
    }
}

/// A block of already-committed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    /// Build a busy interval, rejecting empty or inverted ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        let interval = Self { start, end };
        interval.validate()?;
        Ok(interval)
    }

    /// Check `start < end`. Deserialized intervals bypass [`BusyInterval::new`],
    /// so the free-window builder re-validates every input.
    pub fn validate(&self) -> Result<()> {
        if self.start < self.end {
            Ok(())
        } else {
            Err(EngineError::InvalidInterval {
                start: self.start,
                end: self.end,
            })
        }
    }
}

impl Span for BusyInterval {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }

    fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// An unoccupied stretch of working time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FreeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FreeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl Span for FreeWindow {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }

    fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Buffered overlap test: `a.end + buffer > b.start && b.end + buffer > a.start`.
///
/// With a zero buffer, adjacent intervals (one ends exactly when the other
/// starts) do not overlap.
pub fn overlaps<A: Span + ?Sized, B: Span + ?Sized>(a: &A, b: &B, buffer: Duration) -> bool {
    a.end() + buffer > b.start() && b.end() + buffer > a.start()
}

/// Remove `busy`, widened by `buffer` on both sides, from `window`.
///
/// Yields zero, one, or two windows in chronological order. Pieces shorter than
/// `min_slot` are dropped, including an untouched `window` that is itself too short.
pub fn subtract<B: Span + ?Sized>(
    window: &FreeWindow,
    busy: &B,
    buffer: Duration,
    min_slot: Duration,
) -> Vec<FreeWindow> {
    let blocked_start = busy.start() - buffer;
    let blocked_end = busy.end() + buffer;

    let mut pieces = Vec::with_capacity(2);
    if blocked_end <= window.start || blocked_start >= window.end {
        pieces.push(*window);
    } else {
        if blocked_start > window.start {
            pieces.push(FreeWindow::new(window.start, blocked_start));
        }
        if blocked_end < window.end {
            pieces.push(FreeWindow::new(blocked_end, window.end));
        }
    }

    pieces.retain(|piece| piece.len() >= min_slot);
    pieces
}

/// Subtract `busy` from every window in an ordered list, keeping the order.
pub fn subtract_all<B: Span + ?Sized>(
    windows: &[FreeWindow],
    busy: &B,
    buffer: Duration,
    min_slot: Duration,
) -> Vec<FreeWindow> {
    windows
        .iter()
        .flat_map(|window| subtract(window, busy, buffer, min_slot))
        .collect()
}
