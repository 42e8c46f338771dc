//! Labeled time intervals.
//!
//! An [`Interval`] is a `[start, end]` range of a video, in seconds, tagged
//! with the class label every frame sampled from it will carry. Intervals are
//! plain values: the caller builds them and passes them in, and nothing in
//! this crate mutates an interval it did not create.
//!
//! # Ordering
//!
//! Intervals have a total order: by `start`, then by `end`, then by `label`
//! (lexicographically). Gap computation sorts by this order, so any two
//! callers holding the same set of intervals get identical results
//! regardless of the order they were declared in.
//!
//! ```
//! use labelframes::Interval;
//!
//! let mut intervals = vec![
//!     Interval::new(4.0, 8.0, "dog"),
//!     Interval::new(0.0, 5.0, "cat"),
//!     Interval::new(0.0, 5.0, "bird"),
//! ];
//! intervals.sort();
//! assert_eq!(intervals[0].label, "bird");
//! assert_eq!(intervals[2].label, "dog");
//! ```

use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A labeled `[start, end]` time range, in seconds.
#[derive(Debug, Clone)]
#[must_use]
pub struct Interval {
    /// Start of the range, in seconds.
    pub start: f64,
    /// End of the range (inclusive), in seconds.
    pub end: f64,
    /// Class label attached to every frame sampled from this range.
    pub label: String,
}

impl Interval {
    /// Create a new interval.
    ///
    /// No validation happens here; malformed intervals are rejected when a
    /// session validates its request.
    pub fn new(start: f64, end: f64, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    /// Length of the interval in seconds (negative if malformed).
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Returns `true` if `start == end`.
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if `timestamp` lies within `[start, end]`.
    pub fn contains(&self, timestamp: f64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// Returns `true` if the open ranges of `self` and `other` intersect.
    ///
    /// Touching endpoints (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Interval {}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .total_cmp(&other.start)
            .then_with(|| self.end.total_cmp(&other.end))
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{:.2}s, {:.2}s] {}", self.start, self.end, self.label)
    }
}

/// A sub-range of `[0, duration]` not covered by any interval.
///
/// Produced by [`compute_gaps`](crate::analysis::compute_gaps); never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gap {
    /// Start of the uncovered range, in seconds.
    pub start: f64,
    /// End of the uncovered range, in seconds.
    pub end: f64,
}

impl Gap {
    /// Length of the gap in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl Display for Gap {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Start: {:.2}s - End: {:.2}s", self.start, self.end)
    }
}
