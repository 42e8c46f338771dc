//! Interval analysis: overlap detection, gap computation, and sample
//! estimation.
//!
//! Every function here is pure. They run during session validation and can
//! also be called directly, e.g. to show coverage diagnostics while the user
//! is still editing intervals.
//!
//! # Example
//!
//! ```
//! use labelframes::{Interval, analysis};
//!
//! let intervals = vec![Interval::new(0.0, 5.0, "a"), Interval::new(4.0, 8.0, "b")];
//!
//! let overlaps = analysis::detect_overlaps(&intervals);
//! assert_eq!(overlaps.pairs(), &[(0, 1)]);
//!
//! assert!(analysis::compute_gaps(&intervals, 8.0).is_empty());
//! assert_eq!(analysis::estimate_total_samples(&intervals, 2.0), 18);
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::interval::{Gap, Interval};

/// Offset subtracted from the next interval's start when reporting the end
/// of a gap, leaving a visible one-second boundary between a gap and the
/// interval that follows it.
pub const GAP_BOUNDARY_SECONDS: f64 = 1.0;

/// Pairs of intervals whose open ranges intersect.
///
/// Indices refer to positions in the slice passed to [`detect_overlaps`] and
/// are always ordered `i < j`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct OverlapReport {
    pairs: Vec<(usize, usize)>,
}

impl OverlapReport {
    /// The overlapping `(i, j)` pairs, in row-major order.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Returns `true` if no two intervals overlap.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of overlapping pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Human-readable descriptions using one-based interval numbers.
    pub fn messages(&self) -> Vec<String> {
        self.pairs
            .iter()
            .map(|(i, j)| format!("Interval {} overlaps with Interval {}", i + 1, j + 1))
            .collect()
    }

    pub(crate) fn into_pairs(self) -> Vec<(usize, usize)> {
        self.pairs
    }
}

impl Display for OverlapReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.messages().join(", "))
    }
}

/// Find every pair of intervals that overlap.
///
/// Two intervals overlap iff `a.start < b.end && a.end > b.start`; touching
/// endpoints do not count. All `n·(n-1)/2` pairs are compared, which is fine
/// for the tens of intervals a single video carries.
pub fn detect_overlaps(intervals: &[Interval]) -> OverlapReport {
    let mut pairs = Vec::new();
    for (i, a) in intervals.iter().enumerate() {
        for (offset, b) in intervals[i + 1..].iter().enumerate() {
            if a.overlaps(b) {
                pairs.push((i, i + 1 + offset));
            }
        }
    }
    OverlapReport { pairs }
}

/// Compute the ranges of `[0, total_duration]` not covered by any interval.
///
/// Intervals are swept in canonical order (see [`Interval`]) while tracking
/// the furthest end seen so far. A gap ending right before an interval is
/// reported as ending [`GAP_BOUNDARY_SECONDS`] before that interval's start.
/// The trailing gap runs to `total_duration` exactly. No reported gap ends
/// past `total_duration` or before its own start, so an uncovered hole
/// between two intervals that is narrower than [`GAP_BOUNDARY_SECONDS`]
/// (say `[0, 5]` and `[5.5, 8]`) is not reported at all; use
/// [`covered_duration`] to detect such holes.
pub fn compute_gaps(intervals: &[Interval], total_duration: f64) -> Vec<Gap> {
    let total_duration = if total_duration.is_finite() {
        total_duration.max(0.0)
    } else {
        0.0
    };

    let mut sorted: Vec<&Interval> = intervals.iter().collect();
    sorted.sort();

    let mut gaps = Vec::new();
    let mut last_end = 0.0_f64;

    for interval in sorted {
        if interval.start > last_end && last_end < total_duration {
            let end = (interval.start - GAP_BOUNDARY_SECONDS).min(total_duration);
            if end >= last_end {
                gaps.push(Gap {
                    start: last_end,
                    end,
                });
            }
        }
        last_end = last_end.max(interval.end);
    }

    if last_end < total_duration {
        gaps.push(Gap {
            start: last_end,
            end: total_duration,
        });
    }

    gaps
}

/// Estimate how many samples a run will capture.
///
/// Sums `floor((end - start) * fps)` over all intervals. This is the fixed
/// progress denominator; the sampler may emit one more sample per interval
/// because interval ends are inclusive.
pub fn estimate_total_samples(intervals: &[Interval], fps: f64) -> u64 {
    if !fps.is_finite() || fps <= 0.0 {
        return 0;
    }
    intervals
        .iter()
        .map(|interval| (interval.duration() * fps).floor().max(0.0) as u64)
        .sum()
}

/// Total length of `[0, total_duration]` covered by the union of intervals.
pub fn covered_duration(intervals: &[Interval], total_duration: f64) -> f64 {
    let mut sorted: Vec<&Interval> = intervals.iter().collect();
    sorted.sort();

    let mut covered = 0.0;
    let mut cursor = 0.0_f64;
    for interval in sorted {
        let start = interval.start.max(cursor);
        let end = interval.end.min(total_duration);
        if end > start {
            covered += end - start;
        }
        cursor = cursor.max(interval.end);
    }
    covered
}
