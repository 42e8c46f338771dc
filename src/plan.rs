//! Timestamp plans.
//!
//! A [`TimestampPlan`] is the full, ordered list of `(timestamp, label)`
//! samples one extraction run will capture. It is derived from the caller's
//! intervals and a sampling rate, built fresh for every run, and never
//! persisted.

use std::collections::HashSet;

use crate::analysis::estimate_total_samples;
use crate::interval::Interval;

/// Planned timestamps are snapped to this resolution (one microsecond, the
/// container seek resolution) so that samples from different intervals that
/// land on the same instant compare equal.
pub const TIMESTAMP_RESOLUTION: f64 = 1.0 / TICKS_PER_SECOND;

const TICKS_PER_SECOND: f64 = 1_000_000.0;

/// One sample the run will capture.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSample {
    /// When to seek, in seconds.
    pub timestamp: f64,
    /// Label the captured frame will carry.
    pub label: String,
    /// Position of the originating interval in the caller's list.
    pub interval_index: usize,
}

/// Ordered, deduplicated sample timestamps for one run.
///
/// Intervals are walked in the order the caller supplied them (not the
/// canonical sort order); within an interval, timestamps step from `start`
/// to `end` inclusive in increments of `1 / fps`. A `(timestamp, label)`
/// pair already planned by an earlier interval is not planned again.
/// Zero-length intervals contribute no samples.
///
/// # Example
///
/// ```
/// use labelframes::{Interval, TimestampPlan};
///
/// let plan = TimestampPlan::build(&[Interval::new(0.0, 1.0, "a")], 2.0);
/// let times: Vec<f64> = plan.iter().map(|s| s.timestamp).collect();
/// assert_eq!(times, vec![0.0, 0.5, 1.0]);
/// assert_eq!(plan.estimated_total(), 2);
/// ```
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct TimestampPlan {
    samples: Vec<PlannedSample>,
    fps: f64,
    estimated_total: u64,
}

impl TimestampPlan {
    /// Build the plan for `intervals` sampled at `fps`.
    ///
    /// A non-positive or non-finite `fps` yields an empty plan; sessions
    /// reject such rates during validation before ever building one.
    pub fn build(intervals: &[Interval], fps: f64) -> Self {
        if !fps.is_finite() || fps <= 0.0 {
            return Self::default();
        }

        let mut samples = Vec::new();
        let mut seen: HashSet<(i64, &str)> = HashSet::new();

        for (interval_index, interval) in intervals.iter().enumerate() {
            let bounded = interval.start.is_finite() && interval.end.is_finite();
            if !bounded || interval.is_degenerate() || interval.end < interval.start {
                continue;
            }

            let mut step: u64 = 0;
            loop {
                let timestamp = snap(interval.start + step as f64 / fps);
                if timestamp > interval.end + TIMESTAMP_RESOLUTION / 2.0 {
                    break;
                }
                step += 1;

                let key = (to_ticks(timestamp), interval.label.as_str());
                if !seen.insert(key) {
                    continue;
                }
                samples.push(PlannedSample {
                    timestamp,
                    label: interval.label.clone(),
                    interval_index,
                });
            }
        }

        Self {
            samples,
            fps,
            estimated_total: estimate_total_samples(intervals, fps),
        }
    }

    /// The planned samples in capture order.
    pub fn samples(&self) -> &[PlannedSample] {
        &self.samples
    }

    /// Iterate over the planned samples in capture order.
    pub fn iter(&self) -> std::slice::Iter<'_, PlannedSample> {
        self.samples.iter()
    }

    /// Number of planned samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if nothing will be captured.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sampling rate the plan was built with.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Progress denominator, fixed before sampling begins.
    ///
    /// See [`estimate_total_samples`]; this may differ from [`len`](Self::len)
    /// by boundary rounding.
    pub fn estimated_total(&self) -> u64 {
        self.estimated_total
    }
}

impl<'a> IntoIterator for &'a TimestampPlan {
    type Item = &'a PlannedSample;
    type IntoIter = std::slice::Iter<'a, PlannedSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

fn to_ticks(seconds: f64) -> i64 {
    (seconds * TICKS_PER_SECOND).round() as i64
}

fn snap(seconds: f64) -> f64 {
    to_ticks(seconds) as f64 / TICKS_PER_SECOND
}
