//! Extraction request validation.
//!
//! [`validate_request`] inspects a set of intervals and a sampling rate and
//! returns a [`ValidationReport`] describing hard errors (which block
//! extraction), warnings (overlaps, zero-length intervals, intervals running
//! past the end of the video), and informational notices (coverage gaps,
//! the sample estimate).
//!
//! # Example
//!
//! ```
//! use labelframes::{ExtractionConfig, Interval, validate_request};
//!
//! let intervals = vec![Interval::new(0.0, 5.0, "a"), Interval::new(4.0, 8.0, "b")];
//! let report = validate_request(&intervals, 1.0, Some(10.0), &ExtractionConfig::new());
//!
//! assert!(report.is_valid());
//! assert_eq!(report.overlaps.pairs(), &[(0, 1)]);
//! assert_eq!(report.gaps.len(), 1);
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::analysis::{OverlapReport, compute_gaps, detect_overlaps, estimate_total_samples};
use crate::configuration::{ExtractionConfig, OverlapPolicy};
use crate::error::LabelFramesError;
use crate::interval::{Gap, Interval};

/// Summary of request validation.
///
/// Only errors make a report invalid; overlaps are warnings unless the
/// configuration's [`OverlapPolicy`] says otherwise.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Informational notices (not problems).
    pub info: Vec<String>,
    /// Non-fatal issues worth showing the user.
    pub warnings: Vec<String>,
    /// Fatal issues that prevent extraction.
    pub errors: Vec<String>,
    /// Overlapping interval pairs.
    pub overlaps: OverlapReport,
    /// Uncovered ranges of the video (empty when the duration is unknown).
    pub gaps: Vec<Gap>,
    /// Progress denominator the run will use.
    pub estimated_total: u64,
    violations: Vec<LabelFramesError>,
}

impl ValidationReport {
    /// Returns `true` if no errors were found.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Total number of issues (info + warnings + errors).
    pub fn issue_count(&self) -> usize {
        self.info.len() + self.warnings.len() + self.errors.len()
    }

    /// Convert into a `Result`, failing with the first error found.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, in the order checks ran: the
    /// sampling rate, then each interval in caller order, then overlaps.
    pub fn into_result(mut self) -> Result<Self, LabelFramesError> {
        if self.violations.is_empty() {
            Ok(self)
        } else {
            Err(self.violations.remove(0))
        }
    }

    fn reject(&mut self, error: LabelFramesError) {
        self.errors.push(error.to_string());
        self.violations.push(error);
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for item in &self.info {
            writeln!(f, "[INFO] {item}")?;
        }
        for item in &self.warnings {
            writeln!(f, "[WARN] {item}")?;
        }
        for item in &self.errors {
            writeln!(f, "[ERROR] {item}")?;
        }
        if self.issue_count() == 0 {
            writeln!(f, "No issues found.")?;
        }
        Ok(())
    }
}

/// Validate an extraction request.
///
/// `duration` is the video length in seconds, when known; it enables gap
/// computation and the "runs past the end" warning.
pub fn validate_request(
    intervals: &[Interval],
    fps: f64,
    duration: Option<f64>,
    config: &ExtractionConfig,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    // ── Sampling rate ──────────────────────────────────────────────
    if !fps.is_finite() || fps <= 0.0 {
        report.reject(LabelFramesError::InvalidFrameRate(fps));
    }

    // ── Per-interval checks ────────────────────────────────────────
    for (index, interval) in intervals.iter().enumerate() {
        let bad_bound = [interval.start, interval.end]
            .into_iter()
            .find(|value| !value.is_finite() || *value < 0.0);

        if let Some(value) = bad_bound {
            report.reject(LabelFramesError::InvalidTime { index, value });
        } else if interval.end < interval.start {
            report.reject(LabelFramesError::InvalidInterval {
                index,
                start: interval.start,
                end: interval.end,
            });
        } else if interval.is_degenerate() {
            if config.reject_zero_length {
                report.reject(LabelFramesError::ZeroLengthInterval {
                    index,
                    at: interval.start,
                });
            } else {
                report.warnings.push(format!(
                    "Interval {} is zero-length ({:.2}s) and contributes no samples",
                    index + 1,
                    interval.start,
                ));
            }
        }

        if interval.label.trim().is_empty() {
            report.reject(LabelFramesError::EmptyLabel { index });
        }

        if let Some(duration) = duration {
            if interval.end > duration && interval.end.is_finite() {
                report.warnings.push(format!(
                    "Interval {} ends at {:.2}s, past the end of the video ({:.2}s)",
                    index + 1,
                    interval.end,
                    duration,
                ));
            }
        }
    }

    // ── Overlaps ───────────────────────────────────────────────────
    let overlaps = detect_overlaps(intervals);
    if !overlaps.is_empty() {
        match config.overlap_policy {
            OverlapPolicy::Warn => {
                report
                    .warnings
                    .push(format!("Overlaps detected: {overlaps}"));
            }
            OverlapPolicy::Reject => {
                report.reject(LabelFramesError::OverlappingIntervals {
                    pairs: overlaps.clone().into_pairs(),
                });
            }
        }
    }
    report.overlaps = overlaps;

    // ── Coverage ───────────────────────────────────────────────────
    if let Some(duration) = duration {
        report.gaps = compute_gaps(intervals, duration);
        for gap in &report.gaps {
            report.info.push(format!("Gap: {gap}"));
        }
    }

    report.estimated_total = estimate_total_samples(intervals, fps);
    report.info.push(format!(
        "{} interval(s), ~{} sample(s) at {} fps",
        intervals.len(),
        report.estimated_total,
        fps,
    ));

    report
}
