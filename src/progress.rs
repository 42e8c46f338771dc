//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressTracker`], which turns capture steps into a
//! percentage; [`ProgressHandle`], a cheap clone of the tracker's counters
//! that any thread can poll; [`ProgressCallback`] for push-style
//! notifications; and [`CancellationToken`] for cooperative cancellation.
//!
//! # Example
//!
//! ```
//! use labelframes::ProgressTracker;
//!
//! let mut tracker = ProgressTracker::new(4);
//! let handle = tracker.handle();
//!
//! tracker.advance(Some(0.0), Some("cat"));
//! assert_eq!(handle.percentage(), 25.0);
//!
//! tracker.complete();
//! assert_eq!(handle.percentage(), 100.0);
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::time::{Duration, Instant};

/// A snapshot of extraction progress.
///
/// Delivered to [`ProgressCallback::on_progress`] at a cadence controlled by
/// [`ExtractionConfig::with_batch_size`](crate::ExtractionConfig::with_batch_size).
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Successful captures so far.
    pub processed: u64,
    /// Estimated total captures, fixed when the run started.
    pub total: u64,
    /// Completion percentage in `[0, 100]`.
    pub percentage: f32,
    /// Wall-clock time elapsed since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Timestamp of the sample just captured, in seconds.
    pub current_timestamp: Option<f64>,
    /// Label of the sample just captured.
    pub current_label: Option<String>,
}

/// Trait for receiving progress updates during extraction.
///
/// Implementations must be [`Send`] and [`Sync`] because a session may run
/// on a worker thread while the callback feeds a UI elsewhere.
///
/// Progress callbacks are **infallible**: they observe but cannot halt the
/// run. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called after captures and once when the run completes.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to request
/// cancellation. Sessions check the token between samples, before issuing
/// the next seek; a capture already in progress is allowed to finish.
///
/// # Example
///
/// ```
/// use labelframes::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct SharedCounters {
    processed: AtomicU64,
    total: AtomicU64,
    started: AtomicBool,
    complete: AtomicBool,
}

/// Read-only view of a tracker's counters.
///
/// Clones share state with the tracker that created them, so a UI thread can
/// poll the percentage while the session runs elsewhere.
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    counters: Arc<SharedCounters>,
}

impl ProgressHandle {
    /// Successful captures so far.
    pub fn processed(&self) -> u64 {
        self.counters.processed.load(Ordering::Acquire)
    }

    /// Estimated total captures.
    pub fn total(&self) -> u64 {
        self.counters.total.load(Ordering::Acquire)
    }

    /// Returns `true` once the run has completed.
    pub fn is_complete(&self) -> bool {
        self.counters.complete.load(Ordering::Acquire)
    }

    /// Returns `true` once a tracker has been attached to these counters.
    pub fn is_started(&self) -> bool {
        self.counters.started.load(Ordering::Acquire)
    }

    /// Completion percentage in `[0, 100]`.
    ///
    /// Reads 0 before the run starts. Once started, a total of zero reads
    /// as 100: there is nothing left to do.
    pub fn percentage(&self) -> f32 {
        if self.is_complete() {
            return 100.0;
        }
        if !self.is_started() {
            return 0.0;
        }
        let (processed, total) = (self.processed(), self.total());
        if total == 0 {
            return 100.0;
        }
        ((processed as f64 / total as f64) * 100.0).min(100.0) as f32
    }
}

/// Accumulates processed-versus-total counts for one run.
///
/// `total` is fixed at construction from the plan's estimate. Each
/// [`advance`](Self::advance) records one successful capture. Because the
/// estimate can undercount by boundary rounding, the percentage is capped
/// at 100; [`complete`](Self::complete) pins it to exactly 100.
pub struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    handle: ProgressHandle,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    /// Create a tracker with a fixed `total` and no callback.
    pub fn new(total: u64) -> Self {
        Self::with_callback(total, Arc::new(NoOpProgress), 1)
    }

    /// Create a tracker that notifies `callback` every `batch_size` captures.
    pub fn with_callback(total: u64, callback: Arc<dyn ProgressCallback>, batch_size: u64) -> Self {
        Self::attach(ProgressHandle::default(), total, callback, batch_size)
    }

    pub(crate) fn attach(
        handle: ProgressHandle,
        total: u64,
        callback: Arc<dyn ProgressCallback>,
        batch_size: u64,
    ) -> Self {
        handle.counters.processed.store(0, Ordering::Release);
        handle.counters.complete.store(false, Ordering::Release);
        handle.counters.total.store(total, Ordering::Release);
        handle.counters.started.store(true, Ordering::Release);
        Self {
            callback,
            handle,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// A pollable view of this tracker's counters.
    pub fn handle(&self) -> ProgressHandle {
        self.handle.clone()
    }

    /// Successful captures so far.
    pub fn processed(&self) -> u64 {
        self.handle.processed()
    }

    /// Estimated total captures.
    pub fn total(&self) -> u64 {
        self.handle.total()
    }

    /// Current completion percentage in `[0, 100]`.
    pub fn percentage(&self) -> f32 {
        self.handle.percentage()
    }

    /// Record one successful capture and fire the callback if the batch
    /// threshold is reached.
    pub fn advance(&mut self, timestamp: Option<f64>, label: Option<&str>) {
        self.handle.counters.processed.fetch_add(1, Ordering::AcqRel);
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size {
            self.report(timestamp, label);
            self.items_since_last_report = 0;
        }
    }

    /// Mark the run complete (100%) and emit a final report.
    pub fn complete(&mut self) {
        self.handle.counters.complete.store(true, Ordering::Release);
        self.report(None, None);
    }

    fn report(&self, timestamp: Option<f64>, label: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let processed = self.processed();
        let total = self.total();

        let estimated_remaining = if processed > 0 && !self.handle.is_complete() {
            let remaining = total.saturating_sub(processed);
            let per_item = elapsed.div_f64(processed as f64);
            Some(per_item.mul_f64(remaining as f64))
        } else {
            None
        };

        let info = ProgressInfo {
            processed,
            total,
            percentage: self.percentage(),
            elapsed,
            estimated_remaining,
            current_timestamp: timestamp,
            current_label: label.map(str::to_string),
        };

        self.callback.on_progress(&info);
    }
}
