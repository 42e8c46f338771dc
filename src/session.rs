//! Extraction sessions.
//!
//! An [`ExtractionSession`] owns one video source and one request, and moves
//! through `Idle → Validating → Running → {Completed | Failed | Cancelled}`.
//! Frames captured during `Running` stay inside the session until the run
//! completes; only then are they handed to the caller as a
//! [`CompletedExtraction`], the sole path to a [`FrameCommitter`]. A failed
//! or cancelled run drops everything it captured.
//!
//! # Example
//!
//! ```no_run
//! use labelframes::{
//!     DatasetId, DirectoryCommitter, ExtractionConfig, ExtractionRequest, ExtractionSession,
//!     Interval,
//! };
//!
//! let request = ExtractionRequest::new(
//!     2.0,
//!     vec![Interval::new(0.0, 5.0, "walking"), Interval::new(7.0, 9.5, "running")],
//! );
//! let mut session = ExtractionSession::open("clip.mp4", request, ExtractionConfig::new())?;
//!
//! let report = session.validate()?;
//! for warning in &report.warnings {
//!     eprintln!("warning: {warning}");
//! }
//!
//! let completed = session.run()?;
//! let mut committer = DirectoryCommitter::new("datasets");
//! let receipt = completed.commit(&mut committer, &DatasetId::new("gait")?)?;
//! println!("committed {} frames", receipt.frames);
//! # Ok::<(), labelframes::LabelFramesError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

use crate::analysis::OverlapReport;
use crate::commit::{CommitReceipt, DatasetId, FrameCommitter};
use crate::configuration::{CaptureFailurePolicy, ExtractionConfig};
use crate::error::LabelFramesError;
use crate::file_source::FfmpegSource;
use crate::interval::{Gap, Interval};
use crate::plan::TimestampPlan;
use crate::progress::{ProgressHandle, ProgressTracker};
use crate::sampler::{ExtractedFrame, FrameSampler};
use crate::source::VideoSource;
use crate::validation::{ValidationReport, validate_request};

/// Lifecycle state of an [`ExtractionSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created; no plan computed yet.
    Idle,
    /// Validated; the plan and estimate are ready.
    Validating,
    /// Capturing frames.
    Running,
    /// Every planned sample was processed.
    Completed,
    /// Validation or a capture failed. Nothing was handed out.
    Failed,
    /// The caller cancelled the run. Nothing was handed out.
    Cancelled,
}

impl SessionState {
    /// Returns `true` for `Completed`, `Failed`, and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Validating => "validating",
            SessionState::Running => "running",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// What to extract: a sampling rate and labeled intervals, in caller order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    /// Samples per second of interval time.
    pub fps: f64,
    /// Intervals to sample. Their order decides frame order.
    pub intervals: Vec<Interval>,
}

impl ExtractionRequest {
    /// Create a request.
    pub fn new(fps: f64, intervals: Vec<Interval>) -> Self {
        Self { fps, intervals }
    }
}

/// A planned sample that was skipped under [`CaptureFailurePolicy::Skip`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSample {
    /// Requested timestamp, in seconds.
    pub timestamp: f64,
    /// Label of the sample.
    pub label: String,
    /// Why the capture failed.
    pub reason: String,
}

/// The outcome of a completed run.
///
/// Owns the captured frames; commit them with [`commit`](Self::commit) or
/// take them with [`into_frames`](Self::into_frames).
#[derive(Debug)]
pub struct CompletedExtraction {
    frames: Vec<ExtractedFrame>,
    skipped: Vec<SkippedSample>,
    overlaps: OverlapReport,
    gaps: Vec<Gap>,
    warnings: Vec<String>,
}

impl CompletedExtraction {
    /// Captured frames, in plan order.
    pub fn frames(&self) -> &[ExtractedFrame] {
        &self.frames
    }

    /// Samples skipped after a capture failure (always empty under
    /// [`CaptureFailurePolicy::Abort`]).
    pub fn skipped(&self) -> &[SkippedSample] {
        &self.skipped
    }

    /// Overlaps found during validation.
    pub fn overlaps(&self) -> &OverlapReport {
        &self.overlaps
    }

    /// Coverage gaps found during validation.
    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    /// Validation warnings.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Take ownership of the frames.
    pub fn into_frames(self) -> Vec<ExtractedFrame> {
        self.frames
    }

    /// Hand the whole batch to a storage collaborator.
    ///
    /// # Errors
    ///
    /// Whatever the committer reports; see [`FrameCommitter::commit`].
    pub fn commit<C: FrameCommitter + ?Sized>(
        self,
        committer: &mut C,
        dataset: &DatasetId,
    ) -> Result<CommitReceipt, LabelFramesError> {
        log::debug!(
            "Committing {} frame(s) to dataset {}",
            self.frames.len(),
            dataset
        );
        committer.commit(dataset, &self.frames)
    }
}

/// One extraction run against one exclusively owned video source.
///
/// A session runs at most once. Create a new session to retry.
pub struct ExtractionSession<S: VideoSource> {
    source: S,
    request: ExtractionRequest,
    config: ExtractionConfig,
    state: SessionState,
    history: Vec<SessionState>,
    report: Option<ValidationReport>,
    plan: Option<TimestampPlan>,
    progress: ProgressHandle,
}

impl ExtractionSession<FfmpegSource> {
    /// Open a media file and create a session for it.
    ///
    /// # Errors
    ///
    /// Any error from [`FfmpegSource::open`].
    pub fn open<P: AsRef<Path>>(
        path: P,
        request: ExtractionRequest,
        config: ExtractionConfig,
    ) -> Result<Self, LabelFramesError> {
        Ok(Self::new(FfmpegSource::open(path)?, request, config))
    }
}

impl<S: VideoSource> ExtractionSession<S> {
    /// Create an idle session.
    pub fn new(source: S, request: ExtractionRequest, config: ExtractionConfig) -> Self {
        Self {
            source,
            request,
            config,
            state: SessionState::Idle,
            history: vec![SessionState::Idle],
            report: None,
            plan: None,
            progress: ProgressHandle::default(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state the session has been in, oldest first.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// A pollable progress view, valid before, during, and after the run.
    pub fn progress_handle(&self) -> ProgressHandle {
        self.progress.clone()
    }

    /// The request this session was created with.
    pub fn request(&self) -> &ExtractionRequest {
        &self.request
    }

    /// The session configuration.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// The validation report, once validation has succeeded.
    pub fn report(&self) -> Option<&ValidationReport> {
        self.report.as_ref()
    }

    /// The timestamp plan, once validation has succeeded.
    pub fn plan(&self) -> Option<&TimestampPlan> {
        self.plan.as_ref()
    }

    /// Borrow the video source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Give the video source back, ending the session.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Validate the request and compute the plan.
    ///
    /// Moves `Idle → Validating`. On a validation error the session ends in
    /// [`SessionState::Failed`].
    ///
    /// # Errors
    ///
    /// - [`LabelFramesError::InvalidSessionState`] unless the session is idle.
    /// - Any validation error (see [`ValidationReport::into_result`]).
    pub fn validate(&mut self) -> Result<&ValidationReport, LabelFramesError> {
        if self.state != SessionState::Idle {
            return Err(LabelFramesError::InvalidSessionState {
                expected: "idle",
                actual: self.state,
            });
        }
        self.transition(SessionState::Validating);

        let duration = self.source.metadata().duration_seconds();
        let known_duration = (duration > 0.0).then_some(duration);
        let report = match validate_request(
            &self.request.intervals,
            self.request.fps,
            known_duration,
            &self.config,
        )
        .into_result()
        {
            Ok(report) => report,
            Err(error) => {
                log::debug!("Request rejected: {error}");
                self.transition(SessionState::Failed);
                return Err(error);
            }
        };

        for warning in &report.warnings {
            log::warn!("{warning}");
        }

        let plan = TimestampPlan::build(&self.request.intervals, self.request.fps);
        log::debug!(
            "Planned {} sample(s) over {} interval(s), estimate {}",
            plan.len(),
            self.request.intervals.len(),
            plan.estimated_total(),
        );

        self.plan = Some(plan);
        let report: &ValidationReport = self.report.insert(report);
        Ok(report)
    }

    /// Run the session to a terminal state.
    ///
    /// Validates first if that has not happened yet. Captures are strictly
    /// sequential, and cancellation is checked before each seek.
    ///
    /// # Errors
    ///
    /// - [`LabelFramesError::InvalidSessionState`] if the session has
    ///   already run.
    /// - Any validation error; the session ends in `Failed`.
    /// - [`LabelFramesError::Cancelled`]; the session ends in `Cancelled`.
    /// - A capture error under [`CaptureFailurePolicy::Abort`]; the session
    ///   ends in `Failed`.
    pub fn run(&mut self) -> Result<CompletedExtraction, LabelFramesError> {
        if self.state == SessionState::Idle {
            self.validate()?;
        }
        if self.state != SessionState::Validating {
            return Err(LabelFramesError::InvalidSessionState {
                expected: "idle or validating",
                actual: self.state,
            });
        }

        let Some(plan) = self.plan.take() else {
            return Err(LabelFramesError::InvalidSessionState {
                expected: "validated",
                actual: self.state,
            });
        };

        let mut tracker = ProgressTracker::attach(
            self.progress.clone(),
            plan.estimated_total(),
            self.config.progress.clone(),
            self.config.batch_size,
        );

        if plan.is_empty() {
            tracker.complete();
            self.plan = Some(plan);
            self.transition(SessionState::Completed);
            log::info!("Nothing to sample; session completed with no frames");
            return Ok(self.completed(Vec::new(), Vec::new()));
        }

        self.transition(SessionState::Running);

        let mut frames = Vec::with_capacity(plan.len());
        let mut skipped = Vec::new();
        let outcome = {
            let mut sampler = FrameSampler::new(&mut self.source, &plan, &self.config);
            loop {
                if self.config.is_cancelled() {
                    break Err(LabelFramesError::Cancelled);
                }
                let Some((sample, result)) = sampler.step() else {
                    break Ok(());
                };
                match result {
                    Ok(frame) => {
                        tracker.advance(Some(frame.timestamp), Some(&frame.label));
                        frames.push(frame);
                    }
                    Err(error) => match self.config.capture_failure_policy {
                        CaptureFailurePolicy::Abort => break Err(error),
                        CaptureFailurePolicy::Skip => {
                            log::warn!(
                                "Skipping sample at {:.3}s ({}): {error}",
                                sample.timestamp,
                                sample.label,
                            );
                            skipped.push(SkippedSample {
                                timestamp: sample.timestamp,
                                label: sample.label.clone(),
                                reason: error.to_string(),
                            });
                        }
                    },
                }
            }
        };
        self.plan = Some(plan);

        match outcome {
            Ok(()) => {
                tracker.complete();
                self.transition(SessionState::Completed);
                log::info!(
                    "Captured {} frame(s), skipped {}",
                    frames.len(),
                    skipped.len()
                );
                Ok(self.completed(frames, skipped))
            }
            Err(LabelFramesError::Cancelled) => {
                log::info!(
                    "Cancelled after {} capture(s); discarding them",
                    frames.len()
                );
                drop(frames);
                self.transition(SessionState::Cancelled);
                Err(LabelFramesError::Cancelled)
            }
            Err(error) => {
                log::warn!(
                    "Run failed after {} capture(s); discarding them: {error}",
                    frames.len()
                );
                drop(frames);
                self.transition(SessionState::Failed);
                Err(error)
            }
        }
    }

    fn completed(
        &self,
        frames: Vec<ExtractedFrame>,
        skipped: Vec<SkippedSample>,
    ) -> CompletedExtraction {
        let (overlaps, gaps, warnings) = match &self.report {
            Some(report) => (
                report.overlaps.clone(),
                report.gaps.clone(),
                report.warnings.clone(),
            ),
            None => (OverlapReport::default(), Vec::new(), Vec::new()),
        };
        CompletedExtraction {
            frames,
            skipped,
            overlaps,
            gaps,
            warnings,
        }
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!("Session state: {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}
