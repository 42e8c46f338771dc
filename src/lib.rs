//! # labelframes
//!
//! Turn labeled time intervals of a video into a dataset of still frames.
//!
//! Given a video, a sampling rate, and a list of `[start, end]` intervals
//! each tagged with a class label, `labelframes` works out which timestamps
//! to capture, seeks to each one in turn, snapshots the decoded frame,
//! downscales and encodes it, and hands the whole labeled batch to a storage
//! collaborator, but only if the run finished. Decoding is powered by FFmpeg
//! via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ### Analyze intervals
//!
//! ```
//! use labelframes::{Interval, compute_gaps, detect_overlaps, estimate_total_samples};
//!
//! let intervals = vec![Interval::new(2.0, 4.0, "cat")];
//!
//! assert!(detect_overlaps(&intervals).is_empty());
//! let gaps = compute_gaps(&intervals, 10.0);
//! assert_eq!(gaps.len(), 2);
//! assert_eq!(estimate_total_samples(&intervals, 2.0), 4);
//! ```
//!
//! ### Extract and commit
//!
//! ```no_run
//! use labelframes::{
//!     DatasetId, DirectoryCommitter, ExtractionConfig, ExtractionRequest, ExtractionSession,
//!     Interval,
//! };
//!
//! let request = ExtractionRequest::new(1.0, vec![Interval::new(0.0, 10.0, "cat")]);
//! let mut session = ExtractionSession::open("cats.mp4", request, ExtractionConfig::new())?;
//! let completed = session.run()?;
//! completed.commit(&mut DirectoryCommitter::new("datasets"), &DatasetId::new("pets")?)?;
//! # Ok::<(), labelframes::LabelFramesError>(())
//! ```
//!
//! ## Features
//!
//! - **Interval analysis**: pairwise overlap detection, coverage gaps, and
//!   a sample-count estimate, all pure functions
//! - **Timestamp planning**: deterministic, de-duplicated sample times per
//!   interval
//! - **Sequential capture**: exactly one seek in flight against a
//!   [`VideoSource`], with a bounded settle wait
//! - **Progress & cancellation**: pollable [`ProgressHandle`], push-style
//!   [`ProgressCallback`], and cooperative [`CancellationToken`]
//! - **All-or-nothing runs**: failed or cancelled sessions never hand out
//!   partial batches
//! - **Storage**: [`DirectoryCommitter`] files frames per label with a JSON
//!   manifest; [`MemoryCommitter`] for embedding
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | `spawn_extraction` and `ProgressStream` via Tokio |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod analysis;
pub mod commit;
pub mod configuration;
pub mod error;
pub mod ffmpeg;
pub mod file_source;
pub mod interval;
pub mod metadata;
pub mod plan;
pub mod progress;
pub mod sampler;
pub mod session;
pub mod source;
#[cfg(feature = "async")]
pub mod stream;
mod utilities;
pub mod validation;

pub use analysis::{
    GAP_BOUNDARY_SECONDS, OverlapReport, compute_gaps, covered_duration, detect_overlaps,
    estimate_total_samples,
};
pub use commit::{
    CommitReceipt, DatasetId, DirectoryCommitter, FrameCommitter, MANIFEST_DIRECTORY, MemoryCommitter,
    sanitize_label,
};
pub use configuration::{
    CaptureFailurePolicy, DEFAULT_JPEG_QUALITY, DEFAULT_SEEK_TIMEOUT, ExtractionConfig,
    FrameScale, ImageEncoding, OverlapPolicy,
};
pub use error::{ErrorKind, LabelFramesError};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use file_source::FfmpegSource;
pub use interval::{Gap, Interval};
pub use metadata::VideoMetadata;
pub use plan::{PlannedSample, TIMESTAMP_RESOLUTION, TimestampPlan};
pub use progress::{CancellationToken, ProgressCallback, ProgressHandle, ProgressInfo, ProgressTracker};
pub use sampler::{ExtractedFrame, FrameSampler};
pub use session::{
    CompletedExtraction, ExtractionRequest, ExtractionSession, SessionState, SkippedSample,
};
pub use source::{SeekSettle, SettleNotifier, SettleSignal, VideoSource, settle_channel};
#[cfg(feature = "async")]
pub use stream::{ExtractionTask, ProgressStream, StreamingProgress, spawn_extraction};
pub use validation::{ValidationReport, validate_request};
