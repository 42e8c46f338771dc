//! Extraction configuration.
//!
//! [`ExtractionConfig`] is a builder that threads progress callbacks,
//! cancellation tokens, output settings, and failure policies through an
//! [`ExtractionSession`](crate::ExtractionSession) without polluting every
//! function signature.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use labelframes::{
//!     CancellationToken, CaptureFailurePolicy, ExtractionConfig, FrameScale, ImageEncoding,
//!     ProgressCallback, ProgressInfo,
//! };
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:.1}% ({} of ~{})", info.percentage, info.processed, info.total);
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let config = ExtractionConfig::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone())
//!     .with_seek_timeout(Duration::from_secs(3))
//!     .with_scale(FrameScale::Divisor(4))
//!     .with_encoding(ImageEncoding::Png)
//!     .with_capture_failure_policy(CaptureFailurePolicy::Skip);
//! ```

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default bound on a single seek-settle wait.
pub const DEFAULT_SEEK_TIMEOUT: Duration = Duration::from_secs(10);

/// Default JPEG quality, matching what browsers use for canvas snapshots.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// How captured frames are downscaled before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameScale {
    /// Halve width and height. This is the default.
    #[default]
    Half,
    /// Keep the source resolution.
    Original,
    /// Divide width and height by the given factor (`0` is treated as `1`).
    Divisor(u32),
    /// Shrink so the longer side is at most this many pixels, preserving
    /// aspect ratio. Frames already small enough are left alone.
    MaxDimension(u32),
}

impl FrameScale {
    /// Resolve the output dimensions for a source of the given size.
    ///
    /// Returns `(width, height)`, each at least 1.
    pub fn resolve(self, source_width: u32, source_height: u32) -> (u32, u32) {
        let (width, height) = match self {
            FrameScale::Half => (source_width / 2, source_height / 2),
            FrameScale::Original => (source_width, source_height),
            FrameScale::Divisor(divisor) => {
                let divisor = divisor.max(1);
                (source_width / divisor, source_height / divisor)
            }
            FrameScale::MaxDimension(limit) => {
                let longest = source_width.max(source_height);
                if longest <= limit || longest == 0 {
                    (source_width, source_height)
                } else {
                    let ratio = limit as f64 / longest as f64;
                    (
                        (source_width as f64 * ratio).round() as u32,
                        (source_height as f64 * ratio).round() as u32,
                    )
                }
            }
        };
        (width.max(1), height.max(1))
    }
}

/// Transportable image format for captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// Baseline JPEG with the given quality (1–100).
    Jpeg {
        /// Encoder quality, clamped to `1..=100`.
        quality: u8,
    },
    /// Lossless PNG.
    Png,
}

impl Default for ImageEncoding {
    fn default() -> Self {
        ImageEncoding::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImageEncoding {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg { .. } => "jpg",
            ImageEncoding::Png => "png",
        }
    }

    /// MIME type of the encoded bytes.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg { .. } => "image/jpeg",
            ImageEncoding::Png => "image/png",
        }
    }
}

impl Display for ImageEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ImageEncoding::Jpeg { quality } => write!(f, "JPEG (quality {quality})"),
            ImageEncoding::Png => write!(f, "PNG"),
        }
    }
}

/// What to do when intervals overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Report overlaps as validation warnings and extract anyway.
    #[default]
    Warn,
    /// Reject the request with
    /// [`LabelFramesError::OverlappingIntervals`](crate::LabelFramesError::OverlappingIntervals).
    Reject,
}

/// What to do when a single capture step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureFailurePolicy {
    /// Abort the whole run and commit nothing. This is the default.
    #[default]
    Abort,
    /// Log the failure, record it as skipped, and continue with the next
    /// sample. The run can still complete.
    Skip,
}

/// Configuration for an extraction session.
///
/// All fields have sensible defaults; a default-constructed config halves
/// frames, encodes JPEG at quality 92, waits at most ten seconds per seek,
/// warns on overlaps, and aborts on the first capture failure.
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Cancellation token. `None` means never cancelled.
    pub(crate) cancellation: Option<CancellationToken>,
    /// How often to fire the progress callback (every N captures).
    pub(crate) batch_size: u64,
    /// Upper bound on each seek-settle wait.
    pub(crate) seek_timeout: Duration,
    /// Output downscaling.
    pub(crate) scale: FrameScale,
    /// Output image format.
    pub(crate) encoding: ImageEncoding,
    pub(crate) overlap_policy: OverlapPolicy,
    pub(crate) capture_failure_policy: CaptureFailurePolicy,
    pub(crate) reject_zero_length: bool,
}

impl Debug for ExtractionConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractionConfig")
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .field("seek_timeout", &self.seek_timeout)
            .field("scale", &self.scale)
            .field("encoding", &self.encoding)
            .field("overlap_policy", &self.overlap_policy)
            .field("capture_failure_policy", &self.capture_failure_policy)
            .field("reject_zero_length", &self.reject_zero_length)
            .finish_non_exhaustive()
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
            seek_timeout: DEFAULT_SEEK_TIMEOUT,
            scale: FrameScale::default(),
            encoding: ImageEncoding::default(),
            overlap_policy: OverlapPolicy::default(),
            capture_failure_policy: CaptureFailurePolicy::default(),
            reject_zero_length: false,
        }
    }

    /// Attach a progress callback.
    ///
    /// The callback is invoked every [`batch_size`](ExtractionConfig::with_batch_size)
    /// successful captures, and once more when the run completes.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// The token is checked before every seek; once cancelled, the session
    /// stops and ends in [`SessionState::Cancelled`](crate::SessionState::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires.
    ///
    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Bound each seek-settle wait. Zero is raised to one millisecond.
    #[must_use]
    pub fn with_seek_timeout(mut self, timeout: Duration) -> Self {
        self.seek_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    /// Set how captured frames are downscaled.
    #[must_use]
    pub fn with_scale(mut self, scale: FrameScale) -> Self {
        self.scale = scale;
        self
    }

    /// Set the output image format.
    #[must_use]
    pub fn with_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.encoding = match encoding {
            ImageEncoding::Jpeg { quality } => ImageEncoding::Jpeg {
                quality: quality.clamp(1, 100),
            },
            other => other,
        };
        self
    }

    /// Choose whether overlapping intervals are warnings or errors.
    #[must_use]
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    /// Choose whether a failed capture aborts the run or is skipped.
    #[must_use]
    pub fn with_capture_failure_policy(mut self, policy: CaptureFailurePolicy) -> Self {
        self.capture_failure_policy = policy;
        self
    }

    /// Reject zero-length intervals instead of sampling nothing from them.
    #[must_use]
    pub fn with_reject_zero_length(mut self, reject: bool) -> Self {
        self.reject_zero_length = reject;
        self
    }

    /// The configured seek-settle bound.
    pub fn seek_timeout(&self) -> Duration {
        self.seek_timeout
    }

    /// The configured downscaling.
    pub fn scale(&self) -> FrameScale {
        self.scale
    }

    /// The configured image format.
    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    /// The configured overlap policy.
    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.overlap_policy
    }

    /// The configured capture failure policy.
    pub fn capture_failure_policy(&self) -> CaptureFailurePolicy {
        self.capture_failure_policy
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
