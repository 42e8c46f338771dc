//! Video source metadata.
//!
//! [`VideoMetadata`] describes the stream a [`VideoSource`](crate::VideoSource)
//! is attached to. Sessions read it once during validation: the duration
//! bounds gap computation and the dimensions drive frame downscaling.

use std::time::Duration;

/// Metadata for a seekable video stream.
///
/// # Example
///
/// ```no_run
/// use labelframes::{FfmpegSource, VideoSource};
///
/// let source = FfmpegSource::open("input.mp4").unwrap();
/// let metadata = source.metadata();
/// println!("{}x{} for {:?}", metadata.width, metadata.height, metadata.duration);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Total duration of the stream.
    pub duration: Duration,
    /// Native frame rate (may be approximate for variable-frame-rate
    /// content, and `0.0` when unknown).
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`, `"vp9"`), or `"unknown"`.
    pub codec: String,
}

impl VideoMetadata {
    /// Duration in seconds, as used by interval analysis.
    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    /// Length of one native frame, if the frame rate is known.
    pub fn frame_duration(&self) -> Option<Duration> {
        (self.frames_per_second > 0.0)
            .then(|| Duration::from_secs_f64(1.0 / self.frames_per_second))
    }
}
