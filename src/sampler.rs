//! Seek-and-capture frame sampling.
//!
//! [`FrameSampler`] turns a [`TimestampPlan`] into [`ExtractedFrame`]s by
//! driving a [`VideoSource`] one sample at a time: seek, wait for the seek
//! to settle, snapshot, downscale, encode. It implements [`Iterator`], so
//! frames are produced lazily and nothing is buffered here.
//!
//! Exactly one seek is ever in flight. The seek for sample *k + 1* is not
//! issued until sample *k* has been captured or has failed, because the
//! source has a single decode surface and overlapping seeks would tear
//! frames.
//!
//! # Example
//!
//! ```no_run
//! use labelframes::{ExtractionConfig, FfmpegSource, FrameSampler, Interval, TimestampPlan};
//!
//! let mut source = FfmpegSource::open("input.mp4")?;
//! let plan = TimestampPlan::build(&[Interval::new(0.0, 2.0, "cat")], 1.0);
//! let config = ExtractionConfig::new();
//!
//! for result in FrameSampler::new(&mut source, &plan, &config) {
//!     let frame = result?;
//!     println!("{:.2}s {} ({} bytes)", frame.timestamp, frame.label, frame.image.len());
//! }
//! # Ok::<(), labelframes::LabelFramesError>(())
//! ```

use std::slice::Iter;
use std::time::Duration;

use image::{
    DynamicImage,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
    imageops::FilterType,
};

use crate::configuration::{ExtractionConfig, FrameScale, ImageEncoding};
use crate::error::LabelFramesError;
use crate::plan::{PlannedSample, TimestampPlan};
use crate::source::{SeekSettle, VideoSource};
use crate::utilities::seconds_to_duration;

/// One captured, encoded frame with its provenance.
///
/// Created exactly once per successful capture and never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFrame {
    /// Requested sample time, in seconds.
    pub timestamp: f64,
    /// Label of the interval the sample came from.
    pub label: String,
    /// Encoded image bytes.
    pub image: Vec<u8>,
    /// Width of the encoded image in pixels.
    pub width: u32,
    /// Height of the encoded image in pixels.
    pub height: u32,
    /// Format of [`image`](Self::image).
    pub encoding: ImageEncoding,
    /// Presentation time of the frame the source actually settled on.
    pub presented: Duration,
}

/// Lazily captures the samples of a plan from a video source.
///
/// The sampler does not stop after a failed step; whether a failure aborts
/// the run is the caller's policy. A failed step always leaves no seek in
/// flight, so the next step may proceed.
pub struct FrameSampler<'a, S: VideoSource + ?Sized> {
    source: &'a mut S,
    samples: Iter<'a, PlannedSample>,
    scale: FrameScale,
    encoding: ImageEncoding,
    seek_timeout: Duration,
    in_flight: Option<f64>,
}

impl<'a, S: VideoSource + ?Sized> FrameSampler<'a, S> {
    /// Create a sampler over `plan`, using the output settings and seek
    /// timeout from `config`.
    pub fn new(source: &'a mut S, plan: &'a TimestampPlan, config: &ExtractionConfig) -> Self {
        Self {
            source,
            samples: plan.iter(),
            scale: config.scale,
            encoding: config.encoding,
            seek_timeout: config.seek_timeout,
            in_flight: None,
        }
    }

    /// Number of planned samples not yet attempted.
    pub fn remaining(&self) -> usize {
        self.samples.len()
    }

    /// Timestamp of the seek currently awaiting settle, if any.
    pub fn in_flight(&self) -> Option<f64> {
        self.in_flight
    }

    /// Run the full seek / settle / snapshot / encode cycle for one sample.
    ///
    /// # Errors
    ///
    /// - [`LabelFramesError::SeekInFlight`] if a previous seek is unresolved.
    /// - [`LabelFramesError::SeekTimeout`] if the seek does not settle within
    ///   the configured timeout.
    /// - [`LabelFramesError::CaptureFailure`] for any other source, decode,
    ///   snapshot, or encode failure.
    pub fn capture(&mut self, sample: &PlannedSample) -> Result<ExtractedFrame, LabelFramesError> {
        if let Some(in_flight) = self.in_flight {
            return Err(LabelFramesError::SeekInFlight {
                in_flight,
                requested: sample.timestamp,
            });
        }

        let timestamp = sample.timestamp;
        self.in_flight = Some(timestamp);
        let settled = self.seek_and_settle(timestamp);
        if settled.is_err() {
            self.source.abandon_seek();
        }
        self.in_flight = None;
        let presented = settled?;

        let snapshot = self
            .source
            .snapshot()
            .map_err(|error| as_capture_failure(timestamp, error))?;
        let scaled = downscale(snapshot, self.scale);
        let image = encode_image(&scaled, self.encoding)
            .map_err(|error| as_capture_failure(timestamp, error))?;

        Ok(ExtractedFrame {
            timestamp,
            label: sample.label.clone(),
            image,
            width: scaled.width(),
            height: scaled.height(),
            encoding: self.encoding,
            presented,
        })
    }

    /// Capture the next planned sample, returning it alongside the outcome.
    ///
    /// Returns `None` once every sample has been attempted.
    pub fn step(&mut self) -> Option<(&'a PlannedSample, Result<ExtractedFrame, LabelFramesError>)> {
        let sample = self.samples.next()?;
        Some((sample, self.capture(sample)))
    }

    fn seek_and_settle(&mut self, timestamp: f64) -> Result<Duration, LabelFramesError> {
        self.source
            .request_seek(seconds_to_duration(timestamp))
            .map_err(|error| as_capture_failure(timestamp, error))?;

        match self.source.await_settle(self.seek_timeout) {
            Ok(SeekSettle::Settled { presented }) => Ok(presented),
            Ok(SeekSettle::Pending) => Err(LabelFramesError::SeekTimeout {
                timestamp,
                timeout: self.seek_timeout,
            }),
            Err(error) => Err(as_capture_failure(timestamp, error)),
        }
    }
}

impl<S: VideoSource + ?Sized> Iterator for FrameSampler<'_, S> {
    type Item = Result<ExtractedFrame, LabelFramesError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step().map(|(_, result)| result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.samples.size_hint()
    }
}

/// Resize a snapshot according to `scale`, leaving it untouched when the
/// dimensions already match.
pub(crate) fn downscale(image: DynamicImage, scale: FrameScale) -> DynamicImage {
    let (width, height) = scale.resolve(image.width(), image.height());
    if (width, height) == (image.width(), image.height()) {
        image
    } else {
        image.resize_exact(width, height, FilterType::Triangle)
    }
}

/// Encode an image into the transportable format.
pub(crate) fn encode_image(
    image: &DynamicImage,
    encoding: ImageEncoding,
) -> Result<Vec<u8>, LabelFramesError> {
    let mut bytes = Vec::new();
    match encoding {
        ImageEncoding::Jpeg { quality } => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))?;
        }
        ImageEncoding::Png => {
            image.write_with_encoder(PngEncoder::new(&mut bytes))?;
        }
    }
    Ok(bytes)
}

/// Normalise any failure during a capture step into the capture family,
/// stamped with the sample's timestamp.
fn as_capture_failure(timestamp: f64, error: LabelFramesError) -> LabelFramesError {
    match error {
        LabelFramesError::CaptureFailure { reason, .. } => {
            LabelFramesError::CaptureFailure { timestamp, reason }
        }
        error @ (LabelFramesError::SeekTimeout { .. }
        | LabelFramesError::SeekInFlight { .. }) => error,
        other => LabelFramesError::CaptureFailure {
            timestamp,
            reason: other.to_string(),
        },
    }
}
