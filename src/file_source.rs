//! FFmpeg-backed [`VideoSource`] for media files.
//!
//! [`FfmpegSource`] opens a file with FFmpeg, and serves each seek by jumping
//! to the keyframe before the target and decoding forward to the frame
//! nearest the requested time. Decoding happens inside
//! [`await_settle`](VideoSource::await_settle) and checks the settle
//! deadline between frames, so a stream that stops producing frames is
//! reported as [`SeekSettle::Pending`] instead of hanging.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::error::LabelFramesError;
use crate::metadata::VideoMetadata;
use crate::source::{SeekSettle, VideoSource};

/// Settle tolerance used when the stream does not report a frame rate.
const FALLBACK_FRAME_DURATION: Duration = Duration::from_millis(40);

/// A media file opened for seek-and-snapshot sampling.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use labelframes::{FfmpegSource, SeekSettle, VideoSource};
///
/// let mut source = FfmpegSource::open("input.mp4")?;
/// source.request_seek(Duration::from_secs(3))?;
/// if let SeekSettle::Settled { presented } = source.await_settle(Duration::from_secs(5))? {
///     println!("settled on the frame at {presented:?}");
///     source.snapshot()?.save("frame_3s.png")?;
/// }
/// # Ok::<(), labelframes::LabelFramesError>(())
/// ```
pub struct FfmpegSource {
    input_context: Input,
    decoder: VideoDecoder,
    video_stream_index: usize,
    time_base: Rational,
    metadata: VideoMetadata,
    file_path: PathBuf,
    /// Target of the seek in flight, if any.
    pending: Option<Duration>,
    /// Frame produced by the last settled seek.
    current: Option<DynamicImage>,
    decoded_frame: VideoFrame,
    /// Last frame decoded before the target, kept for end-of-stream settles.
    previous_frame: VideoFrame,
    previous_seconds: Option<f64>,
    eof_sent: bool,
}

impl Debug for FfmpegSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegSource")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("file_path", &self.file_path)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl FfmpegSource {
    /// Open a media file and prepare its best video stream for decoding.
    ///
    /// # Errors
    ///
    /// - [`LabelFramesError::FileOpen`] if FFmpeg cannot open the file or
    ///   build a decoder for it.
    /// - [`LabelFramesError::NoVideoStream`] if the file has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LabelFramesError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening video source: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| LabelFramesError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| LabelFramesError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(LabelFramesError::NoVideoStream)?;
        let video_stream_index = stream.index();
        let time_base = stream.time_base();

        let decoder_context = CodecContext::from_parameters(stream.parameters()).map_err(
            |error| LabelFramesError::FileOpen {
                path: file_path.clone(),
                reason: format!("Failed to read video codec parameters: {error}"),
            },
        )?;
        let decoder =
            decoder_context
                .decoder()
                .video()
                .map_err(|error| LabelFramesError::FileOpen {
                    path: file_path.clone(),
                    reason: format!("Failed to create video decoder: {error}"),
                })?;

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            0.0
        };

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            duration,
            frames_per_second,
            codec,
        };

        log::debug!(
            "Video source ready: {}x{} @ {:.2} fps, {:?} (stream={})",
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.duration,
            video_stream_index,
        );

        Ok(Self {
            input_context,
            decoder,
            video_stream_index,
            time_base,
            metadata,
            file_path,
            pending: None,
            current: None,
            decoded_frame: VideoFrame::empty(),
            previous_frame: VideoFrame::empty(),
            previous_seconds: None,
            eof_sent: false,
        })
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn settle_tolerance(&self) -> f64 {
        self.metadata
            .frame_duration()
            .unwrap_or(FALLBACK_FRAME_DURATION)
            .as_secs_f64()
    }

    fn frame_seconds(&self, frame: &VideoFrame) -> f64 {
        let pts = frame.timestamp().or_else(|| frame.pts()).unwrap_or(0);
        crate::utilities::pts_to_seconds(pts, self.time_base)
    }

    fn settle_on(
        &mut self,
        use_previous: bool,
        presented_seconds: f64,
    ) -> Result<SeekSettle, LabelFramesError> {
        let frame = if use_previous {
            &self.previous_frame
        } else {
            &self.decoded_frame
        };
        let image = convert_frame_to_image(frame)?;
        self.current = Some(image);
        self.pending = None;
        Ok(SeekSettle::Settled {
            presented: crate::utilities::seconds_to_duration(presented_seconds),
        })
    }
}

impl VideoSource for FfmpegSource {
    fn metadata(&self) -> VideoMetadata {
        self.metadata.clone()
    }

    fn request_seek(&mut self, timestamp: Duration) -> Result<(), LabelFramesError> {
        if let Some(in_flight) = self.pending {
            return Err(LabelFramesError::SeekInFlight {
                in_flight: in_flight.as_secs_f64(),
                requested: timestamp.as_secs_f64(),
            });
        }

        let seek_timestamp = crate::utilities::duration_to_seek_timestamp(timestamp);
        self.input_context
            .seek(seek_timestamp, ..=seek_timestamp)
            .map_err(|error| LabelFramesError::CaptureFailure {
                timestamp: timestamp.as_secs_f64(),
                reason: format!("seek failed: {error}"),
            })?;
        self.decoder.flush();

        self.pending = Some(timestamp);
        self.current = None;
        self.previous_seconds = None;
        self.eof_sent = false;
        Ok(())
    }

    fn await_settle(&mut self, timeout: Duration) -> Result<SeekSettle, LabelFramesError> {
        let target = self.pending.ok_or_else(|| LabelFramesError::CaptureFailure {
            timestamp: f64::NAN,
            reason: "no seek in flight".to_string(),
        })?;
        let target_seconds = target.as_secs_f64();
        let tolerance = self.settle_tolerance();
        let deadline = Instant::now() + timeout;

        loop {
            if Instant::now() >= deadline {
                return Ok(SeekSettle::Pending);
            }

            // Drain frames the decoder has already produced.
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let seconds = self.frame_seconds(&self.decoded_frame);
                if seconds + tolerance / 2.0 >= target_seconds {
                    return self.settle_on(false, seconds);
                }
                std::mem::swap(&mut self.decoded_frame, &mut self.previous_frame);
                self.previous_seconds = Some(seconds);
                continue;
            }

            if self.eof_sent {
                return match self.previous_seconds {
                    Some(seconds) if target_seconds - seconds <= tolerance => {
                        self.settle_on(true, seconds)
                    }
                    _ => Err(LabelFramesError::CaptureFailure {
                        timestamp: target_seconds,
                        reason: "end of stream before requested time".to_string(),
                    }),
                };
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(error) => {
                    log::debug!("Skipping unreadable packet near {target_seconds:.3}s: {error}");
                }
            }
        }
    }

    fn abandon_seek(&mut self) {
        self.pending = None;
    }

    fn snapshot(&mut self) -> Result<DynamicImage, LabelFramesError> {
        self.current
            .clone()
            .ok_or_else(|| LabelFramesError::VideoDecodeError(
                "snapshot requested before the seek settled".to_string(),
            ))
    }
}

/// Convert a decoded frame to an RGB [`DynamicImage`] at its own resolution.
fn convert_frame_to_image(frame: &VideoFrame) -> Result<DynamicImage, LabelFramesError> {
    let width = frame.width();
    let height = frame.height();

    let mut scaler = ScalingContext::get(
        frame.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?;
    let mut rgb_frame = VideoFrame::empty();
    scaler.run(frame, &mut rgb_frame)?;

    let buffer = crate::utilities::frame_to_buffer(&rgb_frame, width, height, 3);
    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        LabelFramesError::VideoDecodeError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}
