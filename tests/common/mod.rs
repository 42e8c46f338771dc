//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{DynamicImage, Rgb, RgbImage};
use labelframes::{
    LabelFramesError, ProgressCallback, ProgressInfo, SeekSettle, VideoMetadata, VideoSource,
};

/// Route library logging to the test harness; `RUST_LOG=debug` shows state transitions.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn same_time(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

/// In-memory [`VideoSource`] with scripted failures.
///
/// Settles every seek immediately on exactly the requested time, unless the
/// time is listed in `never_settle`. Snapshots are solid-colour frames whose
/// red channel encodes the presented time in tenths of a second.
pub struct ScriptedSource {
    metadata: VideoMetadata,
    never_settle: Vec<f64>,
    failing_snapshots: Vec<f64>,
    panicking_snapshots: Vec<f64>,
    detach_after: Option<usize>,
    pending: Option<Duration>,
    presented: Option<Duration>,
    /// Every requested seek, in order, in seconds.
    pub seeks: Vec<f64>,
    /// Seeks requested while another was still pending.
    pub overlapping_seeks: usize,
    /// Number of abandoned seeks.
    pub abandoned: usize,
}

impl ScriptedSource {
    pub fn new(duration_seconds: f64) -> Self {
        Self::with_size(duration_seconds, 64, 36)
    }

    pub fn with_size(duration_seconds: f64, width: u32, height: u32) -> Self {
        Self {
            metadata: VideoMetadata {
                width,
                height,
                duration: Duration::from_secs_f64(duration_seconds),
                frames_per_second: 25.0,
                codec: "scripted".to_string(),
            },
            never_settle: Vec::new(),
            failing_snapshots: Vec::new(),
            panicking_snapshots: Vec::new(),
            detach_after: None,
            pending: None,
            presented: None,
            seeks: Vec::new(),
            overlapping_seeks: 0,
            abandoned: 0,
        }
    }

    /// Seeks to `timestamp` never settle.
    pub fn never_settling_at(mut self, timestamp: f64) -> Self {
        self.never_settle.push(timestamp);
        self
    }

    /// Snapshots after seeking to `timestamp` fail.
    pub fn failing_snapshot_at(mut self, timestamp: f64) -> Self {
        self.failing_snapshots.push(timestamp);
        self
    }

    /// Snapshots after seeking to `timestamp` panic.
    pub fn panicking_snapshot_at(mut self, timestamp: f64) -> Self {
        self.panicking_snapshots.push(timestamp);
        self
    }

    /// The source detaches once `seeks` seeks have been requested.
    pub fn detaching_after(mut self, seeks: usize) -> Self {
        self.detach_after = Some(seeks);
        self
    }
}

impl VideoSource for ScriptedSource {
    fn metadata(&self) -> VideoMetadata {
        self.metadata.clone()
    }

    fn request_seek(&mut self, timestamp: Duration) -> Result<(), LabelFramesError> {
        if let Some(in_flight) = self.pending {
            self.overlapping_seeks += 1;
            return Err(LabelFramesError::SeekInFlight {
                in_flight: in_flight.as_secs_f64(),
                requested: timestamp.as_secs_f64(),
            });
        }
        self.seeks.push(timestamp.as_secs_f64());
        self.pending = Some(timestamp);
        self.presented = None;
        Ok(())
    }

    fn await_settle(&mut self, _timeout: Duration) -> Result<SeekSettle, LabelFramesError> {
        let Some(target) = self.pending else {
            return Err(LabelFramesError::CaptureFailure {
                timestamp: f64::NAN,
                reason: "no seek in flight".to_string(),
            });
        };
        if self
            .detach_after
            .is_some_and(|limit| self.seeks.len() > limit)
        {
            return Err(LabelFramesError::SourceDetached);
        }
        let seconds = target.as_secs_f64();
        if self.never_settle.iter().any(|t| same_time(*t, seconds)) {
            return Ok(SeekSettle::Pending);
        }
        self.pending = None;
        self.presented = Some(target);
        Ok(SeekSettle::Settled { presented: target })
    }

    fn abandon_seek(&mut self) {
        if self.pending.take().is_some() {
            self.abandoned += 1;
        }
    }

    fn snapshot(&mut self) -> Result<DynamicImage, LabelFramesError> {
        let presented = self.presented.ok_or_else(|| {
            LabelFramesError::VideoDecodeError("no settled frame".to_string())
        })?;
        let seconds = presented.as_secs_f64();
        if self.panicking_snapshots.iter().any(|t| same_time(*t, seconds)) {
            panic!("scripted snapshot panic at {seconds}s");
        }
        if self.failing_snapshots.iter().any(|t| same_time(*t, seconds)) {
            return Err(LabelFramesError::VideoDecodeError(
                "scripted snapshot failure".to_string(),
            ));
        }
        let shade = ((seconds * 10.0).round() as u64 % 256) as u8;
        let image = RgbImage::from_pixel(
            self.metadata.width,
            self.metadata.height,
            Rgb([shade, 128, 255 - shade]),
        );
        Ok(DynamicImage::ImageRgb8(image))
    }
}

/// Records every progress update.
#[derive(Default)]
pub struct RecordingProgress {
    pub infos: Mutex<Vec<ProgressInfo>>,
}

impl RecordingProgress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn percentages(&self) -> Vec<f32> {
        self.infos
            .lock()
            .unwrap()
            .iter()
            .map(|info| info.percentage)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.infos.lock().unwrap().len()
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}
