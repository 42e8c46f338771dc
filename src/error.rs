//! Error types for the `labelframes` crate.
//!
//! This module defines [`LabelFramesError`], the unified error type returned
//! by all fallible operations in the crate, and [`ErrorKind`], the coarse
//! classification callers use to decide between "fix the input",
//! "retry with a new session", and "the user gave up".

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use serde_json::Error as JsonError;
use thiserror::Error;

use crate::session::SessionState;

/// Coarse classification of a [`LabelFramesError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed request, rejected before any frame is captured.
    Validation,
    /// A seek never settled, or decoding / snapshotting / encoding failed.
    Capture,
    /// The caller cancelled the run.
    Cancelled,
    /// The video source could not be opened or described.
    Source,
    /// Handing the finished batch to storage failed.
    Commit,
    /// The session was driven through an illegal state transition.
    Session,
}

/// The unified error type for all `labelframes` operations.
///
/// Variants carry enough context (interval indices, timestamps, paths) to
/// diagnose the problem without additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LabelFramesError {
    /// An interval ends before it starts.
    #[error("Interval {index} is invalid: end ({end}s) is before start ({start}s)")]
    InvalidInterval {
        /// Position of the interval in the caller's list.
        index: usize,
        /// Declared start, in seconds.
        start: f64,
        /// Declared end, in seconds.
        end: f64,
    },

    /// An interval bound is negative or not a finite number.
    #[error("Interval {index} has an invalid time value: {value}")]
    InvalidTime {
        /// Position of the interval in the caller's list.
        index: usize,
        /// The offending bound.
        value: f64,
    },

    /// An interval has an empty (or whitespace-only) label.
    #[error("Interval {index} has an empty label")]
    EmptyLabel {
        /// Position of the interval in the caller's list.
        index: usize,
    },

    /// An interval has `start == end` and zero-length intervals are rejected.
    #[error("Interval {index} is zero-length ({at}s)")]
    ZeroLengthInterval {
        /// Position of the interval in the caller's list.
        index: usize,
        /// The shared start/end value.
        at: f64,
    },

    /// Intervals overlap and the overlap policy is [`Reject`](crate::OverlapPolicy::Reject).
    #[error("Overlapping intervals: {}", format_pairs(.pairs))]
    OverlappingIntervals {
        /// Zero-based `(i, j)` index pairs, `i < j`.
        pairs: Vec<(usize, usize)>,
    },

    /// The sampling rate is zero, negative, or not finite.
    #[error("Sampling rate must be a positive number of frames per second, got {0}")]
    InvalidFrameRate(f64),

    /// The seek to `timestamp` did not settle within `timeout`.
    #[error("Seek to {timestamp:.3}s did not settle within {timeout:?}")]
    SeekTimeout {
        /// Requested timestamp, in seconds.
        timestamp: f64,
        /// The bound that expired.
        timeout: Duration,
    },

    /// A capture step failed for a reason other than a timeout.
    #[error("Failed to capture frame at {timestamp:.3}s: {reason}")]
    CaptureFailure {
        /// Requested timestamp, in seconds.
        timestamp: f64,
        /// Underlying reason the capture failed.
        reason: String,
    },

    /// A seek was requested while another was still in flight.
    #[error("Seek to {requested:.3}s issued while seek to {in_flight:.3}s is unresolved")]
    SeekInFlight {
        /// Timestamp of the unresolved seek.
        in_flight: f64,
        /// Timestamp of the rejected request.
        requested: f64,
    },

    /// The source is no longer attached to a decodable stream.
    #[error("Video source is detached")]
    SourceDetached,

    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::FfmpegSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The run was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// A dataset identity is empty or would escape the storage root.
    #[error("Invalid dataset name: {0:?}")]
    InvalidDataset(String),

    /// The storage collaborator rejected the batch.
    #[error("Failed to commit frames to dataset {dataset}: {reason}")]
    CommitFailed {
        /// Dataset the batch was filed under.
        dataset: String,
        /// Underlying reason.
        reason: String,
    },

    /// The session is not in a state that allows the requested operation.
    #[error("Session is {actual:?}, expected {expected}")]
    InvalidSessionState {
        /// Human-readable description of the state(s) that would be legal.
        expected: &'static str,
        /// The state the session was actually in.
        actual: SessionState,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while scaling or encoding a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// A manifest or interval file could not be (de)serialized.
    #[error("JSON error: {0}")]
    JsonError(#[from] JsonError),
}

impl LabelFramesError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LabelFramesError::InvalidInterval { .. }
            | LabelFramesError::InvalidTime { .. }
            | LabelFramesError::EmptyLabel { .. }
            | LabelFramesError::ZeroLengthInterval { .. }
            | LabelFramesError::OverlappingIntervals { .. }
            | LabelFramesError::InvalidFrameRate(_) => ErrorKind::Validation,
            LabelFramesError::SeekTimeout { .. }
            | LabelFramesError::CaptureFailure { .. }
            | LabelFramesError::SeekInFlight { .. }
            | LabelFramesError::SourceDetached
            | LabelFramesError::VideoDecodeError(_)
            | LabelFramesError::ImageError(_) => ErrorKind::Capture,
            LabelFramesError::Cancelled => ErrorKind::Cancelled,
            LabelFramesError::FileOpen { .. }
            | LabelFramesError::NoVideoStream
            | LabelFramesError::FfmpegError(_) => ErrorKind::Source,
            LabelFramesError::InvalidDataset(_)
            | LabelFramesError::CommitFailed { .. }
            | LabelFramesError::IoError(_)
            | LabelFramesError::JsonError(_) => ErrorKind::Commit,
            LabelFramesError::InvalidSessionState { .. } => ErrorKind::Session,
        }
    }

    /// Returns `true` for errors raised while validating a request.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Returns `true` for capture failures, including seek timeouts.
    pub fn is_capture_failure(&self) -> bool {
        self.kind() == ErrorKind::Capture
    }
}

impl From<FfmpegError> for LabelFramesError {
    fn from(error: FfmpegError) -> Self {
        LabelFramesError::FfmpegError(error.to_string())
    }
}

fn format_pairs(pairs: &[(usize, usize)]) -> String {
    pairs
        .iter()
        .map(|(i, j)| format!("{i}/{j}"))
        .collect::<Vec<_>>()
        .join(", ")
}
