//! Error classification and FFmpeg-source error path tests.

mod common;

use std::path::Path;
use std::time::Duration;

use common::sample_video_path;
use labelframes::{ErrorKind, FfmpegSource, LabelFramesError, SessionState};

#[test]
fn open_nonexistent_file() {
    let result = FfmpegSource::open("/nonexistent/path/to/video.mp4");
    match result {
        Err(LabelFramesError::FileOpen { path, .. }) => {
            assert_eq!(path, Path::new("/nonexistent/path/to/video.mp4"));
        }
        other => panic!("expected FileOpen, got {other:?}"),
    }
}

#[test]
fn open_invalid_file() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("not_a_video.mp4");
    std::fs::write(&path, b"definitely not a video container").unwrap();

    let error = FfmpegSource::open(&path).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Source);
}

#[test]
fn kinds_classify_every_family() {
    let cases = [
        (
            LabelFramesError::InvalidInterval {
                index: 0,
                start: 2.0,
                end: 1.0,
            },
            ErrorKind::Validation,
        ),
        (LabelFramesError::EmptyLabel { index: 3 }, ErrorKind::Validation),
        (LabelFramesError::InvalidFrameRate(0.0), ErrorKind::Validation),
        (
            LabelFramesError::OverlappingIntervals { pairs: vec![(0, 1)] },
            ErrorKind::Validation,
        ),
        (
            LabelFramesError::SeekTimeout {
                timestamp: 1.0,
                timeout: Duration::from_secs(10),
            },
            ErrorKind::Capture,
        ),
        (
            LabelFramesError::CaptureFailure {
                timestamp: 1.0,
                reason: "decode".to_string(),
            },
            ErrorKind::Capture,
        ),
        (LabelFramesError::SourceDetached, ErrorKind::Capture),
        (LabelFramesError::Cancelled, ErrorKind::Cancelled),
        (LabelFramesError::NoVideoStream, ErrorKind::Source),
        (
            LabelFramesError::InvalidDataset("..".to_string()),
            ErrorKind::Commit,
        ),
        (
            LabelFramesError::InvalidSessionState {
                expected: "idle",
                actual: SessionState::Completed,
            },
            ErrorKind::Session,
        ),
    ];

    for (error, kind) in cases {
        assert_eq!(error.kind(), kind, "{error}");
    }
}

#[test]
fn capture_family_helpers() {
    let timeout = LabelFramesError::SeekTimeout {
        timestamp: 2.5,
        timeout: Duration::from_millis(250),
    };
    assert!(timeout.is_capture_failure());
    assert!(!timeout.is_validation());
    assert_eq!(
        timeout.to_string(),
        "Seek to 2.500s did not settle within 250ms"
    );
}

#[test]
fn overlap_error_lists_pairs() {
    let error = LabelFramesError::OverlappingIntervals {
        pairs: vec![(0, 1), (2, 5)],
    };
    assert_eq!(error.to_string(), "Overlapping intervals: 0/1, 2/5");
}

#[test]
fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error: LabelFramesError = io.into();
    assert!(matches!(error, LabelFramesError::IoError(_)));
    assert_eq!(error.kind(), ErrorKind::Commit);
}

#[test]
fn fixture_opens_when_present() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }
    assert!(FfmpegSource::open(path).is_ok());
}
