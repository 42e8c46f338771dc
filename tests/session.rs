//! Extraction session integration tests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{RecordingProgress, ScriptedSource, init_logging};
use labelframes::{
    CancellationToken, CaptureFailurePolicy, DatasetId, ErrorKind, ExtractionConfig,
    ExtractionRequest, ExtractionSession, Interval, LabelFramesError, MemoryCommitter,
    OverlapPolicy, ProgressCallback, ProgressInfo, SessionState,
};

fn session(
    source: ScriptedSource,
    fps: f64,
    intervals: Vec<Interval>,
    config: ExtractionConfig,
) -> ExtractionSession<ScriptedSource> {
    init_logging();
    ExtractionSession::new(source, ExtractionRequest::new(fps, intervals), config)
}

/// Cancels the token once `after` captures have been reported.
struct CancelAfter {
    token: CancellationToken,
    after: u64,
}

impl ProgressCallback for CancelAfter {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.processed >= self.after {
            self.token.cancel();
        }
    }
}

// ── Lifecycle ──────────────────────────────────────────────────────

#[test]
fn successful_run_walks_every_state() {
    let mut session = session(
        ScriptedSource::new(10.0),
        2.0,
        vec![Interval::new(0.0, 1.0, "a")],
        ExtractionConfig::new(),
    );
    assert_eq!(session.state(), SessionState::Idle);

    let completed = session.run().expect("run succeeds");

    assert_eq!(completed.frames().len(), 3);
    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(
        session.history(),
        &[
            SessionState::Idle,
            SessionState::Validating,
            SessionState::Running,
            SessionState::Completed,
        ]
    );
}

#[test]
fn explicit_validate_then_run() {
    let mut session = session(
        ScriptedSource::new(10.0),
        1.0,
        vec![Interval::new(2.0, 4.0, "a")],
        ExtractionConfig::new(),
    );

    let report = session.validate().expect("valid request");
    assert_eq!(report.estimated_total, 2);
    assert_eq!(report.gaps.len(), 2);
    assert_eq!(session.state(), SessionState::Validating);
    assert_eq!(session.plan().map(|plan| plan.len()), Some(3));

    let completed = session.run().unwrap();
    assert_eq!(completed.gaps().len(), 2);
    assert_eq!(session.state(), SessionState::Completed);
}

#[test]
fn validate_twice_is_rejected() {
    let mut session = session(
        ScriptedSource::new(10.0),
        1.0,
        vec![Interval::new(0.0, 1.0, "a")],
        ExtractionConfig::new(),
    );
    session.validate().unwrap();
    let error = session.validate().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Session);
}

#[test]
fn terminal_session_cannot_run_again() {
    let mut session = session(
        ScriptedSource::new(10.0),
        1.0,
        vec![Interval::new(0.0, 1.0, "a")],
        ExtractionConfig::new(),
    );
    session.run().unwrap();

    match session.run() {
        Err(LabelFramesError::InvalidSessionState { actual, .. }) => {
            assert_eq!(actual, SessionState::Completed);
        }
        other => panic!("expected InvalidSessionState, got {other:?}"),
    }
    assert_eq!(session.source().seeks.len(), 2, "no new seeks after completion");
}

#[test]
fn zero_intervals_complete_without_running() {
    let mut session = session(
        ScriptedSource::new(10.0),
        1.0,
        Vec::new(),
        ExtractionConfig::new(),
    );
    let progress = session.progress_handle();

    let completed = session.run().unwrap();

    assert!(completed.frames().is_empty());
    assert_eq!(progress.percentage(), 100.0);
    assert_eq!(
        session.history(),
        &[
            SessionState::Idle,
            SessionState::Validating,
            SessionState::Completed,
        ]
    );
    assert!(session.source().seeks.is_empty());
}

#[test]
fn frames_follow_plan_order_and_labels() {
    let mut session = session(
        ScriptedSource::new(20.0),
        1.0,
        vec![Interval::new(10.0, 11.0, "late"), Interval::new(0.0, 1.0, "early")],
        ExtractionConfig::new(),
    );
    let frames = session.run().unwrap().into_frames();
    let captured: Vec<(f64, &str)> = frames
        .iter()
        .map(|f| (f.timestamp, f.label.as_str()))
        .collect();
    assert_eq!(
        captured,
        vec![(10.0, "late"), (11.0, "late"), (0.0, "early"), (1.0, "early")]
    );
}

// ── Validation ─────────────────────────────────────────────────────

#[test]
fn invalid_request_fails_before_any_seek() {
    let mut session = session(
        ScriptedSource::new(10.0),
        1.0,
        vec![Interval::new(5.0, 2.0, "backwards")],
        ExtractionConfig::new(),
    );

    let error = session.run().unwrap_err();
    assert!(matches!(error, LabelFramesError::InvalidInterval { index: 0, .. }));
    assert!(error.is_validation());
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.source().seeks.is_empty());
}

#[test]
fn non_positive_fps_is_rejected() {
    for fps in [0.0, -1.0, f64::INFINITY] {
        let mut session = session(
            ScriptedSource::new(10.0),
            fps,
            vec![Interval::new(0.0, 1.0, "a")],
            ExtractionConfig::new(),
        );
        let error = session.run().unwrap_err();
        assert!(matches!(error, LabelFramesError::InvalidFrameRate(_)), "{error}");
    }
}

#[test]
fn empty_label_is_rejected() {
    let mut session = session(
        ScriptedSource::new(10.0),
        1.0,
        vec![Interval::new(0.0, 1.0, "ok"), Interval::new(2.0, 3.0, "  ")],
        ExtractionConfig::new(),
    );
    let error = session.run().unwrap_err();
    assert!(matches!(error, LabelFramesError::EmptyLabel { index: 1 }));
}

#[test]
fn overlaps_warn_by_default_and_run_anyway() {
    let mut session = session(
        ScriptedSource::new(10.0),
        1.0,
        vec![Interval::new(0.0, 5.0, "a"), Interval::new(4.0, 8.0, "b")],
        ExtractionConfig::new(),
    );
    let completed = session.run().unwrap();

    assert_eq!(completed.overlaps().pairs(), &[(0, 1)]);
    assert!(completed.warnings().iter().any(|w| w.contains("overlaps")));
    assert_eq!(completed.frames().len(), 6 + 5);
}

#[test]
fn overlaps_can_be_rejected() {
    let mut session = session(
        ScriptedSource::new(10.0),
        1.0,
        vec![Interval::new(0.0, 5.0, "a"), Interval::new(4.0, 8.0, "b")],
        ExtractionConfig::new().with_overlap_policy(OverlapPolicy::Reject),
    );
    match session.run() {
        Err(LabelFramesError::OverlappingIntervals { pairs }) => assert_eq!(pairs, vec![(0, 1)]),
        other => panic!("expected OverlappingIntervals, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Failed);
}

#[test]
fn zero_length_intervals_sample_nothing_unless_rejected() {
    let intervals = vec![Interval::new(3.0, 3.0, "point"), Interval::new(5.0, 6.0, "a")];

    let mut lenient = session(
        ScriptedSource::new(10.0),
        1.0,
        intervals.clone(),
        ExtractionConfig::new(),
    );
    let completed = lenient.run().unwrap();
    assert_eq!(completed.frames().len(), 2);
    assert!(completed.warnings().iter().any(|w| w.contains("zero-length")));

    let mut strict = session(
        ScriptedSource::new(10.0),
        1.0,
        intervals,
        ExtractionConfig::new().with_reject_zero_length(true),
    );
    let error = strict.run().unwrap_err();
    assert!(matches!(error, LabelFramesError::ZeroLengthInterval { index: 0, .. }));
}

// ── Capture failures ───────────────────────────────────────────────

#[test]
fn never_settling_seek_fails_the_run_and_commits_nothing() {
    let mut session = session(
        ScriptedSource::new(10.0).never_settling_at(2.0),
        1.0,
        vec![Interval::new(0.0, 4.0, "a")],
        ExtractionConfig::new().with_seek_timeout(Duration::from_millis(5)),
    );
    let mut committer = MemoryCommitter::new();

    let result = session.run();

    let error = result.as_ref().unwrap_err();
    assert!(matches!(error, LabelFramesError::SeekTimeout { .. }));
    assert_eq!(error.kind(), ErrorKind::Capture);
    assert_eq!(session.state(), SessionState::Failed);
    // Aborted at the stalled seek; later samples were never requested.
    assert_eq!(session.source().seeks, vec![0.0, 1.0, 2.0]);

    if let Ok(completed) = result {
        completed
            .commit(&mut committer, &DatasetId::new("never").unwrap())
            .unwrap();
    }
    assert!(committer.batches().is_empty());
}

#[test]
fn skip_policy_records_failures_and_completes() {
    let mut session = session(
        ScriptedSource::new(10.0)
            .never_settling_at(1.0)
            .failing_snapshot_at(3.0),
        1.0,
        vec![Interval::new(0.0, 4.0, "a")],
        ExtractionConfig::new()
            .with_seek_timeout(Duration::from_millis(5))
            .with_capture_failure_policy(CaptureFailurePolicy::Skip),
    );
    let progress = session.progress_handle();

    let completed = session.run().unwrap();

    let timestamps: Vec<f64> = completed.frames().iter().map(|f| f.timestamp).collect();
    assert_eq!(timestamps, vec![0.0, 2.0, 4.0]);
    let skipped: Vec<f64> = completed.skipped().iter().map(|s| s.timestamp).collect();
    assert_eq!(skipped, vec![1.0, 3.0]);
    assert!(completed.skipped().iter().all(|s| s.label == "a"));
    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(progress.percentage(), 100.0);
}

// ── Cancellation ───────────────────────────────────────────────────

#[test]
fn cancellation_after_n_captures_discards_everything() {
    for n in [0_u64, 1, 3, 5] {
        let token = CancellationToken::new();
        let config = ExtractionConfig::new()
            .with_cancellation(token.clone())
            .with_progress(Arc::new(CancelAfter {
                token: token.clone(),
                after: n,
            }));
        if n == 0 {
            token.cancel();
        }

        let mut session = session(
            ScriptedSource::new(20.0),
            1.0,
            vec![Interval::new(0.0, 10.0, "a")],
            config,
        );
        let mut committer = MemoryCommitter::new();

        let result = session.run();

        assert!(matches!(result, Err(LabelFramesError::Cancelled)), "n = {n}");
        assert_eq!(session.state(), SessionState::Cancelled);
        assert_eq!(session.source().seeks.len() as u64, n, "no seek after cancel");
        if let Ok(completed) = result {
            completed
                .commit(&mut committer, &DatasetId::new("cancelled").unwrap())
                .unwrap();
        }
        assert!(committer.batches().is_empty());
    }
}

// ── Progress ───────────────────────────────────────────────────────

#[test]
fn progress_is_monotonic_and_ends_at_100() {
    let recorder = RecordingProgress::new();
    let mut session = session(
        ScriptedSource::new(10.0),
        2.0,
        vec![Interval::new(0.0, 2.0, "a"), Interval::new(5.0, 6.0, "b")],
        ExtractionConfig::new().with_progress(recorder.clone()),
    );
    let handle = session.progress_handle();
    assert_eq!(handle.percentage(), 0.0);

    session.run().unwrap();

    let percentages = recorder.percentages();
    // 5 + 3 captures, plus the completion report.
    assert_eq!(percentages.len(), 9);
    assert!(percentages.windows(2).all(|w| w[0] <= w[1]), "{percentages:?}");
    assert!(percentages.iter().all(|p| (0.0..=100.0).contains(p)));
    assert_eq!(*percentages.last().unwrap(), 100.0);
    assert_eq!(handle.processed(), 8);
    assert_eq!(handle.total(), 6);
    assert!(handle.is_complete());
}

#[test]
fn progress_batch_size_limits_callbacks() {
    let recorder = RecordingProgress::new();
    let mut session = session(
        ScriptedSource::new(10.0),
        1.0,
        vec![Interval::new(0.0, 9.0, "a")],
        ExtractionConfig::new()
            .with_progress(recorder.clone())
            .with_batch_size(4),
    );
    session.run().unwrap();
    // 10 captures -> reports after 4 and 8, plus completion.
    assert_eq!(recorder.len(), 3);
}

// ── Commit ─────────────────────────────────────────────────────────

#[test]
fn completed_run_commits_whole_batch() {
    let mut session = session(
        ScriptedSource::new(10.0),
        1.0,
        vec![Interval::new(0.0, 2.0, "a"), Interval::new(4.0, 5.0, "b")],
        ExtractionConfig::new(),
    );
    let dataset = DatasetId::new("animals").unwrap();
    let mut committer = MemoryCommitter::new();

    let receipt = session
        .run()
        .unwrap()
        .commit(&mut committer, &dataset)
        .unwrap();

    assert_eq!(receipt.frames, 5);
    assert_eq!(receipt.dataset, dataset);
    assert_eq!(committer.batches().len(), 1);
    assert_eq!(committer.frames_for(&dataset).len(), 5);
}

#[test]
fn into_source_returns_the_source() {
    let mut session = session(
        ScriptedSource::new(10.0),
        1.0,
        vec![Interval::new(0.0, 1.0, "a")],
        ExtractionConfig::new(),
    );
    session.run().unwrap();
    let source = session.into_source();
    assert_eq!(source.seeks, vec![0.0, 1.0]);
}
