//! Progress tracking and cancellation integration tests.

mod common;

use common::RecordingProgress;
use labelframes::{CancellationToken, ProgressHandle, ProgressTracker};

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_default_not_cancelled() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
    assert!(!CancellationToken::default().is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn cancellation_is_visible_across_threads() {
    let token = CancellationToken::new();
    let remote = token.clone();
    std::thread::spawn(move || remote.cancel()).join().unwrap();
    assert!(token.is_cancelled());
}

// ── ProgressTracker ────────────────────────────────────────────────

#[test]
fn percentage_tracks_processed_over_total() {
    let mut tracker = ProgressTracker::new(4);
    assert_eq!(tracker.percentage(), 0.0);

    tracker.advance(None, None);
    assert_eq!(tracker.percentage(), 25.0);
    tracker.advance(None, None);
    tracker.advance(None, None);
    assert_eq!(tracker.percentage(), 75.0);
    assert_eq!(tracker.processed(), 3);
    assert_eq!(tracker.total(), 4);
}

#[test]
fn zero_total_reads_as_complete() {
    let tracker = ProgressTracker::new(0);
    assert_eq!(tracker.percentage(), 100.0);
}

#[test]
fn overshooting_the_estimate_is_capped() {
    let mut tracker = ProgressTracker::new(2);
    for _ in 0..3 {
        tracker.advance(None, None);
    }
    assert_eq!(tracker.percentage(), 100.0);
    assert_eq!(tracker.processed(), 3);
}

#[test]
fn complete_pins_to_100_even_when_short() {
    let mut tracker = ProgressTracker::new(10);
    tracker.advance(None, None);
    tracker.complete();
    assert_eq!(tracker.percentage(), 100.0);
    assert!(tracker.handle().is_complete());
}

#[test]
fn handle_observes_tracker_from_another_thread() {
    let mut tracker = ProgressTracker::new(2);
    let handle = tracker.handle();

    let observer = std::thread::spawn({
        let handle = handle.clone();
        move || handle.percentage()
    });
    let seen = observer.join().unwrap();
    assert!((0.0..=100.0).contains(&seen));

    tracker.advance(None, None);
    assert_eq!(handle.processed(), 1);
    assert_eq!(handle.percentage(), 50.0);
}

#[test]
fn detached_handle_reads_zero() {
    let handle = ProgressHandle::default();
    assert!(!handle.is_started());
    assert_eq!(handle.percentage(), 0.0);
}

// ── Callbacks ──────────────────────────────────────────────────────

#[test]
fn callback_receives_sample_details() {
    let recorder = RecordingProgress::new();
    let mut tracker = ProgressTracker::with_callback(3, recorder.clone(), 1);

    tracker.advance(Some(1.5), Some("cat"));

    let infos = recorder.infos.lock().unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].processed, 1);
    assert_eq!(infos[0].total, 3);
    assert_eq!(infos[0].current_timestamp, Some(1.5));
    assert_eq!(infos[0].current_label.as_deref(), Some("cat"));
    assert!(infos[0].estimated_remaining.is_some());
}

#[test]
fn callback_respects_batch_size() {
    let recorder = RecordingProgress::new();
    let mut tracker = ProgressTracker::with_callback(10, recorder.clone(), 3);

    for _ in 0..7 {
        tracker.advance(None, None);
    }
    assert_eq!(recorder.len(), 2);

    tracker.complete();
    let percentages = recorder.percentages();
    assert_eq!(percentages.len(), 3);
    assert_eq!(percentages[2], 100.0);
}

#[test]
fn zero_batch_size_is_clamped() {
    let recorder = RecordingProgress::new();
    let mut tracker = ProgressTracker::with_callback(2, recorder.clone(), 0);
    tracker.advance(None, None);
    assert_eq!(recorder.len(), 1);
}
