//! Settle channel and `VideoSource` forwarding tests.

mod common;

use std::time::Duration;

use common::ScriptedSource;
use labelframes::{LabelFramesError, SeekSettle, VideoSource, settle_channel};

// ── settle_channel ─────────────────────────────────────────────────

#[test]
fn armed_seek_settles_on_matching_notification() {
    let (notifier, mut signal) = settle_channel();
    let id = signal.arm();
    assert_eq!(signal.armed(), Some(id));

    assert!(notifier.notify(id, Duration::from_millis(1500)));
    let settle = signal.wait(Duration::from_secs(1)).unwrap();

    assert_eq!(
        settle,
        SeekSettle::Settled {
            presented: Duration::from_millis(1500)
        }
    );
    assert_eq!(signal.armed(), None);
}

#[test]
fn stale_notifications_are_ignored() {
    let (notifier, mut signal) = settle_channel();
    let abandoned = signal.arm();
    signal.disarm();
    let current = signal.arm();
    assert_ne!(abandoned, current);

    notifier.notify(abandoned, Duration::from_secs(1));
    notifier.notify(current, Duration::from_secs(2));

    assert_eq!(
        signal.wait(Duration::from_secs(1)).unwrap(),
        SeekSettle::Settled {
            presented: Duration::from_secs(2)
        }
    );
}

#[test]
fn wait_times_out_as_pending() {
    let (_notifier, mut signal) = settle_channel();
    signal.arm();
    let settle = signal.wait(Duration::from_millis(20)).unwrap();
    assert_eq!(settle, SeekSettle::Pending);
}

#[test]
fn notification_from_another_thread() {
    let (notifier, mut signal) = settle_channel();
    let id = signal.arm();

    let sender = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(10));
        notifier.notify(id, Duration::from_millis(40))
    });

    let settle = signal.wait(Duration::from_secs(5)).unwrap();
    assert!(sender.join().unwrap());
    assert_eq!(
        settle,
        SeekSettle::Settled {
            presented: Duration::from_millis(40)
        }
    );
}

#[test]
fn dropped_notifier_detaches() {
    let (notifier, mut signal) = settle_channel();
    signal.arm();
    drop(notifier);

    assert!(matches!(
        signal.wait(Duration::from_secs(1)),
        Err(LabelFramesError::SourceDetached)
    ));
}

#[test]
fn waiting_without_a_seek_fails() {
    let (_notifier, mut signal) = settle_channel();
    let error = signal.wait(Duration::from_millis(10)).unwrap_err();
    assert!(error.is_capture_failure());
}

#[test]
fn notify_after_signal_dropped_returns_false() {
    let (notifier, signal) = settle_channel();
    drop(signal);
    assert!(!notifier.notify(0, Duration::ZERO));
}

// ── Forwarding impls ───────────────────────────────────────────────

fn capture_one<S: VideoSource>(source: &mut S, seconds: u64) -> (u32, u32) {
    source.request_seek(Duration::from_secs(seconds)).unwrap();
    let settle = source.await_settle(Duration::from_secs(1)).unwrap();
    assert!(matches!(settle, SeekSettle::Settled { .. }));
    let image = source.snapshot().unwrap();
    (image.width(), image.height())
}

#[test]
fn boxed_sources_forward() {
    let mut boxed: Box<dyn VideoSource> = Box::new(ScriptedSource::with_size(5.0, 8, 6));
    assert_eq!(boxed.metadata().width, 8);
    assert_eq!(capture_one(&mut boxed, 2), (8, 6));
}

#[test]
fn borrowed_sources_forward() {
    let mut source = ScriptedSource::new(5.0);
    {
        let mut borrowed = &mut source;
        capture_one(&mut borrowed, 1);
        capture_one(&mut borrowed, 3);
    }
    assert_eq!(source.seeks, vec![1.0, 3.0]);
}

#[test]
fn abandon_clears_the_seek_in_flight() {
    let mut source = ScriptedSource::new(5.0).never_settling_at(1.0);
    source.request_seek(Duration::from_secs(1)).unwrap();
    assert_eq!(
        source.await_settle(Duration::from_millis(5)).unwrap(),
        SeekSettle::Pending
    );
    assert!(source.request_seek(Duration::from_secs(2)).is_err());

    source.abandon_seek();
    assert!(source.request_seek(Duration::from_secs(2)).is_ok());
    assert_eq!(source.abandoned, 1);
    assert_eq!(source.overlapping_seeks, 1);
}
