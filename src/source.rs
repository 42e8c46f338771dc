//! Seekable video sources.
//!
//! The sampling engine never decodes video itself. It drives a
//! [`VideoSource`]: ask it to seek, wait for the seek to settle, then
//! snapshot the frame it is showing. [`FfmpegSource`](crate::FfmpegSource)
//! implements this for media files; other backends (a hardware decoder, a
//! player widget that reports seeks through a callback) implement the trait
//! themselves.
//!
//! Callback-driven backends can use [`settle_channel`] to turn a fire-once
//! "seeked" callback into the blocking, timeout-bounded wait the engine
//! expects:
//!
//! ```
//! use std::time::Duration;
//!
//! use labelframes::source::{SeekSettle, settle_channel};
//!
//! let (notifier, mut signal) = settle_channel();
//! let seek_id = signal.arm();
//!
//! // Normally fired from the backend's callback thread.
//! notifier.notify(seek_id, Duration::from_millis(500));
//!
//! let settle = signal.wait(Duration::from_secs(1)).unwrap();
//! assert_eq!(settle, SeekSettle::Settled { presented: Duration::from_millis(500) });
//! ```

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use image::DynamicImage;

use crate::error::LabelFramesError;
use crate::metadata::VideoMetadata;

/// Outcome of waiting for a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekSettle {
    /// The frame nearest the requested time is decoded and ready.
    Settled {
        /// Presentation time of the frame the source settled on.
        presented: Duration,
    },
    /// The timeout expired before the source settled.
    Pending,
}

/// A seekable video stream with a single decode surface.
///
/// The engine calls these methods in a strict cycle per sample:
/// [`request_seek`](Self::request_seek), then
/// [`await_settle`](Self::await_settle), then [`snapshot`](Self::snapshot)
/// once settled. It never requests a second seek before the first has
/// settled or been abandoned, so implementations may assume at most one seek
/// is in flight.
pub trait VideoSource {
    /// Describe the attached stream.
    fn metadata(&self) -> VideoMetadata;

    /// Begin seeking to `timestamp`.
    ///
    /// May return before the seek completes; completion is observed through
    /// [`await_settle`](Self::await_settle).
    fn request_seek(&mut self, timestamp: Duration) -> Result<(), LabelFramesError>;

    /// Block until the pending seek settles or `timeout` elapses.
    ///
    /// Returns [`SeekSettle::Pending`] on timeout rather than an error; the
    /// caller decides what a stall means.
    fn await_settle(&mut self, timeout: Duration) -> Result<SeekSettle, LabelFramesError>;

    /// Forget a seek that will not be waited on any longer.
    ///
    /// Called after a timeout or failure so a late settle from the abandoned
    /// seek cannot be mistaken for the next one.
    fn abandon_seek(&mut self) {}

    /// Copy the currently decoded frame at source resolution.
    fn snapshot(&mut self) -> Result<DynamicImage, LabelFramesError>;
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn metadata(&self) -> VideoMetadata {
        (**self).metadata()
    }

    fn request_seek(&mut self, timestamp: Duration) -> Result<(), LabelFramesError> {
        (**self).request_seek(timestamp)
    }

    fn await_settle(&mut self, timeout: Duration) -> Result<SeekSettle, LabelFramesError> {
        (**self).await_settle(timeout)
    }

    fn abandon_seek(&mut self) {
        (**self).abandon_seek()
    }

    fn snapshot(&mut self) -> Result<DynamicImage, LabelFramesError> {
        (**self).snapshot()
    }
}

impl<S: VideoSource + ?Sized> VideoSource for &mut S {
    fn metadata(&self) -> VideoMetadata {
        (**self).metadata()
    }

    fn request_seek(&mut self, timestamp: Duration) -> Result<(), LabelFramesError> {
        (**self).request_seek(timestamp)
    }

    fn await_settle(&mut self, timeout: Duration) -> Result<SeekSettle, LabelFramesError> {
        (**self).await_settle(timeout)
    }

    fn abandon_seek(&mut self) {
        (**self).abandon_seek()
    }

    fn snapshot(&mut self) -> Result<DynamicImage, LabelFramesError> {
        (**self).snapshot()
    }
}

/// A settle notification sent by a backend.
#[derive(Debug, Clone, Copy)]
struct Settlement {
    seek_id: u64,
    presented: Duration,
}

/// Sending half of a settle channel, handed to the backend's callback.
#[derive(Debug, Clone)]
pub struct SettleNotifier {
    sender: Sender<Settlement>,
}

impl SettleNotifier {
    /// Report that the seek identified by `seek_id` has settled on the frame
    /// presented at `presented`.
    ///
    /// Returns `false` if the waiting side has been dropped.
    pub fn notify(&self, seek_id: u64, presented: Duration) -> bool {
        self.sender
            .send(Settlement { seek_id, presented })
            .is_ok()
    }
}

/// Receiving half of a settle channel, owned by the source.
///
/// Each seek is [`arm`](Self::arm)ed with a fresh id; only a notification
/// carrying the armed id settles it. Notifications for earlier, abandoned
/// seeks are drained and ignored.
#[derive(Debug)]
pub struct SettleSignal {
    receiver: Receiver<Settlement>,
    armed: Option<u64>,
    next_id: u64,
}

/// Create a connected notifier / signal pair.
pub fn settle_channel() -> (SettleNotifier, SettleSignal) {
    let (sender, receiver) = mpsc::channel();
    (
        SettleNotifier { sender },
        SettleSignal {
            receiver,
            armed: None,
            next_id: 0,
        },
    )
}

impl SettleSignal {
    /// Arm the signal for a new seek and return the id the backend must
    /// echo back through [`SettleNotifier::notify`].
    pub fn arm(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.armed = Some(id);
        id
    }

    /// Forget the armed seek.
    pub fn disarm(&mut self) {
        self.armed = None;
    }

    /// The id of the seek currently awaited, if any.
    pub fn armed(&self) -> Option<u64> {
        self.armed
    }

    /// Wait up to `timeout` for the armed seek to settle.
    ///
    /// # Errors
    ///
    /// - [`LabelFramesError::CaptureFailure`] if nothing is armed.
    /// - [`LabelFramesError::SourceDetached`] if every notifier was dropped.
    pub fn wait(&mut self, timeout: Duration) -> Result<SeekSettle, LabelFramesError> {
        let armed = self.armed.ok_or_else(|| LabelFramesError::CaptureFailure {
            timestamp: f64::NAN,
            reason: "waited for a seek that was never requested".to_string(),
        })?;
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(settlement) if settlement.seek_id == armed => {
                    self.armed = None;
                    return Ok(SeekSettle::Settled {
                        presented: settlement.presented,
                    });
                }
                Ok(stale) => {
                    log::debug!("Ignoring stale settle for seek {}", stale.seek_id);
                }
                Err(RecvTimeoutError::Timeout) => return Ok(SeekSettle::Pending),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(LabelFramesError::SourceDetached);
                }
            }
        }
    }
}
