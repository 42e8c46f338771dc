//! Async extraction (feature `async`).
//!
//! Sessions block while they wait for seeks to settle, so
//! [`spawn_extraction`] moves the whole run onto
//! `tokio::task::spawn_blocking` and hands back an [`ExtractionTask`] future.
//! Progress can be observed while the task runs, either by polling the
//! task's [`ProgressHandle`] or by consuming a [`ProgressStream`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokio_stream::StreamExt;
//!
//! use labelframes::{
//!     ExtractionConfig, ExtractionRequest, ExtractionSession, Interval, LabelFramesError,
//!     ProgressStream, spawn_extraction,
//! };
//!
//! # async fn example() -> Result<(), LabelFramesError> {
//! let (callback, mut updates) = ProgressStream::channel();
//! let config = ExtractionConfig::new().with_progress(Arc::new(callback));
//! let request = ExtractionRequest::new(1.0, vec![Interval::new(0.0, 30.0, "intro")]);
//! let session = ExtractionSession::open("talk.mp4", request, config)?;
//!
//! let task = spawn_extraction(session);
//! while let Some(info) = updates.next().await {
//!     println!("{:.0}%", info.percentage);
//! }
//! let completed = task.await?;
//! println!("{} frames", completed.frames().len());
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_stream::Stream;

use crate::error::LabelFramesError;
use crate::progress::{ProgressCallback, ProgressHandle, ProgressInfo};
use crate::session::{CompletedExtraction, ExtractionSession};
use crate::source::VideoSource;

/// A session running on a blocking thread.
///
/// Resolves to the session's outcome. If the blocking task is aborted by the
/// runtime, the future resolves to [`LabelFramesError::Cancelled`]; a panic
/// inside the session (for example in a source or progress callback) is
/// resumed on the awaiting task.
pub struct ExtractionTask {
    handle: JoinHandle<Result<CompletedExtraction, LabelFramesError>>,
    progress: ProgressHandle,
}

impl ExtractionTask {
    /// Live progress of the running session.
    pub fn progress(&self) -> ProgressHandle {
        self.progress.clone()
    }

    /// Returns `true` once the blocking task has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for ExtractionTask {
    type Output = Result<CompletedExtraction, LabelFramesError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|result| match result {
                Ok(outcome) => outcome,
                Err(join_error) if join_error.is_panic() => {
                    std::panic::resume_unwind(join_error.into_panic())
                }
                Err(_) => Err(LabelFramesError::Cancelled),
            })
    }
}

/// Run `session` to completion on Tokio's blocking pool.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_extraction<S>(mut session: ExtractionSession<S>) -> ExtractionTask
where
    S: VideoSource + Send + 'static,
{
    let progress = session.progress_handle();
    let handle = tokio::task::spawn_blocking(move || session.run());
    ExtractionTask { handle, progress }
}

/// A stream of [`ProgressInfo`] updates from a running session.
///
/// The stream ends once the session (and with it the configuration holding
/// the sending half) is dropped.
pub struct ProgressStream {
    receiver: UnboundedReceiver<ProgressInfo>,
}

impl ProgressStream {
    /// Create a connected callback / stream pair.
    ///
    /// Install the callback with
    /// [`ExtractionConfig::with_progress`](crate::ExtractionConfig::with_progress).
    pub fn channel() -> (StreamingProgress, ProgressStream) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (StreamingProgress { sender }, ProgressStream { receiver })
    }
}

impl Stream for ProgressStream {
    type Item = ProgressInfo;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// [`ProgressCallback`] that forwards every update to a [`ProgressStream`].
#[derive(Debug, Clone)]
pub struct StreamingProgress {
    sender: UnboundedSender<ProgressInfo>,
}

impl ProgressCallback for StreamingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        // The receiver may have been dropped; progress is best-effort.
        let _ = self.sender.send(info.clone());
    }
}
