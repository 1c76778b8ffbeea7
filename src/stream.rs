//! Republishes a decoded SSE body as an ordered, cancellable sequence of text fragments.
//!
//! A background task (the pump) reads frames, decodes them, and hands each non-empty text
//! delta to the consumer through a channel with room for a single fragment, so the pump never
//! runs more than one fragment ahead of the reader.  The pump is a small state machine:
//!
//! ```text
//! Reading --text--> Delivering --sent--> Reading
//! Reading --error--> Delivering --sent--> Closed(Failed)
//! Reading --[DONE] / end of body--> Closed(Finished)
//! Reading, Delivering --cancelled / consumer gone--> Closed
//! ```
//!
//! Leaving the loop drops the frame stream and with it the HTTP response, so the connection is
//! released exactly once no matter how the stream ends.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::observability::{STREAM_CANCELLATIONS, STREAM_DURATION, STREAM_ERRORS, STREAM_FRAMES};
use crate::sse::{DecodedDelta, decode_frame, frames};

/// One element of a [`CompletionStream`].
#[derive(Clone, Debug)]
pub enum StreamFragment {
    /// A non-empty piece of generated text.
    Text(String),
    /// The stream failed; this is always the last element.
    Error(Error),
}

impl StreamFragment {
    /// Returns the text of a `Text` fragment.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamFragment::Text(text) => Some(text),
            StreamFragment::Error(_) => None,
        }
    }

    /// Returns the error of an `Error` fragment.
    pub fn error(&self) -> Option<&Error> {
        match self {
            StreamFragment::Text(_) => None,
            StreamFragment::Error(err) => Some(err),
        }
    }

    /// Returns true for the terminal error element.
    pub fn is_error(&self) -> bool {
        matches!(self, StreamFragment::Error(_))
    }
}

/// How a pump stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The sentinel arrived or the body ended cleanly.
    Finished,
    /// An error was delivered as the terminal fragment.
    Failed,
    /// The cancellation token fired.
    Cancelled,
    /// The consumer dropped its end of the channel.
    Abandoned,
}

enum PumpState {
    Reading,
    Delivering(StreamFragment),
    Closed(StreamOutcome),
}

/// Consumer side of a streaming completion.
///
/// Yields [`StreamFragment`]s in the order the model generated them.  A failed stream ends
/// with exactly one `Error` fragment; a cancelled stream ends with one
/// `Error(Error::Abort { .. })`; a successful stream simply ends.
#[derive(Debug)]
pub struct CompletionStream {
    rx: mpsc::Receiver<StreamFragment>,
    cancel: CancellationToken,
    pump: Option<JoinHandle<StreamOutcome>>,
    done: bool,
}

impl CompletionStream {
    /// Start a pump over `byte_stream` and return the consumer side.
    ///
    /// `cancel` stops the pump; cancelling it (or calling [`CompletionStream::cancel`]) drops
    /// the byte stream promptly.  Must be called from within a tokio runtime.
    pub fn spawn<S, E>(byte_stream: S, cancel: CancellationToken) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + Unpin + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let pump = tokio::spawn(pump(frames(byte_stream), tx, cancel.clone()));
        Self {
            rx,
            cancel,
            pump: Some(pump),
            done: false,
        }
    }

    /// Stop the stream.  The next poll yields a cancellation error, then the end.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The token that stops this stream.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drain the stream, returning the concatenated text or the terminal error.
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            match fragment {
                StreamFragment::Text(delta) => text.push_str(&delta),
                StreamFragment::Error(err) => return Err(err),
            }
        }
        Ok(text)
    }

    /// Wait for the pump to exit and report how it stopped.
    ///
    /// Cancels the stream first if it has not ended, so this never waits on the network.
    pub async fn close(mut self) -> Option<StreamOutcome> {
        if !self.done {
            self.cancel.cancel();
        }
        self.rx.close();
        let pump = self.pump.take()?;
        pump.await.ok()
    }
}

impl Stream for CompletionStream {
    type Item = StreamFragment;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamFragment>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.cancel.is_cancelled() {
            this.done = true;
            this.rx.close();
            return Poll::Ready(Some(StreamFragment::Error(Error::abort("stream cancelled"))));
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(fragment)) => {
                if fragment.is_error() {
                    this.done = true;
                }
                Poll::Ready(Some(fragment))
            }
            Poll::Ready(None) => {
                this.done = true;
                if this.cancel.is_cancelled() {
                    Poll::Ready(Some(StreamFragment::Error(Error::abort("stream cancelled"))))
                } else {
                    Poll::Ready(None)
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

async fn pump<F>(
    mut frames: F,
    tx: mpsc::Sender<StreamFragment>,
    cancel: CancellationToken,
) -> StreamOutcome
where
    F: Stream<Item = Result<Bytes>> + Unpin,
{
    let started = Instant::now();
    let mut state = PumpState::Reading;
    let outcome = loop {
        state = match state {
            PumpState::Reading => {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(StreamOutcome::Cancelled),
                    _ = tx.closed() => Err(StreamOutcome::Abandoned),
                    next = frames.next() => Ok(next),
                };
                match next {
                    Err(outcome) => PumpState::Closed(outcome),
                    Ok(None) => PumpState::Closed(StreamOutcome::Finished),
                    Ok(Some(Err(err))) => PumpState::Delivering(StreamFragment::Error(err)),
                    Ok(Some(Ok(frame))) => {
                        STREAM_FRAMES.click();
                        match decode_frame(&frame) {
                            Ok(DecodedDelta::Text(text)) if text.is_empty() => PumpState::Reading,
                            Ok(DecodedDelta::Text(text)) => {
                                PumpState::Delivering(StreamFragment::Text(text))
                            }
                            Ok(DecodedDelta::StreamEnd) => {
                                PumpState::Closed(StreamOutcome::Finished)
                            }
                            Err(err) => PumpState::Delivering(StreamFragment::Error(err)),
                        }
                    }
                }
            }
            PumpState::Delivering(fragment) => {
                let terminal = fragment.is_error();
                if let StreamFragment::Error(err) = &fragment {
                    STREAM_ERRORS.click();
                    tracing::warn!(error = %err, "completion stream failed");
                }
                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    sent = tx.send(fragment) => Some(sent.is_ok()),
                };
                match sent {
                    None => PumpState::Closed(StreamOutcome::Cancelled),
                    Some(false) => PumpState::Closed(StreamOutcome::Abandoned),
                    Some(true) if terminal => PumpState::Closed(StreamOutcome::Failed),
                    Some(true) => PumpState::Reading,
                }
            }
            PumpState::Closed(outcome) => break outcome,
        };
    };
    drop(frames);
    if outcome == StreamOutcome::Cancelled {
        STREAM_CANCELLATIONS.click();
    }
    STREAM_DURATION.add(started.elapsed().as_secs_f64());
    tracing::debug!(?outcome, "completion stream closed");
    outcome
}
