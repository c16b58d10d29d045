//! Scan orchestrator - runs one category scan as a cancellable task.
//!
//! A scan moves `idle → running → {completed, failed, cancelled}`. The
//! running task owns the sending half of the event channel; the caller holds
//! a [`ScanTask`] with the receiver, a cancellation token and the join
//! handle. Completion sends `done`, a fatal error sends `error`, and
//! cancellation (token or dropped receiver) sends nothing.

mod emitter;

pub use emitter::EventEmitter;

use crate::error::ScanError;
use crate::protocol::ScanEvent;
use crate::scanner::{scanner_for, ScanContext, ScanSummary};
use crate::types::{Category, ScanId};
use futures::Stream;
use serde::Serialize;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{error, info, info_span, Instrument};

/// Events buffered between the scan task and its consumer.
const EVENT_BUFFER: usize = 64;

/// Lifecycle of a scan task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ScanState {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Final result of a scan task.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Completed(ScanSummary),
    /// Carries the detail sent in the `error` event.
    Failed(String),
    Cancelled,
}

impl ScanOutcome {
    pub fn state(&self) -> ScanState {
        match self {
            Self::Completed(_) => ScanState::Completed,
            Self::Failed(_) => ScanState::Failed,
            Self::Cancelled => ScanState::Cancelled,
        }
    }
}

/// Handle to a running scan.
#[derive(Debug)]
pub struct ScanTask {
    id: ScanId,
    category: Category,
    events: mpsc::Receiver<ScanEvent>,
    token: CancellationToken,
    state: watch::Receiver<ScanState>,
    handle: JoinHandle<ScanOutcome>,
}

impl ScanTask {
    pub fn id(&self) -> ScanId {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn state(&self) -> ScanState {
        *self.state.borrow()
    }

    /// Stop the scan. No further requests are issued and no terminal event
    /// is sent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Next event, or `None` once the stream is closed.
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        self.events.recv().await
    }

    /// Discard any remaining events and wait for the outcome.
    pub async fn finish(self) -> ScanOutcome {
        let Self {
            mut events, handle, ..
        } = self;
        while events.recv().await.is_some() {}
        join_outcome(handle).await
    }

    /// Turn the task into an event stream that cancels the scan when dropped.
    pub fn into_stream(self) -> ScanEventStream {
        ScanEventStream {
            events: ReceiverStream::new(self.events),
            _guard: self.token.drop_guard(),
        }
    }
}

async fn join_outcome(handle: JoinHandle<ScanOutcome>) -> ScanOutcome {
    match handle.await {
        Ok(outcome) => outcome,
        Err(e) if e.is_cancelled() => ScanOutcome::Cancelled,
        Err(e) => ScanOutcome::Failed(format!("scan task panicked: {e}")),
    }
}

/// Event stream of a detached scan. Dropping it cancels the scan.
#[derive(Debug)]
pub struct ScanEventStream {
    events: ReceiverStream<ScanEvent>,
    _guard: DropGuard,
}

impl Stream for ScanEventStream {
    type Item = ScanEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().events).poll_next(cx)
    }
}

/// Start auditing `category` on a new task.
pub fn spawn_scan(category: Category, ctx: Arc<ScanContext>) -> ScanTask {
    let id = ScanId::new();
    let (tx, events) = mpsc::channel(EVENT_BUFFER);
    let (state_tx, state) = watch::channel(ScanState::Idle);
    let token = CancellationToken::new();

    let span = info_span!(
        "scan",
        id = %id.short(),
        %category,
        org = %ctx.organization
    );
    let handle = tokio::spawn(
        run_scan(category, ctx, EventEmitter::new(tx), token.clone(), state_tx).instrument(span),
    );

    ScanTask {
        id,
        category,
        events,
        token,
        state,
        handle,
    }
}

async fn run_scan(
    category: Category,
    ctx: Arc<ScanContext>,
    mut emitter: EventEmitter,
    token: CancellationToken,
    state: watch::Sender<ScanState>,
) -> ScanOutcome {
    state.send_replace(ScanState::Running);
    info!("scan started");
    let started = Instant::now();
    let scanner = scanner_for(category);

    let result = tokio::select! {
        biased;
        _ = token.cancelled() => None,
        result = scanner.scan(&ctx, &mut emitter) => Some(result),
    };

    let outcome = match result {
        None | Some(Err(ScanError::ChannelClosed)) => ScanOutcome::Cancelled,
        Some(_) if token.is_cancelled() => ScanOutcome::Cancelled,
        Some(Ok(summary)) => {
            let done = ScanEvent::Done {
                skipped: summary.skipped.clone(),
            };
            if deliver(emitter, done, &token).await {
                ScanOutcome::Completed(summary)
            } else {
                ScanOutcome::Cancelled
            }
        }
        Some(Err(e)) => {
            let detail = e.to_string();
            error!(error = %detail, "scan failed");
            deliver(
                emitter,
                ScanEvent::Error {
                    detail: detail.clone(),
                },
                &token,
            )
            .await;
            ScanOutcome::Failed(detail)
        }
    };

    info!(
        state = %outcome.state(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "scan finished"
    );
    state.send_replace(outcome.state());
    outcome
}

/// Send the terminal event unless the scan is cancelled first.
async fn deliver(emitter: EventEmitter, event: ScanEvent, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        sent = emitter.finish(event) => sent.is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finished_states() {
        assert!(!ScanState::Idle.is_finished());
        assert!(!ScanState::Running.is_finished());
        assert!(ScanState::Completed.is_finished());
        assert!(ScanState::Failed.is_finished());
        assert!(ScanState::Cancelled.is_finished());
    }

    #[test]
    fn test_outcome_state() {
        assert_eq!(ScanOutcome::Cancelled.state(), ScanState::Cancelled);
        assert_eq!(
            ScanOutcome::Failed("authentication failed".into()).state(),
            ScanState::Failed
        );
        assert_eq!(
            ScanOutcome::Completed(ScanSummary::default()).state(),
            ScanState::Completed
        );
    }
}
