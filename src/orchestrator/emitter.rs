//! Ordered event emission for one scan.

use crate::error::{ScanError, ScanResult};
use crate::protocol::ScanEvent;
use crate::types::RecordBatch;
use tokio::sync::mpsc;

/// Sending half of a scan's event stream.
///
/// Enforces the stream ordering: one `start` before any `progress` or
/// `data`, and `processed` counting up to the announced total. A send to a
/// dropped receiver fails with [`ScanError::ChannelClosed`], which stops the
/// scan.
#[derive(Debug)]
pub struct EventEmitter {
    tx: mpsc::Sender<ScanEvent>,
    total: Option<u64>,
    processed: u64,
}

impl EventEmitter {
    pub fn new(tx: mpsc::Sender<ScanEvent>) -> Self {
        Self {
            tx,
            total: None,
            processed: 0,
        }
    }

    /// Announce the number of units.
    pub async fn start(&mut self, total: u64) -> ScanResult<()> {
        if self.total.is_some() {
            return Err(ScanError::Protocol("scan already started".into()));
        }
        self.total = Some(total);
        self.send(ScanEvent::Start { total }).await
    }

    /// Mark one more unit as finished.
    pub async fn progress(&mut self, current: &str) -> ScanResult<()> {
        let total = self.started()?;
        if self.processed >= total {
            return Err(ScanError::Protocol(format!(
                "progress past announced total of {total}"
            )));
        }
        self.processed += 1;
        self.send(ScanEvent::Progress {
            processed: self.processed,
            current: current.to_string(),
        })
        .await
    }

    pub async fn data(&mut self, batch: RecordBatch) -> ScanResult<()> {
        self.started()?;
        self.send(ScanEvent::Data { data: batch }).await
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Send the terminal event, closing the stream.
    pub(crate) async fn finish(self, event: ScanEvent) -> ScanResult<()> {
        debug_assert!(event.is_terminal());
        self.send(event).await
    }

    fn started(&self) -> ScanResult<u64> {
        self.total
            .ok_or_else(|| ScanError::Protocol("event before start".into()))
    }

    async fn send(&self, event: ScanEvent) -> ScanResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| ScanError::ChannelClosed)
    }
}
