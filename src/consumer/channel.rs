//! Event channels: how a consumer obtains a category's event stream.

use crate::budget::BudgetRegistry;
use crate::config::{AppSettings, Credentials};
use crate::error::ChannelError;
use crate::orchestrator::spawn_scan;
use crate::protocol::{ScanEvent, SseDecoder};
use crate::scanner::ScanContext;
use crate::types::Category;
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::ACCEPT;
use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// Events as the consumer sees them. The stream ending without a terminal
/// event means the connection was lost.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ScanEvent, ChannelError>> + Send>>;

/// Source of category event streams.
///
/// Dropping the returned stream closes the channel and cancels the scan
/// behind it.
#[async_trait]
pub trait EventChannel: Send + Sync {
    async fn open(
        &self,
        category: Category,
        credentials: &Credentials,
    ) -> Result<EventStream, ChannelError>;
}

/// Runs scans in this process.
#[derive(Debug, Clone)]
pub struct LocalChannel {
    settings: AppSettings,
    budgets: Arc<BudgetRegistry>,
}

impl LocalChannel {
    pub fn new(settings: AppSettings) -> Self {
        let budgets = Arc::new(BudgetRegistry::new(&settings));
        Self { settings, budgets }
    }
}

#[async_trait]
impl EventChannel for LocalChannel {
    async fn open(
        &self,
        category: Category,
        credentials: &Credentials,
    ) -> Result<EventStream, ChannelError> {
        let budget = self.budgets.for_token(&credentials.token);
        let ctx = ScanContext::connect(credentials, &self.settings, budget)
            .map_err(|e| ChannelError::Open(e.to_string()))?;
        let task = spawn_scan(category, Arc::new(ctx));
        debug!(%category, id = %task.id().short(), "local channel opened");
        Ok(Box::pin(task.into_stream().map(Ok)))
    }
}

/// Reads scans from an `orgscan serve` endpoint over Server-Sent Events.
#[derive(Debug, Clone)]
pub struct SseChannel {
    http: reqwest::Client,
    base_url: String,
}

impl SseChannel {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ChannelError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ChannelError::Open(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EventChannel for SseChannel {
    async fn open(
        &self,
        category: Category,
        credentials: &Credentials,
    ) -> Result<EventStream, ChannelError> {
        let url = format!("{}/api/audit/{}/stream", self.base_url, category);
        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .query(&[
                ("gh_org", credentials.organization.as_str()),
                ("gh_token", credentials.token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ChannelError::Open(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Open(format!("server returned {status}: {body}")));
        }

        debug!(%category, "sse channel opened");
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| e.without_url().to_string()));
        Ok(Box::pin(decode_events(bytes)))
    }
}

/// Decode a raw SSE byte stream into events.
///
/// A transport error is passed through and ends nothing by itself; the
/// consumer treats it as a lost connection.
pub fn decode_events<S, B, E>(bytes: S) -> impl Stream<Item = Result<ScanEvent, ChannelError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    bytes
        .scan(SseDecoder::new(), |decoder, chunk| {
            let items: Vec<Result<ScanEvent, ChannelError>> = match chunk {
                Ok(chunk) => decoder
                    .push_events(chunk.as_ref())
                    .into_iter()
                    .map(|event| event.map_err(ChannelError::from))
                    .collect(),
                Err(e) => vec![Err(ChannelError::Transport(e.to_string()))],
            };
            futures::future::ready(Some(stream::iter(items)))
        })
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<&'static [u8], String>> {
        let parts: Vec<Result<&'static [u8], String>> =
            parts.iter().map(|p| Ok(p.as_bytes())).collect();
        stream::iter(parts)
    }

    #[tokio::test]
    async fn test_decode_split_frames() {
        let events: Vec<_> = decode_events(chunks(&[
            "data: {\"type\":\"start\",\"to",
            "tal\":2}\n\n: keep-alive\n\ndata: {\"type\":\"done\"}\n\n",
        ]))
        .collect()
        .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Ok(ScanEvent::Start { total: 2 })));
        assert!(matches!(&events[1], Ok(ScanEvent::Done { skipped }) if skipped.is_empty()));
    }

    #[tokio::test]
    async fn test_malformed_frame_is_reported() {
        let events: Vec<_> = decode_events(chunks(&[
            "data: {\"type\":\"bogus\"}\n\n",
            "data: {\"type\":\"start\",\"total\":1}\n\n",
        ]))
        .collect()
        .await;

        assert!(matches!(events[0], Err(ChannelError::Protocol(_))));
        assert!(matches!(events[1], Ok(ScanEvent::Start { total: 1 })));
    }

    #[tokio::test]
    async fn test_transport_error_passed_through() {
        let parts: Vec<Result<&'static [u8], String>> = vec![
            Ok(&b"data: {\"type\":\"start\",\"total\":5}\n\n"[..]),
            Err("connection reset".to_string()),
        ];
        let events: Vec<_> = decode_events(stream::iter(parts)).collect().await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Err(ChannelError::Transport(_))));
    }
}
