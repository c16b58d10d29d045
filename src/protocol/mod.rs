//! Event stream protocol between the scan orchestrator and its consumers.
//!
//! A stream is an ordered sequence of [`ScanEvent`]s: one `start`, any number
//! of `progress` and `data` events, and at most one terminal `done` or
//! `error`, after which the channel closes. On the wire each event is a JSON
//! object tagged by `type`, framed as a Server-Sent Event.

mod sse;

pub use sse::{encode_frame, SseDecoder};

use crate::error::ProtocolError;
use crate::types::RecordBatch;
use serde::{Deserialize, Serialize};

/// One message of a category scan stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScanEvent {
    /// Expected unit count; precedes every other event.
    Start { total: u64 },
    /// A unit finished. `processed` never decreases within a stream.
    Progress { processed: u64, current: String },
    /// One record, or one per-parent batch of records.
    Data { data: RecordBatch },
    /// Terminal success. Lists units skipped after irrecoverable failures.
    Done {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        skipped: Vec<String>,
    },
    /// Terminal failure with a human-readable detail.
    Error { detail: String },
}

impl ScanEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Event type name as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Progress { .. } => "progress",
            Self::Data { .. } => "data",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Validate and decode one event payload.
    pub fn from_json(payload: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(payload).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessRecord, Permission};

    #[test]
    fn test_start_wire_shape() {
        let json = ScanEvent::Start { total: 3 }.to_json().unwrap();
        assert_eq!(json, r#"{"type":"start","total":3}"#);
    }

    #[test]
    fn test_done_omits_empty_skipped() {
        let json = ScanEvent::Done { skipped: vec![] }.to_json().unwrap();
        assert_eq!(json, r#"{"type":"done"}"#);
        assert_eq!(
            ScanEvent::from_json(r#"{"type":"done"}"#).unwrap(),
            ScanEvent::Done { skipped: vec![] }
        );
    }

    #[test]
    fn test_data_event_decodes_typed_batch() {
        let payload = r#"{"type":"data","data":{"category":"access","payload":[
            {"repository":"api","username":"octo","permission":"maintain"}]}}"#;
        let event = ScanEvent::from_json(payload).unwrap();
        assert_eq!(
            event,
            ScanEvent::Data {
                data: RecordBatch::Access(vec![AccessRecord {
                    repository: "api".into(),
                    username: "octo".into(),
                    permission: Permission::Maintain,
                }])
            }
        );
    }

    #[test]
    fn test_malformed_events_rejected() {
        assert!(ScanEvent::from_json("not json").is_err());
        assert!(ScanEvent::from_json(r#"{"type":"progress","processed":"one"}"#).is_err());
        assert!(ScanEvent::from_json(r#"{"type":"restart"}"#).is_err());
        assert!(ScanEvent::from_json(
            r#"{"type":"data","data":{"category":"access","payload":{"repository":"a"}}}"#
        )
        .is_err());
    }

    #[test]
    fn test_terminal_events() {
        assert!(ScanEvent::Done { skipped: vec![] }.is_terminal());
        assert!(ScanEvent::Error { detail: "x".into() }.is_terminal());
        assert!(!ScanEvent::Start { total: 1 }.is_terminal());
    }
}
