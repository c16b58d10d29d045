//! Server-Sent Events framing.

use super::ScanEvent;
use crate::error::ProtocolError;

/// Frame an event as `data: <json>\n\n`.
pub fn encode_frame(event: &ScanEvent) -> Result<String, ProtocolError> {
    Ok(format!("data: {}\n\n", event.to_json()?))
}

/// Longest line, and longest frame payload, the decoder will buffer.
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Incremental decoder turning a byte stream into event payloads.
///
/// Chunks may split lines (or multi-byte characters) anywhere; bytes are
/// buffered until a full line is available. Lines end in LF, CRLF or a lone
/// CR. Comment lines (keep-alives) and fields other than `data` are ignored.
/// A line or frame longer than [`MAX_LINE_BYTES`] is reported once and
/// dropped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
    data_len: usize,
    /// The last line ended in CR; a leading LF belongs to it.
    skip_lf: bool,
    /// Dropping the rest of an overlong line.
    discarding: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the payloads of every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, ProtocolError>> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            if self.skip_lf {
                match self.buffer.first() {
                    None => break,
                    Some(b'\n') => {
                        self.buffer.remove(0);
                    }
                    Some(_) => {}
                }
                self.skip_lf = false;
            }

            let Some(pos) = self.buffer.iter().position(|&b| b == b'\n' || b == b'\r') else {
                if self.buffer.len() > MAX_LINE_BYTES {
                    self.buffer.clear();
                    if !self.discarding {
                        self.discarding = true;
                        self.reset_frame();
                        frames.push(Err(overlong()));
                    }
                }
                break;
            };

            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.skip_lf = line.pop() == Some(b'\r');

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if line.len() > MAX_LINE_BYTES {
                self.reset_frame();
                frames.push(Err(overlong()));
                continue;
            }
            if let Some(frame) = self.take_line(&String::from_utf8_lossy(&line)) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Feed a chunk and decode every completed frame.
    pub fn push_events(&mut self, chunk: &[u8]) -> Vec<Result<ScanEvent, ProtocolError>> {
        self.push(chunk)
            .into_iter()
            .map(|frame| frame.and_then(|payload| ScanEvent::from_json(&payload)))
            .collect()
    }

    fn take_line(&mut self, line: &str) -> Option<Result<String, ProtocolError>> {
        if line.is_empty() {
            if self.data_lines.is_empty() {
                return None;
            }
            let payload = self.data_lines.join("\n");
            self.reset_frame();
            return Some(Ok(payload));
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field != "data" {
            return None;
        }
        self.data_len += value.len() + 1;
        if self.data_len > MAX_LINE_BYTES {
            self.reset_frame();
            return Some(Err(overlong()));
        }
        self.data_lines.push(value.to_string());
        None
    }

    fn reset_frame(&mut self) {
        self.data_lines.clear();
        self.data_len = 0;
    }
}

fn overlong() -> ProtocolError {
    ProtocolError::Malformed(format!("frame exceeds {MAX_LINE_BYTES} bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame() {
        let frame = encode_frame(&ScanEvent::Start { total: 2 }).unwrap();
        assert_eq!(frame, "data: {\"type\":\"start\",\"total\":2}\n\n");
    }

    #[test]
    fn test_decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"sta").is_empty());
        assert!(decoder.push(b"rt\",\"total\":2}\n").is_empty());
        let frames: Vec<String> = decoder
            .push(b"\ndata: {\"type\":\"done\"}\n\n")
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(
            frames,
            vec![
                r#"{"type":"start","total":2}"#.to_string(),
                r#"{"type":"done"}"#.to_string()
            ]
        );
    }

    #[test]
    fn test_decoder_ignores_comments_and_crlf() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push_events(b": keep-alive\r\n\r\nevent: message\r\ndata: {\"type\":\"done\"}\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &ScanEvent::Done { skipped: vec![] }
        );
    }

    #[test]
    fn test_decoder_surfaces_malformed_frames() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push_events(b"data: {\"type\":\"bogus\"}\n\n");
        assert!(matches!(events[0], Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_decoder_keeps_multibyte_split() {
        let frame = "data: {\"type\":\"error\",\"detail\":\"caf\u{e9}\"}\n\n".as_bytes();
        let split = frame.iter().position(|&b| b == 0xc3).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.push_events(&frame[..split]).is_empty());
        let events = decoder.push_events(&frame[split..]);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &ScanEvent::Error {
                detail: "caf\u{e9}".into()
            }
        );
    }

    #[test]
    fn test_decoder_accepts_lone_cr() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push_events(b": ping\rdata: {\"type\":\"start\",\"total\":1}\r\r");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap(), &ScanEvent::Start { total: 1 });
    }

    #[test]
    fn test_decoder_crlf_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"done\"}\r").is_empty());
        assert_eq!(decoder.push(b"\n\r").len(), 1);
        // The LF after the final CR must not open an empty line of its own.
        assert!(decoder.push(b"\ndata: x\n").is_empty());
        assert_eq!(decoder.data_lines, vec!["x".to_string()]);
    }

    #[test]
    fn test_decoder_drops_overlong_line() {
        let mut decoder = SseDecoder::new();
        let mut line = b"data: ".to_vec();
        line.resize(MAX_LINE_BYTES + 16, b'a');

        let frames = decoder.push(&line);
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], Err(ProtocolError::Malformed(_))));
        assert!(decoder.buffer.is_empty());

        assert!(decoder.push(b"aaaa\n\n").is_empty());
        let events = decoder.push_events(b"data: {\"type\":\"done\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &ScanEvent::Done { skipped: vec![] }
        );
    }
}
