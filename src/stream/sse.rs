//! `data:` frame decoding for server-sent event streams.

use memchr::memchr;

/// Prefix that marks a payload-bearing line.
pub const DATA_PREFIX: &str = "data:";
/// Payload that terminates the stream.
pub const DONE_MARKER: &str = "[DONE]";

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// JSON-bearing payload, prefix stripped and trimmed. Not yet parsed.
    Data(String),
    /// The terminal done-marker.
    Done,
}

/// Splits raw bytes into [`EventPayload`]s, carrying partial lines across chunks.
///
/// Bytes are buffered undecoded so multi-byte characters split by a chunk
/// boundary survive intact.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every payload completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<EventPayload> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        let mut start = 0;
        while let Some(offset) = memchr(b'\n', &self.buffer[start..]) {
            let end = start + offset;
            if let Some(payload) = decode_line(&self.buffer[start..end]) {
                payloads.push(payload);
            }
            start = end + 1;
        }
        self.buffer.drain(..start);
        payloads
    }

    /// Decode whatever unterminated line remains at end of input.
    pub fn finish(&mut self) -> Option<EventPayload> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    /// Bytes held back waiting for a line terminator.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(raw: &[u8]) -> Option<EventPayload> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_start();
    let data = line.strip_prefix(DATA_PREFIX)?.trim();
    if data == DONE_MARKER {
        return Some(EventPayload::Done);
    }
    if data.is_empty() {
        return None;
    }
    Some(EventPayload::Data(data.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = concat!(
        ": keep-alive\n",
        "data: {\"a\":1}\n\n",
        "event: ping\n",
        "data:{\"b\":\"héllo\"}\r\n",
        "data: [DONE]\n",
    );

    fn expected() -> Vec<EventPayload> {
        vec![
            EventPayload::Data("{\"a\":1}".into()),
            EventPayload::Data("{\"b\":\"héllo\"}".into()),
            EventPayload::Done,
        ]
    }

    #[test]
    fn decodes_single_chunk() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push(STREAM.as_bytes()), expected());
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn any_split_point_yields_same_payloads() {
        let bytes = STREAM.as_bytes();
        for split in 0..=bytes.len() {
            let mut decoder = FrameDecoder::new();
            let mut payloads = decoder.push(&bytes[..split]);
            payloads.extend(decoder.push(&bytes[split..]));
            assert_eq!(payloads, expected(), "split at {split}");
        }
    }

    #[test]
    fn byte_at_a_time_yields_same_payloads() {
        let mut decoder = FrameDecoder::new();
        let payloads: Vec<_> = STREAM
            .as_bytes()
            .iter()
            .flat_map(|b| decoder.push(std::slice::from_ref(b)))
            .collect();
        assert_eq!(payloads, expected());
    }

    #[test]
    fn unterminated_tail_is_carried_then_flushed() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"x\":").is_empty());
        assert!(decoder.pending() > 0);
        assert!(decoder.push(b"2}").is_empty());
        assert_eq!(decoder.finish(), Some(EventPayload::Data("{\"x\":2}".into())));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"id: 7\nretry: 100\n: comment\n\n").is_empty());
    }
}
