use bytes::BytesMut;

use crate::io_struct::ChatChunk;

const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder for the upstream event stream. Transport chunks may
/// split event lines or multi-byte characters, so bytes are accumulated in
/// a carry-over buffer and only complete newline-terminated lines are
/// processed. Splitting raw bytes on '\n' is UTF-8 safe: a continuation
/// byte can never equal 0x0A, so a complete line always holds whole
/// characters.
#[derive(Debug, Default)]
pub struct DeltaDecoder {
    buf: BytesMut,
}

impl DeltaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk and return the text fragments completed by
    /// it, concatenated. An empty return means the chunk carried no
    /// complete delta (keep-alive noise, partial line, sentinel).
    pub fn feed(&mut self, chunk: &[u8]) -> String {
        self.buf.extend_from_slice(chunk);
        let mut out = String::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            if let Some(delta) = extract_delta(&line[..line.len() - 1]) {
                out.push_str(&delta);
            }
        }
        out
    }

    /// Bytes still waiting for a newline. An unterminated trailing line is
    /// dropped at end of stream, matching the upstream contract where the
    /// sentinel line is newline-terminated.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Best-effort parse of one complete line. Returns the text fragment if
/// the line is a data event carrying a non-empty delta; anything else
/// (blank lines, the [DONE] sentinel, non-UTF-8, non-JSON keep-alives,
/// chunks without a delta) yields None and never fails the stream.
fn extract_delta(raw: &[u8]) -> Option<String> {
    let line = std::str::from_utf8(raw).ok()?.trim();
    if line.is_empty() || line == "data: [DONE]" {
        return None;
    }
    let payload = line.strip_prefix("data:").map(str::trim).unwrap_or(line);
    if payload == DONE_SENTINEL {
        return None;
    }
    let chunk: ChatChunk = serde_json::from_str(payload).ok()?;
    chunk
        .choices
        .into_iter()
        .next()?
        .delta
        .content
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(decoder: &mut DeltaDecoder, chunks: &[&[u8]]) -> String {
        let mut out = String::new();
        for chunk in chunks {
            out.push_str(&decoder.feed(chunk));
        }
        out
    }

    #[test]
    fn whole_lines_in_one_chunk() {
        let mut decoder = DeltaDecoder::new();
        let stream = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\
data: [DONE]\n";
        assert_eq!(decoder.feed(stream), "Hello");
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn lines_split_mid_line_across_chunks() {
        let mut decoder = DeltaDecoder::new();
        let out = feed_all(
            &mut decoder,
            &[
                b"data: {\"choices\":[{\"del",
                b"ta\":{\"content\":\"Hel\"}}]}\ndata: {\"choi",
                b"ces\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
                b"data: [DONE]\n",
            ],
        );
        assert_eq!(out, "Hello");
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        // "é" is 0xC3 0xA9; split between the two bytes.
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"héllo\"}}]}\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut decoder = DeltaDecoder::new();
        let out = feed_all(&mut decoder, &[&line[..split], &line[split..]]);
        assert_eq!(out, "héllo");
    }

    #[test]
    fn byte_at_a_time_delivery() {
        let stream = "data: {\"choices\":[{\"delta\":{\"content\":\"día\"}}]}\ndata: [DONE]\n";
        let mut decoder = DeltaDecoder::new();
        let mut out = String::new();
        for byte in stream.as_bytes() {
            out.push_str(&decoder.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(out, "día");
    }

    #[test]
    fn malformed_line_between_valid_lines_is_skipped() {
        let mut decoder = DeltaDecoder::new();
        let out = feed_all(
            &mut decoder,
            &[
                b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
                b"data: this is not json\n",
                b": keep-alive\n",
                b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
            ],
        );
        assert_eq!(out, "ab");
    }

    #[test]
    fn sentinel_variants_are_skipped() {
        let mut decoder = DeltaDecoder::new();
        assert_eq!(decoder.feed(b"data: [DONE]\n"), "");
        assert_eq!(decoder.feed(b"data:[DONE]\n"), "");
    }

    #[test]
    fn blank_and_crlf_lines_are_skipped() {
        let mut decoder = DeltaDecoder::new();
        let out = feed_all(
            &mut decoder,
            &[
                b"\n\r\n",
                b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\r\n",
            ],
        );
        assert_eq!(out, "x");
    }

    #[test]
    fn empty_and_missing_deltas_yield_nothing() {
        let mut decoder = DeltaDecoder::new();
        let out = feed_all(
            &mut decoder,
            &[
                b"data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
                b"data: {\"choices\":[{\"delta\":{}}]}\n",
                b"data: {\"choices\":[]}\n",
                b"data: {}\n",
            ],
        );
        assert_eq!(out, "");
    }

    #[test]
    fn unprefixed_json_line_is_still_parsed() {
        let mut decoder = DeltaDecoder::new();
        let out = decoder.feed(b"{\"choices\":[{\"delta\":{\"content\":\"raw\"}}]}\n");
        assert_eq!(out, "raw");
    }

    #[test]
    fn incomplete_tail_is_never_emitted() {
        let mut decoder = DeltaDecoder::new();
        assert_eq!(
            decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}"),
            ""
        );
        assert!(decoder.pending() > 0);
        assert_eq!(decoder.feed(b"\n"), "x");
        assert_eq!(decoder.pending(), 0);
    }
}
