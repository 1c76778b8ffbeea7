//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! Streaming is a two-layer parse.  [`FrameCodec`] splits the HTTP body into frames on the
//! blank-line delimiter, and [`decode_frame`] interprets one frame's `data:` payload as either
//! a text delta, the `[DONE]` sentinel, or an error.

use std::io;

use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, TryStreamExt};
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::io::StreamReader;

use crate::error::{DecodeErrorKind, Error, Result};
use crate::observability::STREAM_BYTES;
use crate::wire::{ChunkBody, ChunkChoice, from_json, single_choice};

/// Separator between SSE frames.
pub const FRAME_DELIMITER: &[u8] = b"\n\n";

/// Payload of the frame that ends a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

const DATA_PREFIX: &str = "data:";

/// The outcome of successfully decoding one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedDelta {
    /// A fragment of generated text.  Empty when the frame only marked a normal stop.
    Text(String),
    /// The `[DONE]` sentinel; nothing after it is read.
    StreamEnd,
}

/// Splits a byte stream into SSE frames.
///
/// A frame is everything between two `\n\n` delimiters, excluding the delimiter.  At end of
/// input any non-empty residual is emitted as a final frame so that a truncated tail reaches
/// the decoder instead of vanishing.
#[derive(Debug, Default)]
pub struct FrameCodec {
    // Bytes of the buffer already searched without finding a delimiter.
    scanned: usize,
}

impl FrameCodec {
    /// Create a codec with an empty scan position.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Bytes>> {
        // A delimiter may straddle the previous scan boundary.
        let start = self
            .scanned
            .saturating_sub(FRAME_DELIMITER.len() - 1)
            .min(src.len());
        match find_delimiter(&src[start..]) {
            Some(offset) => {
                let frame = src.split_to(start + offset).freeze();
                src.advance(FRAME_DELIMITER.len());
                self.scanned = 0;
                Ok(Some(frame))
            }
            None => {
                self.scanned = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<Bytes>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        self.scanned = 0;
        if src.is_empty() {
            Ok(None)
        } else {
            Ok(Some(src.split().freeze()))
        }
    }
}

fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(FRAME_DELIMITER.len())
        .position(|window| window == FRAME_DELIMITER)
}

/// Turn an HTTP body into a stream of raw frames.
///
/// Read failures from the body surface as [`Error::Streaming`].
pub fn frames<S, E>(byte_stream: S) -> impl Stream<Item = Result<Bytes>> + Send + Unpin
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let byte_stream = byte_stream
        .inspect_ok(|chunk| STREAM_BYTES.count(chunk.len() as u64))
        .map_err(io::Error::other);
    FramedRead::new(StreamReader::new(byte_stream), FrameCodec::new()).map_err(|err| {
        Error::streaming(format!("error in HTTP stream: {err}"), Some(Box::new(err)))
    })
}

/// Decode one frame.
///
/// The frame must start with `data:`.  A payload of `[DONE]` ends the stream; anything else
/// must be a chat-completion chunk with exactly one choice.
pub fn decode_frame(frame: &[u8]) -> Result<DecodedDelta> {
    let frame = std::str::from_utf8(frame)?;
    let Some(data) = frame.strip_prefix(DATA_PREFIX) else {
        return Err(Error::framing(format!(
            "invalid event framing: {:?}",
            preview(frame)
        )));
    };
    let data = data.trim();
    if data == DONE_SENTINEL {
        return Ok(DecodedDelta::StreamEnd);
    }
    decode_chunk(data)
}

fn decode_chunk(data: &str) -> Result<DecodedDelta> {
    let body: ChunkBody = from_json(data, DecodeErrorKind::MalformedDelta, "stream chunk")?;
    if let Some(error) = body.error {
        return Err(error.into_error(None, None));
    }
    let choice = single_choice(body.choices)?;
    let choice: ChunkChoice =
        from_json(choice.get(), DecodeErrorKind::MalformedDelta, "stream choice")?;
    match (choice.delta.content, choice.finish_reason.as_deref()) {
        (Some(content), _) => Ok(DecodedDelta::Text(content)),
        (None, Some("stop")) => Ok(DecodedDelta::Text(String::new())),
        (None, _) => Err(Error::decode(
            DecodeErrorKind::NoContent,
            "invalid response, no content",
        )),
    }
}

fn preview(frame: &str) -> String {
    const LIMIT: usize = 80;
    if frame.chars().count() <= LIMIT {
        frame.to_string()
    } else {
        let mut preview: String = frame.chars().take(LIMIT).collect();
        preview.push('…');
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, stream};

    const BODY: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"lo \\u00e9\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n\
data: [DONE]\n\n";

    fn split_all(chunks: &[&[u8]]) -> Vec<Bytes> {
        let mut codec = FrameCodec::new();
        let mut buffer = BytesMut::new();
        let mut out = Vec::new();
        for chunk in chunks {
            buffer.extend_from_slice(chunk);
            while let Some(frame) = codec.decode(&mut buffer).unwrap() {
                out.push(frame);
            }
        }
        while let Some(frame) = codec.decode_eof(&mut buffer).unwrap() {
            out.push(frame);
        }
        out
    }

    #[test]
    fn splits_on_blank_lines() {
        let frames = split_all(&[b"data: a\n\ndata: b\n\n"]);
        assert_eq!(frames, vec![Bytes::from("data: a"), Bytes::from("data: b")]);
    }

    #[test]
    fn chunk_boundaries_do_not_change_frames() {
        let whole = split_all(&[BODY]);
        assert_eq!(whole.len(), 4);
        for size in 1..=BODY.len() {
            let chunks: Vec<&[u8]> = BODY.chunks(size).collect();
            assert_eq!(split_all(&chunks), whole, "chunk size {size}");
        }
    }

    #[test]
    fn delimiter_split_across_reads() {
        let frames = split_all(&[b"data: a\n", b"\ndata: b\n", b"\n"]);
        assert_eq!(frames, vec![Bytes::from("data: a"), Bytes::from("data: b")]);
    }

    #[test]
    fn frames_never_contain_the_delimiter() {
        for frame in split_all(&[b"a\n\n\n\nb\n\nc"]) {
            assert!(find_delimiter(&frame).is_none());
        }
    }

    #[test]
    fn unterminated_tail_is_emitted() {
        let frames = split_all(&[b"data: a\n\ndata: {\"choi"]);
        assert_eq!(
            frames,
            vec![Bytes::from("data: a"), Bytes::from("data: {\"choi")]
        );
        assert!(split_all(&[b"data: a\n\n"]).len() == 1);
        assert!(split_all(&[]).is_empty());
    }

    #[test]
    fn decode_text_delta() {
        let delta = decode_frame(br#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(delta, DecodedDelta::Text("Hi".to_string()));
    }

    #[test]
    fn decode_done_sentinel() {
        assert_eq!(decode_frame(b"data: [DONE]").unwrap(), DecodedDelta::StreamEnd);
        assert_eq!(decode_frame(b"data:[DONE]  \r\n").unwrap(), DecodedDelta::StreamEnd);
    }

    #[test]
    fn decode_stop_without_content_is_empty_text() {
        let delta =
            decode_frame(br#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(delta, DecodedDelta::Text(String::new()));
    }

    #[test]
    fn decode_missing_prefix_is_framing_error() {
        let err = decode_frame(b"event: ping").unwrap_err();
        assert!(err.is_framing());
        assert!(err.to_string().contains("invalid event framing"));
    }

    #[test]
    fn decode_errors_are_specific() {
        let kind = |frame: &[u8]| decode_frame(frame).unwrap_err().decode_kind();
        assert_eq!(kind(b"data: {not json"), Some(DecodeErrorKind::InvalidJson));
        assert_eq!(kind(b"data: {}"), Some(DecodeErrorKind::NoChoices));
        assert_eq!(
            kind(br#"data: {"choices":[{"delta":{}},{"delta":{}}]}"#),
            Some(DecodeErrorKind::WrongChoiceCount(2))
        );
        assert_eq!(
            kind(br#"data: {"choices":[{"text":"x"}]}"#),
            Some(DecodeErrorKind::MalformedDelta)
        );
        assert_eq!(
            kind(br#"data: {"choices":["x"]}"#),
            Some(DecodeErrorKind::MalformedDelta)
        );
        assert_eq!(
            kind(br#"data: {"choices":[{"delta":{},"finish_reason":"length"}]}"#),
            Some(DecodeErrorKind::NoContent)
        );
    }

    #[test]
    fn decode_embedded_api_error() {
        let err = decode_frame(br#"data: {"error":{"code":"overloaded","message":"busy"}}"#)
            .unwrap_err();
        assert_eq!(err.code(), Some("overloaded"));
        assert!(err.is_transport());
    }

    #[test]
    fn decode_invalid_utf8() {
        let err = decode_frame(b"data: \xff\xfe").unwrap_err();
        assert!(matches!(err, Error::Encoding { .. }));
    }

    #[tokio::test]
    async fn frames_over_a_byte_stream() {
        let chunks: Vec<std::result::Result<Bytes, io::Error>> = BODY
            .chunks(7)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        let decoded: Vec<DecodedDelta> = frames(stream::iter(chunks))
            .map(|frame| decode_frame(&frame.unwrap()).unwrap())
            .collect()
            .await;
        assert_eq!(
            decoded,
            vec![
                DecodedDelta::Text("Hel".to_string()),
                DecodedDelta::Text("lo é".to_string()),
                DecodedDelta::Text(String::new()),
                DecodedDelta::StreamEnd,
            ]
        );
    }

    #[tokio::test]
    async fn read_failures_become_streaming_errors() {
        let chunks: Vec<std::result::Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"data: [DONE]")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let mut frames = frames(stream::iter(chunks));
        let err = frames.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Streaming { .. }));
    }
}
