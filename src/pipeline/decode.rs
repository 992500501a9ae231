//! Streaming decoders (Bytes -> JSON Value)

use crate::pipeline::Decoder;
use crate::{BoxStream, PipeResult};
use bytes::Bytes;
use futures::{stream, StreamExt};
use serde_json::Value;

/// A minimal SSE decoder:
/// - splits raw bytes by delimiter (default "\n\n"; CRLF is normalised first)
/// - strips `prefix` (default "data: ") and joins multi-line `data:` fields
/// - ignores `:` comment lines and `event:`/`id:`/`retry:` fields
/// - stops on `done_signal` (default "[DONE]")
pub struct SseDecoder {
    delimiter: String,
    prefix: String,
    done_signal: String,
}

impl SseDecoder {
    pub fn new(
        delimiter: Option<String>,
        prefix: Option<String>,
        done_signal: Option<String>,
    ) -> Self {
        Self {
            delimiter: delimiter.unwrap_or_else(|| "\n\n".to_string()),
            prefix: prefix.unwrap_or_else(|| "data: ".to_string()),
            done_signal: done_signal.unwrap_or_else(|| "[DONE]".to_string()),
        }
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

/// Extract the payload of one SSE frame. `None` for frames with nothing to decode.
fn frame_payload(frame: &str, prefix: &str) -> Option<String> {
    let mut data_lines = Vec::new();

    for line in frame.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix(prefix) {
            data_lines.push(rest);
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim_start());
        } else if line.starts_with("event:") || line.starts_with("id:") || line.starts_with("retry:")
        {
            continue;
        } else {
            // Bare JSON lines without a field name.
            data_lines.push(line);
        }
    }

    if data_lines.is_empty() {
        return None;
    }
    Some(data_lines.join("\n"))
}

/// Byte offset of the first occurrence of `needle` in `haystack`.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Drop every `\r` directly followed by `\n`. A trailing `\r` is kept until
/// the next chunk shows what follows it.
fn normalize_crlf(buf: &mut Vec<u8>) {
    if find_bytes(buf, b"\r\n").is_none() {
        return;
    }
    let mut out = Vec::with_capacity(buf.len());
    let mut iter = buf.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    *buf = out;
}

#[async_trait::async_trait]
impl Decoder for SseDecoder {
    async fn decode_stream(
        &self,
        input: BoxStream<'static, Bytes>,
    ) -> PipeResult<BoxStream<'static, Value>> {
        let delimiter = self.delimiter.clone();
        let prefix = self.prefix.clone();
        let done_signal = self.done_signal.clone();

        // Buffer raw bytes and only decode complete frames, so multi-byte
        // characters split across chunks survive.
        let stream = stream::unfold(
            (input, Vec::<u8>::new(), false),
            move |(mut input, mut buf, finished)| {
                let delimiter = delimiter.clone();
                let prefix = prefix.clone();
                let done_signal = done_signal.clone();
                async move {
                    if finished {
                        return None;
                    }

                    // Returns Some(Some(v)) for a value, Some(None) for done, None to skip.
                    let handle_frame = |frame: &[u8]| -> Option<Option<Value>> {
                        let text = String::from_utf8_lossy(frame);
                        let payload = frame_payload(&text, &prefix)?;
                        let payload = payload.trim();
                        if payload == done_signal {
                            return Some(None);
                        }
                        match serde_json::from_str::<Value>(payload) {
                            Ok(v) => Some(Some(v)),
                            Err(e) => {
                                tracing::warn!(error = %e, "skipping non-json sse frame");
                                None
                            }
                        }
                    };

                    loop {
                        if let Some(idx) = find_bytes(&buf, delimiter.as_bytes()) {
                            let frame: Vec<u8> = buf.drain(..idx + delimiter.len()).collect();

                            match handle_frame(&frame[..idx]) {
                                Some(Some(v)) => return Some((Ok(v), (input, buf, false))),
                                Some(None) => return None,
                                None => continue,
                            }
                        }

                        // Need more data.
                        match input.next().await {
                            Some(Ok(bytes)) => {
                                buf.extend_from_slice(&bytes);
                                normalize_crlf(&mut buf);
                                continue;
                            }
                            Some(Err(e)) => {
                                return Some((Err(e), (input, buf, true)));
                            }
                            None => {
                                // EOF: try the remaining buffer once
                                let rest = std::mem::take(&mut buf);
                                return match handle_frame(&rest) {
                                    Some(Some(v)) => Some((Ok(v), (input, buf, true))),
                                    _ => None,
                                };
                            }
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }
}
