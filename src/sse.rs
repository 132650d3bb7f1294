// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

use futures::Stream;
use futures::StreamExt;

/// Splits a chunked HTTP body into server-sent-event `data:` payloads.
///
/// Lines are assembled from raw bytes so multi-byte characters that straddle
/// chunk boundaries survive intact. The `[DONE]` sentinel ends the stream.
pub(crate) struct SseStream<S> {
    stream: S,
    line_buffer: Vec<u8>,
    done: bool,
}

impl<S> SseStream<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self {
            stream,
            line_buffer: Vec::new(),
            done: false,
        }
    }
}

impl<S, B, E> SseStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    pub(crate) async fn next_event(&mut self) -> Option<Result<String, E>> {
        if self.done {
            return None;
        }
        loop {
            while let Some(newline_pos) = self.line_buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = self.line_buffer.drain(..=newline_pos).collect();
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end_matches(['\r', '\n']);

                let data = match line.strip_prefix("data:") {
                    Some(d) => d.strip_prefix(' ').unwrap_or(d),
                    None => continue,
                };

                if data.trim() == "[DONE]" {
                    self.done = true;
                    return None;
                }
                if data.is_empty() {
                    continue;
                }

                return Some(Ok(data.to_string()));
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => self.line_buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => return Some(Err(e)),
                None => return None,
            }
        }
    }
}
