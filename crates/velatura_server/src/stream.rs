//! Turns Ollama's NDJSON byte stream into cleaned text chunks.

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tracing::{debug, warn};
use velatura_core::{MarkupFilter, UpstreamFragment};
use velatura_error::{GatewayError, GatewayErrorKind, GatewayResult};

/// Splits an arbitrary-granularity byte stream into newline-terminated lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Appends `chunk` and returns every line it completed, newline included.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|byte| *byte == b'\n') {
            lines.push(self.pending.drain(..=end).collect());
        }
        lines
    }

    /// Returns the unterminated remainder, if any.
    pub fn finish(self) -> Option<Vec<u8>> {
        (!self.pending.is_empty()).then_some(self.pending)
    }
}

/// Parses one NDJSON line, skipping blank and malformed lines.
pub fn parse_fragment(line: &[u8]) -> Option<UpstreamFragment> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_slice(line) {
        Ok(fragment) => Some(fragment),
        Err(e) => {
            debug!(error = %e, "Skipping malformed upstream line");
            None
        }
    }
}

/// Yields the cleaned response text carried by an Ollama NDJSON body.
///
/// Each fragment's text goes through a [`MarkupFilter`] owned by this
/// stream; non-empty output is yielded as soon as it is available. The
/// filter is finalized on the terminal fragment, or when the body ends
/// without one. A transport error ends the stream with that error.
pub fn cleaned_text<S, B, E>(body: S) -> impl Stream<Item = GatewayResult<String>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    try_stream! {
        futures::pin_mut!(body);
        let mut filter = MarkupFilter::default();
        let mut lines = LineBuffer::default();
        let mut finished = false;

        'read: while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                warn!(error = %e, "Upstream stream failed");
                GatewayError::new(GatewayErrorKind::Upstream(e.to_string()))
            })?;

            for line in lines.push(chunk.as_ref()) {
                let Some(fragment) = parse_fragment(&line) else {
                    continue;
                };
                if !fragment.response.is_empty() {
                    let cleaned = filter.step(&fragment.response);
                    if !cleaned.is_empty() {
                        yield cleaned;
                    }
                }
                if fragment.done {
                    finished = true;
                    break 'read;
                }
            }
        }

        if !finished {
            debug!("Upstream body ended without a terminal fragment");
            if let Some(fragment) = lines.finish().as_deref().and_then(parse_fragment) {
                let cleaned = filter.step(&fragment.response);
                if !cleaned.is_empty() {
                    yield cleaned;
                }
            }
        }

        let tail = filter.finalize();
        if !tail.is_empty() {
            yield tail;
        }
    }
}
