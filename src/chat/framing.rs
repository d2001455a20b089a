//! Delta framing for the streamed chat response
//!
//! Each completion delta travels as one length-prefixed frame:
//!
//! ```text
//! {len}:{payload},
//! ```
//!
//! where `len` is the payload byte length in ASCII decimal. The decoder
//! buffers raw bytes, so a frame may be split at any point by the
//! transport, including in the middle of a multi-byte UTF-8 sequence.
//! Reassembly is append-only: a decoded delta is never revised.

use thiserror::Error;

/// Longest accepted frame payload in bytes
const MAX_FRAME_LEN: usize = 1 << 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame length prefix is not a decimal number")]
    BadLength,

    #[error("frame length {0} exceeds maximum")]
    Oversized(usize),

    #[error("frame missing trailing delimiter")]
    MissingDelimiter,

    #[error("frame payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Encode one delta as a frame
pub fn encode(delta: &str) -> String {
    format!("{}:{},", delta.len(), delta)
}

/// Incremental frame decoder
///
/// Feed it transport chunks as they arrive; it emits every complete
/// frame payload and keeps the unfinished tail buffered.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the payloads of all frames it completes
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, FrameError> {
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        loop {
            let Some(colon) = self.buf.iter().position(|&b| b == b':') else {
                // No complete length prefix yet; anything non-numeric
                // buffered so far is already a protocol violation.
                if self.buf.iter().any(|b| !b.is_ascii_digit()) {
                    return Err(FrameError::BadLength);
                }
                break;
            };

            let len: usize = std::str::from_utf8(&self.buf[..colon])
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or(FrameError::BadLength)?;
            if len > MAX_FRAME_LEN {
                return Err(FrameError::Oversized(len));
            }

            // prefix + ':' + payload + ','
            let frame_end = colon + 1 + len + 1;
            if self.buf.len() < frame_end {
                break;
            }
            if self.buf[frame_end - 1] != b',' {
                return Err(FrameError::MissingDelimiter);
            }

            let payload = self.buf[colon + 1..frame_end - 1].to_vec();
            self.buf.drain(..frame_end);

            out.push(String::from_utf8(payload).map_err(|_| FrameError::InvalidUtf8)?);
        }

        Ok(out)
    }

    /// True when no partial frame is pending
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Decode a fully buffered response body into the reassembled text
pub fn reassemble(body: &[u8]) -> Result<String, FrameError> {
    let mut decoder = FrameDecoder::new();
    let deltas = decoder.push(body)?;
    if !decoder.is_empty() {
        return Err(FrameError::MissingDelimiter);
    }
    Ok(deltas.concat())
}
