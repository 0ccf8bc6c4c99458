//! Line framer for the console's TCP streams.
//!
//! Turns an arbitrary chunking of the socket byte stream into discrete
//! CRLF-terminated lines. Decoding is permissive: invalid UTF-8 sequences
//! are replaced, never fatal, because operator consoles see whatever the
//! network throws at them. Empty lines are discarded inside the decoder,
//! so consumers only ever observe non-empty frames.
//!
//! The encoder strips embedded CR/LF from outbound lines before appending
//! the protocol terminator, so a hostile parameter cannot smuggle extra
//! commands onto the wire.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::WireError;

/// Default framing limit; generous next to the 512-byte IRC standard to
/// tolerate servers that tag on long trailing payloads.
const DEFAULT_MAX_LEN: usize = 4096;

/// Line-based codec handling CRLF-terminated messages.
pub struct LineCodec {
    /// Index of the next byte to check for a newline.
    next_index: usize,
    /// Maximum line length.
    max_len: usize,
}

impl LineCodec {
    /// Create a codec with the default framing limit.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_len: DEFAULT_MAX_LEN,
        }
    }

    /// Create a codec with a custom maximum line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, WireError> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                // No complete line yet; remember where the scan stopped.
                self.next_index = src.len();
                if src.len() > self.max_len {
                    return Err(WireError::LineTooLong {
                        actual: src.len(),
                        limit: self.max_len,
                    });
                }
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(WireError::LineTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\r', '\n']);
            if !text.is_empty() {
                return Ok(Some(text.to_owned()));
            }
            // Blank line: keep scanning this chunk.
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = WireError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), WireError> {
        dst.reserve(line.len() + 2);
        for b in line.bytes() {
            if b != b'\r' && b != b'\n' {
                dst.put_u8(b);
            }
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
