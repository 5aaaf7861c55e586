//! Inbound stream assembly.
//!
//! A transport read may return part of a message, exactly one, or
//! several back to back. The assembler buffers bytes and yields one
//! outcome per complete message:
//!
//! ```text
//!   push(bytes) ──▶ [ buffer ] ──▶ next(codec)
//!                                   ├─ Command   (decoded, bytes drained)
//!                                   ├─ Dropped   (malformed / unknown)
//!                                   └─ None      (need more bytes)
//! ```
//!
//! Garbage in front of a start marker is discarded. A malformed message
//! is skipped whole when its framing can be read, otherwise only its
//! marker byte is dropped and the scan resyncs on the next one.

use log::warn;

use crate::error::WireError;

use super::wire::{Decoded, START_MARKER, WireCodec};

/// Default buffer cap.
pub const MAX_INBOUND_BYTES: usize = 4096;

/// Outcome for one message pulled off the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Command(Decoded),
    /// The message was discarded. Never `Incomplete`.
    Dropped(WireError),
}

/// Streaming message assembler.
#[derive(Debug)]
pub struct InboundAssembler {
    buf: Vec<u8>,
    max_bytes: usize,
}

impl InboundAssembler {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_bytes.min(MAX_INBOUND_BYTES)),
            max_bytes,
        }
    }

    /// Append transport bytes. Returns how many buffered bytes were
    /// discarded to stay under the cap.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let mut discarded = 0;
        if self.buf.len() + data.len() > self.max_bytes {
            // Whatever is buffered can no longer complete within the cap.
            discarded = self.buf.len();
            self.buf.clear();
            warn!("inbound: buffer cap {} exceeded, {discarded} bytes discarded", self.max_bytes);
        }
        let keep = data.len().min(self.max_bytes);
        let skip = data.len() - keep;
        self.buf.extend_from_slice(&data[skip..]);
        discarded + skip
    }

    /// Pull the next complete message, if any.
    pub fn next(&mut self, codec: &WireCodec) -> Option<Inbound> {
        match self.buf.iter().position(|&b| b == START_MARKER) {
            None => {
                self.buf.clear();
                return None;
            }
            Some(0) => {}
            Some(skip) => {
                self.buf.drain(..skip);
            }
        }

        match codec.decode(&self.buf) {
            Ok(decoded) => {
                self.buf.drain(..decoded.consumed);
                Some(Inbound::Command(decoded))
            }
            Err(WireError::Incomplete) => None,
            Err(e @ WireError::UnknownMessageType { consumed, .. }) => {
                self.buf.drain(..consumed);
                Some(Inbound::Dropped(e))
            }
            Err(e @ WireError::Malformed(_)) => {
                // Skip the whole message when its framing is intact,
                // otherwise just the marker.
                let skip = codec.frame_len(&self.buf).unwrap_or(1);
                self.buf.drain(..skip);
                Some(Inbound::Dropped(e))
            }
        }
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for InboundAssembler {
    fn default() -> Self {
        Self::new(MAX_INBOUND_BYTES)
    }
}
