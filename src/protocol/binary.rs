//! Length-prefixed binary payload codec.
//!
//! Wire format:
//! ```text
//! ┌────────────┬────────────┬──────────────────────────┐
//! │ Type (2B)  │ Length (2B)│ Fields (N B)             │
//! │ ASCII      │ BE u16     │ schema owned per type    │
//! └────────────┴────────────┴──────────────────────────┘
//! ```
//!
//! This module only knows about the length prefix and a handful of
//! big-endian primitives. Which fields a message carries is decided by
//! the per-type functions in [`super::catalog`].

use crate::error::{EncodeError, MalformedReason, WireError};

use super::MessageTypeCode;

/// Size of the big-endian payload length.
pub const LENGTH_PREFIX: usize = 2;

/// Largest payload the 16-bit prefix can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Split a length-prefixed payload off the front of `bytes`.
///
/// Returns the payload slice and the total bytes consumed (prefix included).
pub fn read_payload(bytes: &[u8]) -> Result<(&[u8], usize), WireError> {
    let Some(prefix) = bytes.get(..LENGTH_PREFIX) else {
        return Err(WireError::Incomplete);
    };
    let len = u16::from_be_bytes([prefix[0], prefix[1]]) as usize;
    let end = LENGTH_PREFIX + len;
    match bytes.get(LENGTH_PREFIX..end) {
        Some(payload) => Ok((payload, end)),
        None => Err(WireError::Incomplete),
    }
}

/// Parse `TYPE(2) | LEN(2) | payload` into its type code and payload.
pub fn parse(bytes: &[u8]) -> Result<(MessageTypeCode, &[u8], usize), WireError> {
    let [a, b] = match bytes.get(..2) {
        Some(&[a, b]) => [a, b],
        _ => return Err(WireError::Incomplete),
    };
    let code = MessageTypeCode::from_bytes(a, b).ok_or(MalformedReason::BadTypeCode)?;
    let (payload, used) = read_payload(&bytes[2..])?;
    Ok((code, payload, used + 2))
}

/// Mirror of [`parse`]: type code, length prefix, payload.
pub fn write(out: &mut Vec<u8>, code: MessageTypeCode, payload: &[u8]) -> Result<(), EncodeError> {
    out.extend_from_slice(&code.as_bytes());
    write_payload(out, payload)
}

/// Append a length-prefixed payload.
pub fn write_payload(out: &mut Vec<u8>, payload: &[u8]) -> Result<(), EncodeError> {
    let len = u16::try_from(payload.len()).map_err(|_| EncodeError::PayloadTooLarge(payload.len()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

// ── Field primitives ─────────────────────────────────────────

/// Big-endian field writer for a single payload.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// UTF-8 string with a u16 length.
    pub fn str(&mut self, field: &'static str, v: &str) -> Result<&mut Self, EncodeError> {
        let len = u16::try_from(v.len()).map_err(|_| EncodeError::FieldOverflow(field))?;
        self.u16(len);
        self.buf.extend_from_slice(v.as_bytes());
        Ok(self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over one payload. Reading past the end is [`MalformedReason::Truncated`]:
/// the length prefix already told us the payload is complete.
#[derive(Debug)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let slice = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or(MalformedReason::Truncated)?;
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, WireError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32, WireError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn i32(&mut self) -> Result<i32, WireError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn str(&mut self) -> Result<String, WireError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| MalformedReason::InvalidUtf8.into())
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Fail if the schema did not consume the whole payload.
    pub fn finish(&self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(MalformedReason::TrailingBytes(n).into()),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
