//! Message framing: start marker, protocol id, type code, payload.
//!
//! ```text
//! ┌────────┬──────────┬───────────┬──────────────────────────────┐
//! │ 0x01   │ PROTO(1) │ CODE(2)   │ PAYLOAD                      │
//! │ START  │ 1|2|81|82│ ASCII     │ text: pairs + terminator     │
//! │        │          │           │ binary: LEN(2, BE) + fields  │
//! └────────┴──────────┴───────────┴──────────────────────────────┘
//! ```
//!
//! The codec is stateless apart from its configuration; decoding works on
//! a borrowed buffer and reports how many bytes the message occupied, so
//! stream handling lives in [`super::inbound`].

use std::sync::Arc;

use crate::error::{EncodeError, MalformedReason, WireError};

use super::binary::{self, BinaryReader, BinaryWriter};
use super::command::Command;
use super::registry::{Binding, Decoder, Encoder, MessageTypeRegistry};
use super::tag_value::{self, TagValueWriter, ETX, TERMINATOR};
use super::{MessageTypeCode, WireVariant};

/// First byte of every message.
pub const START_MARKER: u8 = 0x01;

/// Marker, protocol id and type code.
pub const HEADER_LEN: usize = 4;

const ENCRYPTED_FLAG: u8 = 0x80;

/// Protocol id byte: wire variant plus an encrypted flag in the top bit.
///
/// The flag is carried through untouched; any encryption transform
/// happens outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolId(u8);

impl ProtocolId {
    pub const TAG_VALUE: Self = Self(0x01);
    pub const BINARY: Self = Self(0x02);

    pub fn from_byte(b: u8) -> Result<Self, MalformedReason> {
        match b & !ENCRYPTED_FLAG {
            0x01 | 0x02 => Ok(Self(b)),
            _ => Err(MalformedReason::UnknownProtocol(b)),
        }
    }

    pub const fn for_wire(wire: WireVariant, encrypted: bool) -> Self {
        let base = match wire {
            WireVariant::TagValue => 0x01,
            WireVariant::Binary => 0x02,
        };
        Self(if encrypted { base | ENCRYPTED_FLAG } else { base })
    }

    pub const fn wire(self) -> WireVariant {
        if self.0 & !ENCRYPTED_FLAG == 0x02 {
            WireVariant::Binary
        } else {
            WireVariant::TagValue
        }
    }

    pub const fn is_encrypted(self) -> bool {
        self.0 & ENCRYPTED_FLAG != 0
    }

    pub const fn byte(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub protocol: ProtocolId,
    pub code: MessageTypeCode,
}

/// A successfully decoded message.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub command: Command,
    pub header: FrameHeader,
    /// Bytes occupied by the whole message, header included.
    pub consumed: usize,
}

/// Encoder/decoder for complete messages.
///
/// Tag-value messages end with a different byte in each direction. A
/// controller-side codec ([`WireCodec::new`]) reads `~` and writes ETX; a
/// device-side codec ([`WireCodec::device_side`]) does the opposite.
#[derive(Debug, Clone)]
pub struct WireCodec {
    registry: Arc<MessageTypeRegistry>,
    encrypted: bool,
    inbound_terminator: u8,
    outbound_terminator: u8,
}

impl WireCodec {
    pub fn new(registry: Arc<MessageTypeRegistry>) -> Self {
        Self {
            registry,
            encrypted: false,
            inbound_terminator: TERMINATOR,
            outbound_terminator: ETX,
        }
    }

    pub fn device_side(registry: Arc<MessageTypeRegistry>) -> Self {
        Self {
            inbound_terminator: ETX,
            outbound_terminator: TERMINATOR,
            ..Self::new(registry)
        }
    }

    /// Set the encrypted bit on outbound protocol ids.
    #[must_use]
    pub fn with_encryption_flag(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    pub fn registry(&self) -> &Arc<MessageTypeRegistry> {
        &self.registry
    }

    // ── Decode ───────────────────────────────────────────────

    /// Decode the message at the front of `buf`.
    pub fn decode(&self, buf: &[u8]) -> Result<Decoded, WireError> {
        let header = read_header(buf)?;
        let body = &buf[HEADER_LEN..];
        let wire = header.protocol.wire();

        let (command, used) = match self.registry.lookup_decoder(header.code, wire) {
            Some(Decoder::TagValue(decode)) if wire == WireVariant::TagValue => {
                let (fields, used) = tag_value::parse_until(body, self.inbound_terminator)?;
                (decode(&fields)?, used)
            }
            Some(Decoder::Binary(decode)) if wire == WireVariant::Binary => {
                let (payload, used) = binary::read_payload(body)?;
                let mut reader = BinaryReader::new(payload);
                let command = decode(&mut reader)?;
                reader.finish()?;
                (command, used)
            }
            _ => {
                return Err(WireError::UnknownMessageType {
                    code: header.code,
                    wire,
                    consumed: self.frame_len(buf)?,
                });
            }
        };

        Ok(Decoded {
            command,
            header,
            consumed: HEADER_LEN + used,
        })
    }

    /// Length of the message at the front of `buf`, found from its
    /// framing alone. Lets a stream skip a message it cannot decode.
    pub fn frame_len(&self, buf: &[u8]) -> Result<usize, WireError> {
        let header = read_header(buf)?;
        let body = &buf[HEADER_LEN..];
        let used = match header.protocol.wire() {
            WireVariant::TagValue => tag_value::skip_until(body, self.inbound_terminator)?,
            WireVariant::Binary => binary::read_payload(body)?.1,
        };
        Ok(HEADER_LEN + used)
    }

    // ── Encode ───────────────────────────────────────────────

    /// Append `cmd` using its primary encoder. Returns bytes written.
    ///
    /// On failure `out` is left as it was.
    pub fn encode(&self, out: &mut Vec<u8>, cmd: &Command) -> Result<usize, EncodeError> {
        let kind = cmd.kind();
        let binding = self
            .registry
            .lookup_encoder(kind)
            .ok_or(EncodeError::MissingEncoder(kind, None))?;
        self.encode_with(out, cmd, binding)
    }

    /// Append `cmd` using the encoder for a specific wire variant.
    pub fn encode_as(
        &self,
        out: &mut Vec<u8>,
        cmd: &Command,
        wire: WireVariant,
    ) -> Result<usize, EncodeError> {
        let kind = cmd.kind();
        let binding = self
            .registry
            .lookup_encoder_for(kind, wire)
            .ok_or(EncodeError::MissingEncoder(kind, Some(wire)))?;
        self.encode_with(out, cmd, binding)
    }

    /// Encode into a fresh buffer.
    pub fn encode_to_vec(&self, cmd: &Command) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.encode(&mut out, cmd)?;
        Ok(out)
    }

    fn encode_with(
        &self,
        out: &mut Vec<u8>,
        cmd: &Command,
        binding: &Binding,
    ) -> Result<usize, EncodeError> {
        let start = out.len();
        match self.write_message(out, cmd, binding) {
            Ok(()) => Ok(out.len() - start),
            Err(e) => {
                out.truncate(start);
                Err(e)
            }
        }
    }

    fn write_message(
        &self,
        out: &mut Vec<u8>,
        cmd: &Command,
        binding: &Binding,
    ) -> Result<(), EncodeError> {
        out.push(START_MARKER);
        out.push(ProtocolId::for_wire(binding.wire(), self.encrypted).byte());

        match binding.encoder() {
            Encoder::TagValue(encode) => {
                let mut fields = TagValueWriter::new();
                encode(cmd, &mut fields)?;
                out.extend_from_slice(&binding.code().as_bytes());
                out.extend_from_slice(&fields.finish(self.outbound_terminator));
            }
            Encoder::Binary(encode) => {
                let mut fields = BinaryWriter::new();
                encode(cmd, &mut fields)?;
                binary::write(out, binding.code(), fields.as_bytes())?;
            }
        }
        Ok(())
    }
}

fn read_header(buf: &[u8]) -> Result<FrameHeader, WireError> {
    let Some(&marker) = buf.first() else {
        return Err(WireError::Incomplete);
    };
    if marker != START_MARKER {
        return Err(MalformedReason::BadStartMarker(marker).into());
    }
    let Some(&proto) = buf.get(1) else {
        return Err(WireError::Incomplete);
    };
    let protocol = ProtocolId::from_byte(proto)?;
    let (Some(&a), Some(&b)) = (buf.get(2), buf.get(3)) else {
        return Err(WireError::Incomplete);
    };
    let code = MessageTypeCode::from_bytes(a, b).ok_or(MalformedReason::BadTypeCode)?;
    Ok(FrameHeader { protocol, code })
}
