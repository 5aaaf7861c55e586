//! Transport-agnostic remote menu protocol.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Protocol Stack                          │
//! │                                                              │
//! │  ┌───────────┐   ┌──────────────┐   ┌─────────────────────┐  │
//! │  │ Transport │──▶│   Inbound    │──▶│     WireCodec       │  │
//! │  │  (trait)  │   │  assembler   │   │ marker·proto·code   │  │
//! │  └───────────┘   └──────────────┘   └──────────┬──────────┘  │
//! │                                                │             │
//! │                               ┌────────────────▼──────────┐  │
//! │                               │   MessageTypeRegistry     │  │
//! │                               │ (code, wire) → codec fns  │  │
//! │                               └──────┬─────────────┬──────┘  │
//! │                                      ▼             ▼         │
//! │                               ┌───────────┐ ┌────────────┐   │
//! │                               │ tag-value │ │   binary   │   │
//! │                               └───────────┘ └────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Wire layout: `START(1) | PROTOCOL_ID(1) | TYPE_CODE(2, ASCII) | PAYLOAD`.

use core::fmt;

pub mod binary;
pub mod catalog;
pub mod command;
pub mod inbound;
pub mod registry;
pub mod tag_value;
pub mod transport;
pub mod wire;

/// One of the two supported payload serialisations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireVariant {
    /// `KEY=VALUE|` pairs, see [`tag_value`].
    TagValue,
    /// Length-prefixed big-endian fields, see [`binary`].
    Binary,
}

impl fmt::Display for WireVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagValue => write!(f, "tag-value"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Two-character ASCII identifier naming one command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageTypeCode([u8; 2]);

impl MessageTypeCode {
    /// Build a code from a literal. Only used for the static catalog.
    pub const fn new(code: &[u8; 2]) -> Self {
        Self(*code)
    }

    /// Validate two bytes read off the wire.
    pub fn from_bytes(a: u8, b: u8) -> Option<Self> {
        (a.is_ascii_graphic() && b.is_ascii_graphic()).then_some(Self([a, b]))
    }

    pub const fn as_bytes(&self) -> [u8; 2] {
        self.0
    }
}

impl fmt::Display for MessageTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", char::from(self.0[0]), char::from(self.0[1]))
    }
}
