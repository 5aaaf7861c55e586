//! Unified error types for the menu synchronization core.
//!
//! Two families with very different lifetimes:
//!
//! - **Data-driven** failures ([`WireError`]) come from bytes on the wire.
//!   They are returned as values, the offending message is dropped, and
//!   processing continues.
//! - **Wiring** failures ([`RegistryError`], [`ConfigError`]) are detected
//!   once while the codec is assembled and abort start-up.
//!
//! Every family converts into the top-level [`Error`] so callers that do
//! not care about the distinction can use `?` throughout.

use core::fmt;

use crate::protocol::command::CommandKind;
use crate::protocol::{MessageTypeCode, WireVariant};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Inbound bytes could not be turned into a command.
    Wire(WireError),
    /// An outbound command could not be serialised.
    Encode(EncodeError),
    /// The message registry is inconsistent.
    Registry(RegistryError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The transport refused the bytes.
    Transport(String),
    /// An edit was requested for a session that is not bound.
    UnknownSession(u32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(e) => write!(f, "wire: {e}"),
            Self::Encode(e) => write!(f, "encode: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::UnknownSession(id) => write!(f, "session {id} is not bound"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Wire (decode) errors
// ---------------------------------------------------------------------------

/// Outcome of a decode attempt that did not produce a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before the message did. Feed more bytes.
    Incomplete,
    /// The message can never be decoded and must be dropped.
    Malformed(MalformedReason),
    /// The type code has no decoder for this wire variant. `consumed`
    /// bytes cover the whole message so a stream can skip past it.
    UnknownMessageType {
        code: MessageTypeCode,
        wire: WireVariant,
        consumed: usize,
    },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete => write!(f, "incomplete message"),
            Self::Malformed(reason) => write!(f, "malformed message: {reason}"),
            Self::UnknownMessageType { code, wire, .. } => {
                write!(f, "unknown message type {code} ({wire})")
            }
        }
    }
}

impl std::error::Error for WireError {}

impl From<MalformedReason> for WireError {
    fn from(reason: MalformedReason) -> Self {
        Self::Malformed(reason)
    }
}

impl From<WireError> for Error {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

/// Why a message was rejected as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// First byte was not the start-of-message marker.
    BadStartMarker(u8),
    /// Protocol id byte is not one of the four defined values.
    UnknownProtocol(u8),
    /// Type code bytes are not printable ASCII.
    BadTypeCode,
    /// A tag-value pair had `=` with nothing before it.
    EmptyKey,
    /// A key ran into `|` or the terminator before its `=`.
    KeyWithoutValue,
    /// An unescaped `=` appeared inside a value.
    UnescapedSeparator,
    /// `\` followed by a character that is not reserved.
    BadEscape(u8),
    /// A required field was absent.
    MissingField(&'static str),
    /// A field was present but could not be parsed.
    BadFieldValue(&'static str),
    /// A binary payload ended before its schema did.
    Truncated,
    /// A binary payload had bytes left after its schema ended.
    TrailingBytes(usize),
    /// Text was not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadStartMarker(b) => write!(f, "bad start marker 0x{b:02x}"),
            Self::UnknownProtocol(b) => write!(f, "unknown protocol id 0x{b:02x}"),
            Self::BadTypeCode => write!(f, "type code is not printable ASCII"),
            Self::EmptyKey => write!(f, "empty key"),
            Self::KeyWithoutValue => write!(f, "key without value"),
            Self::UnescapedSeparator => write!(f, "unescaped '=' inside value"),
            Self::BadEscape(b) => write!(f, "bad escape '\\{}'", char::from(*b).escape_default()),
            Self::MissingField(key) => write!(f, "missing field {key}"),
            Self::BadFieldValue(key) => write!(f, "bad value for field {key}"),
            Self::Truncated => write!(f, "payload truncated"),
            Self::TrailingBytes(n) => write!(f, "{n} trailing bytes after payload"),
            Self::InvalidUtf8 => write!(f, "invalid UTF-8"),
        }
    }
}

// ---------------------------------------------------------------------------
// Encode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// No encoder is registered for this command kind (and wire variant).
    MissingEncoder(CommandKind, Option<WireVariant>),
    /// An encoder was handed a command of the wrong kind.
    KindMismatch(CommandKind),
    /// A field does not fit its wire representation.
    FieldOverflow(&'static str),
    /// A binary payload exceeds the 16-bit length prefix.
    PayloadTooLarge(usize),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEncoder(kind, Some(wire)) => {
                write!(f, "no {wire} encoder for {kind}")
            }
            Self::MissingEncoder(kind, None) => write!(f, "no encoder for {kind}"),
            Self::KindMismatch(kind) => write!(f, "encoder called with {kind}"),
            Self::FieldOverflow(key) => write!(f, "field {key} overflows its wire encoding"),
            Self::PayloadTooLarge(n) => write!(f, "payload of {n} bytes exceeds 65535"),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Self::Encode(e)
    }
}

// ---------------------------------------------------------------------------
// Registry (wiring) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// `(code, wire)` is already bound. The original binding stays active.
    DuplicateRegistration { code: MessageTypeCode, wire: WireVariant },
    /// A second encoder for the same command kind on the same wire.
    DuplicateEncoder { kind: CommandKind, wire: WireVariant },
    /// A command kind has no encoder on any wire variant.
    MissingEncoder(CommandKind),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRegistration { code, wire } => {
                write!(f, "type code {code} already registered for {wire}")
            }
            Self::DuplicateEncoder { kind, wire } => {
                write!(f, "{kind} already has a {wire} encoder")
            }
            Self::MissingEncoder(kind) => write!(f, "{kind} has no registered encoder"),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// The config file could not be read or parsed.
    Load(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Load(msg) => write!(f, "load failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
