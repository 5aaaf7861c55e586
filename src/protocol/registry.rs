//! Type-code registry: `(code, wire)` → codec functions.
//!
//! The registry is built once from a declarative table of [`Binding`]s
//! (see [`super::catalog::STANDARD_BINDINGS`]), checked for completeness,
//! then shared read-only behind an `Arc`. There is no global instance;
//! tests build their own registries, including deliberately partial ones.

use core::fmt;
use std::collections::HashMap;

use log::{debug, error};

use crate::error::{EncodeError, RegistryError, WireError};

use super::binary::{BinaryReader, BinaryWriter};
use super::command::{Command, CommandKind};
use super::tag_value::{TagValueMap, TagValueWriter};
use super::{MessageTypeCode, WireVariant};

pub type TextEncodeFn = fn(&Command, &mut TagValueWriter) -> Result<(), EncodeError>;
pub type TextDecodeFn = fn(&TagValueMap) -> Result<Command, WireError>;
pub type BinaryEncodeFn = fn(&Command, &mut BinaryWriter) -> Result<(), EncodeError>;
pub type BinaryDecodeFn = fn(&mut BinaryReader<'_>) -> Result<Command, WireError>;

/// Payload serialiser for one command kind on one wire variant.
#[derive(Clone, Copy)]
pub enum Encoder {
    TagValue(TextEncodeFn),
    Binary(BinaryEncodeFn),
}

/// Payload deserialiser for one type code on one wire variant.
#[derive(Clone, Copy)]
pub enum Decoder {
    TagValue(TextDecodeFn),
    Binary(BinaryDecodeFn),
}

/// One row of the registration table.
///
/// The constructors pair encoder and decoder of the same wire variant, so
/// a binding can never mix a text encoder with a binary decoder.
#[derive(Clone, Copy)]
pub struct Binding {
    code: MessageTypeCode,
    kind: CommandKind,
    encoder: Encoder,
    decoder: Decoder,
}

impl Binding {
    pub const fn tag_value(
        code: &[u8; 2],
        kind: CommandKind,
        encode: TextEncodeFn,
        decode: TextDecodeFn,
    ) -> Self {
        Self {
            code: MessageTypeCode::new(code),
            kind,
            encoder: Encoder::TagValue(encode),
            decoder: Decoder::TagValue(decode),
        }
    }

    pub const fn binary(
        code: &[u8; 2],
        kind: CommandKind,
        encode: BinaryEncodeFn,
        decode: BinaryDecodeFn,
    ) -> Self {
        Self {
            code: MessageTypeCode::new(code),
            kind,
            encoder: Encoder::Binary(encode),
            decoder: Decoder::Binary(decode),
        }
    }

    pub const fn code(&self) -> MessageTypeCode {
        self.code
    }

    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    pub const fn wire(&self) -> WireVariant {
        match self.encoder {
            Encoder::TagValue(_) => WireVariant::TagValue,
            Encoder::Binary(_) => WireVariant::Binary,
        }
    }

    pub const fn encoder(&self) -> Encoder {
        self.encoder
    }

    pub const fn decoder(&self) -> Decoder {
        self.decoder
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("code", &self.code)
            .field("kind", &self.kind)
            .field("wire", &self.wire())
            .finish_non_exhaustive()
    }
}

/// Bidirectional lookup over registered bindings.
#[derive(Default)]
pub struct MessageTypeRegistry {
    by_code: HashMap<(MessageTypeCode, WireVariant), Binding>,
    /// Registration order per kind; the first entry is the primary encoder.
    by_kind: HashMap<CommandKind, heapless::Vec<Binding, 2>>,
}

impl MessageTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the full standard catalog.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::from_table(&super::catalog::STANDARD_BINDINGS)
    }

    /// Register every row, then run the completeness check.
    ///
    /// Stops at the first failure: a broken table is a wiring bug.
    pub fn from_table(table: &[Binding]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for binding in table {
            registry.register(*binding)?;
        }
        registry.verify_complete()?;
        debug!("registry: {} bindings loaded", registry.len());
        Ok(registry)
    }

    /// Bind `(code, wire)` to a codec pair.
    ///
    /// On conflict the existing binding is left untouched.
    pub fn register(&mut self, binding: Binding) -> Result<(), RegistryError> {
        let wire = binding.wire();
        let key = (binding.code, wire);
        if self.by_code.contains_key(&key) {
            error!("registry: duplicate registration {} ({wire})", binding.code);
            return Err(RegistryError::DuplicateRegistration {
                code: binding.code,
                wire,
            });
        }

        let encoders = self.by_kind.entry(binding.kind).or_default();
        if encoders.iter().any(|b| b.wire() == wire) || encoders.is_full() {
            error!("registry: second {wire} encoder for {}", binding.kind);
            return Err(RegistryError::DuplicateEncoder {
                kind: binding.kind,
                wire,
            });
        }
        // Capacity checked above.
        let _ = encoders.push(binding);
        self.by_code.insert(key, binding);
        Ok(())
    }

    pub fn lookup_decoder(&self, code: MessageTypeCode, wire: WireVariant) -> Option<Decoder> {
        self.by_code.get(&(code, wire)).map(Binding::decoder)
    }

    /// Primary (first registered) encoder for `kind`.
    pub fn lookup_encoder(&self, kind: CommandKind) -> Option<&Binding> {
        self.by_kind.get(&kind).and_then(|v| v.first())
    }

    /// Encoder for `kind` on a specific wire variant.
    pub fn lookup_encoder_for(&self, kind: CommandKind, wire: WireVariant) -> Option<&Binding> {
        self.by_kind
            .get(&kind)
            .and_then(|v| v.iter().find(|b| b.wire() == wire))
    }

    /// Every command kind must have at least one encoder.
    pub fn verify_complete(&self) -> Result<(), RegistryError> {
        match CommandKind::ALL
            .into_iter()
            .find(|kind| self.lookup_encoder(*kind).is_none())
        {
            Some(kind) => {
                error!("registry: {kind} has no encoder");
                Err(RegistryError::MissingEncoder(kind))
            }
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

impl fmt::Debug for MessageTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageTypeRegistry")
            .field("bindings", &self.by_code.len())
            .finish()
    }
}
