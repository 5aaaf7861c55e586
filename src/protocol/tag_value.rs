//! Tag-value text payload codec.
//!
//! Wire format:
//! ```text
//! KEY=VALUE|KEY=VALUE|...~
//! ```
//!
//! Inside a value the reserved bytes are escaped with a backslash
//! (`\|`, `\=`, `\\`, `\~`, and `\` + ETX). Keys are never escaped.
//!
//! The terminator differs by direction: a device ends its messages with
//! `~`, this side ends outbound messages with ETX (0x02). Both parse and
//! write therefore take the terminator explicitly; [`parse`] and [`write`]
//! use `~`.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{MalformedReason, WireError};

/// Inbound terminator.
pub const TERMINATOR: u8 = b'~';

/// Terminator written by this side on outbound messages.
pub const ETX: u8 = 0x02;

const ESCAPE: u8 = b'\\';
const PAIR_END: u8 = b'|';
const KEY_END: u8 = b'=';

// ── Parsing ──────────────────────────────────────────────────

/// Parsed `KEY=VALUE` pairs. Later duplicates overwrite earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagValueMap {
    fields: BTreeMap<String, String>,
}

impl TagValueMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Required string field.
    pub fn text(&self, key: &'static str) -> Result<&str, WireError> {
        self.get(key)
            .ok_or(WireError::Malformed(MalformedReason::MissingField(key)))
    }

    /// Required field parsed with `FromStr`.
    pub fn parse<T: FromStr>(&self, key: &'static str) -> Result<T, WireError> {
        self.text(key)?
            .parse()
            .map_err(|_| WireError::Malformed(MalformedReason::BadFieldValue(key)))
    }

    /// Optional field parsed with `FromStr`; present-but-bad is still an error.
    pub fn parse_opt<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, WireError> {
        match self.get(key) {
            None => Ok(None),
            Some(_) => self.parse(key).map(Some),
        }
    }

    /// `0`/`1` flag.
    pub fn flag(&self, key: &'static str) -> Result<bool, WireError> {
        match self.text(key)? {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(WireError::Malformed(MalformedReason::BadFieldValue(key))),
        }
    }

    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), WireError> {
        let key = String::from_utf8(key).map_err(|_| MalformedReason::InvalidUtf8)?;
        let value = String::from_utf8(value).map_err(|_| MalformedReason::InvalidUtf8)?;
        self.fields.insert(key, value);
        Ok(())
    }
}

impl FromIterator<(String, String)> for TagValueMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

enum ScanState {
    Key,
    Value,
}

/// Parse a `~`-terminated payload. Returns the fields and bytes consumed.
pub fn parse(bytes: &[u8]) -> Result<(TagValueMap, usize), WireError> {
    parse_until(bytes, TERMINATOR)
}

/// Parse a payload ending at `terminator`.
///
/// Running out of bytes before the terminator is [`WireError::Incomplete`];
/// every other failure is [`WireError::Malformed`].
pub fn parse_until(bytes: &[u8], terminator: u8) -> Result<(TagValueMap, usize), WireError> {
    let mut map = TagValueMap::default();
    let mut key = Vec::new();
    let mut value = Vec::new();
    let mut state = ScanState::Key;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        i += 1;

        match state {
            ScanState::Key => {
                if b == terminator && key.is_empty() {
                    return Ok((map, i));
                }
                match b {
                    KEY_END if key.is_empty() => return Err(MalformedReason::EmptyKey.into()),
                    KEY_END => state = ScanState::Value,
                    PAIR_END => return Err(MalformedReason::KeyWithoutValue.into()),
                    _ if b == terminator => return Err(MalformedReason::KeyWithoutValue.into()),
                    _ => key.push(b),
                }
            }

            ScanState::Value => {
                if b == terminator {
                    map.insert(core::mem::take(&mut key), core::mem::take(&mut value))?;
                    return Ok((map, i));
                }
                match b {
                    ESCAPE => {
                        let Some(&escaped) = bytes.get(i) else {
                            return Err(WireError::Incomplete);
                        };
                        if !is_escapable(escaped) {
                            return Err(MalformedReason::BadEscape(escaped).into());
                        }
                        value.push(escaped);
                        i += 1;
                    }
                    PAIR_END => {
                        map.insert(core::mem::take(&mut key), core::mem::take(&mut value))?;
                        state = ScanState::Key;
                    }
                    KEY_END => return Err(MalformedReason::UnescapedSeparator.into()),
                    _ => value.push(b),
                }
            }
        }
    }

    Err(WireError::Incomplete)
}

/// Length of the message up to and including its terminator, without
/// building any fields. Used to drop messages nobody can decode.
pub fn skip_until(bytes: &[u8], terminator: u8) -> Result<usize, WireError> {
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            ESCAPE => i += 2,
            b if b == terminator => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(WireError::Incomplete)
}

fn is_escapable(b: u8) -> bool {
    matches!(b, ESCAPE | PAIR_END | KEY_END | TERMINATOR | ETX)
}

// ── Writing ──────────────────────────────────────────────────

/// Accumulates escaped `KEY=VALUE|` pairs.
#[derive(Debug, Default)]
pub struct TagValueWriter {
    buf: Vec<u8>,
}

impl TagValueWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one pair. `value` is rendered with `Display` and escaped.
    pub fn field(&mut self, key: &str, value: impl core::fmt::Display) -> &mut Self {
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.push(KEY_END);
        escape_into(&value.to_string(), &mut self.buf);
        self.buf.push(PAIR_END);
        self
    }

    /// `0`/`1` flag.
    pub fn flag(&mut self, key: &str, value: bool) -> &mut Self {
        self.field(key, u8::from(value))
    }

    /// Pairs written so far, without a terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer, appending `terminator`.
    pub fn finish(mut self, terminator: u8) -> Vec<u8> {
        self.buf.push(terminator);
        self.buf
    }
}

/// Write `fields` as a complete `~`-terminated payload.
pub fn write(fields: &[(&str, &str)]) -> Vec<u8> {
    let mut w = TagValueWriter::new();
    for (key, value) in fields {
        w.field(key, value);
    }
    w.finish(TERMINATOR)
}

fn escape_into(value: &str, out: &mut Vec<u8>) {
    for &b in value.as_bytes() {
        if is_escapable(b) {
            out.push(ESCAPE);
        }
        out.push(b);
    }
}

// ── Tests ────────────────────────────────────────────────────
