//! Correlation identifiers linking an outbound edit to its acknowledgement.
//!
//! An id is 32 bits rendered on the wire as eight lowercase hex digits.
//! The upper half is a coarse (seconds) clock reading, the lower half a
//! wrapping counter, so ids are unique only within a window of hours to
//! days. They are never used as durable keys.

use core::fmt;
use core::str::FromStr;
use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::app::ports::Clock;

/// Identifier carried by a value change and echoed by its acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CorrelationId(u32);

impl CorrelationId {
    /// No correlation requested; used by fire-and-forget edits.
    pub const EMPTY: Self = Self(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Wire form: eight lowercase hex digits.
    pub fn to_hex(self) -> heapless::String<8> {
        const DIGITS: &[u8; 16] = b"0123456789abcdef";
        let mut out = heapless::String::new();
        for shift in (0..8).rev() {
            let nibble = (self.0 >> (shift * 4)) & 0xF;
            // Capacity is exactly eight characters.
            let _ = out.push(char::from(DIGITS[nibble as usize]));
        }
        out
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Returned when a correlation field is not 1-8 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCorrelationId;

impl fmt::Display for InvalidCorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "correlation id must be 1-8 hex digits")
    }
}

impl std::error::Error for InvalidCorrelationId {}

impl FromStr for CorrelationId {
    type Err = InvalidCorrelationId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 8 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidCorrelationId);
        }
        u32::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| InvalidCorrelationId)
    }
}

/// Mints correlation ids from an injected clock and a private counter.
///
/// Holds no process-wide state: two generators are independent, and a
/// test can seed the counter and drive the clock deterministically.
pub struct CorrelationIdGen {
    counter: AtomicU32,
    clock: Arc<dyn Clock>,
}

impl CorrelationIdGen {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_counter(clock, 0)
    }

    pub fn with_counter(clock: Arc<dyn Clock>, start: u32) -> Self {
        Self {
            counter: AtomicU32::new(start),
            clock,
        }
    }

    /// Mint the next id. Never returns [`CorrelationId::EMPTY`].
    pub fn mint(&self) -> CorrelationId {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        // 1..=0xFFFF so the low half is never zero.
        let low = (seq % 0xFFFF) + 1;
        let coarse = (self.clock.now_ms() / 1000) as u32;
        CorrelationId((coarse << 16) | low)
    }
}
