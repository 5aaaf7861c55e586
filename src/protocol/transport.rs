//! Transport abstraction: any byte-oriented channel to a device.
//!
//! Serial ports, sockets and BLE characteristics live outside this crate.
//! The controller is generic over `Transport`, so a new link needs no
//! changes to the protocol logic. [`crate::adapters::loopback`] provides
//! an in-memory pair for tests and the demo.

/// Byte-oriented transport channel.
pub trait Transport {
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes. Returns 0 when nothing is waiting
    /// (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Send one complete encoded message.
    fn send(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Whether a `read` would return data.
    fn available(&self) -> bool;
}

