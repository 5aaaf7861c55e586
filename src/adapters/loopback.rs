//! In-memory [`Transport`] pair.
//!
//! Bytes sent on one end become readable on the other. Used by the demo
//! binary and by tests that run a controller against a simulated device
//! on the same thread. `with_read_chunk` caps how many bytes one `read`
//! returns, to exercise partial-message assembly.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::protocol::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopbackError {
    /// Either end called [`LoopbackTransport::close`].
    Closed,
}

impl core::fmt::Display for LoopbackError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Closed => write!(f, "loopback closed"),
        }
    }
}

impl std::error::Error for LoopbackError {}

#[derive(Debug, Default)]
struct Link {
    queues: [VecDeque<u8>; 2],
    closed: bool,
}

/// One end of a loopback link.
#[derive(Debug)]
pub struct LoopbackTransport {
    link: Arc<Mutex<Link>>,
    /// Index of the queue this end reads from.
    rx: usize,
    read_chunk: usize,
}

/// Two connected ends: `(controller, device)` by convention.
pub fn loopback_pair() -> (LoopbackTransport, LoopbackTransport) {
    let link = Arc::new(Mutex::new(Link::default()));
    (
        LoopbackTransport {
            link: link.clone(),
            rx: 0,
            read_chunk: usize::MAX,
        },
        LoopbackTransport {
            link,
            rx: 1,
            read_chunk: usize::MAX,
        },
    )
}

impl LoopbackTransport {
    pub fn with_read_chunk(mut self, chunk: usize) -> Self {
        self.read_chunk = chunk.max(1);
        self
    }

    /// Close both ends. Later sends and reads fail.
    pub fn close(&self) {
        self.link.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.link.lock().closed
    }

    /// Bytes waiting for this end.
    pub fn pending(&self) -> usize {
        self.link.lock().queues[self.rx].len()
    }
}

impl Transport for LoopbackTransport {
    type Error = LoopbackError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut link = self.link.lock();
        if link.closed {
            return Err(LoopbackError::Closed);
        }
        let queue = &mut link.queues[self.rx];
        let n = buf.len().min(queue.len()).min(self.read_chunk);
        for (slot, byte) in buf.iter_mut().zip(queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn send(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let mut link = self.link.lock();
        if link.closed {
            return Err(LoopbackError::Closed);
        }
        link.queues[1 - self.rx].extend(data.iter().copied());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn available(&self) -> bool {
        self.pending() > 0
    }
}
