//! Protocol counters.
//!
//! Every dropped message, stale acknowledgement and lost correlation is
//! counted here as well as logged, so a long-running session can be
//! inspected without trawling the log. Counters are relaxed atomics:
//! they are shared by the tick thread and the I/O context and only ever
//! read as a loose snapshot.

use core::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Live counters shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct ProtocolStats {
    decoded: AtomicU64,
    malformed_dropped: AtomicU64,
    unknown_dropped: AtomicU64,
    sent: AtomicU64,
    send_failures: AtomicU64,
    edits_started: AtomicU64,
    orphaned: AtomicU64,
    acks_matched: AtomicU64,
    stale_acks: AtomicU64,
    correlation_timeouts: AtomicU64,
}

/// Point-in-time copy of [`ProtocolStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub decoded: u64,
    pub malformed_dropped: u64,
    pub unknown_dropped: u64,
    pub sent: u64,
    pub send_failures: u64,
    pub edits_started: u64,
    pub orphaned: u64,
    pub acks_matched: u64,
    pub stale_acks: u64,
    pub correlation_timeouts: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl ProtocolStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decoded(&self) {
        bump(&self.decoded);
    }

    pub fn record_malformed(&self) {
        bump(&self.malformed_dropped);
    }

    pub fn record_unknown(&self) {
        bump(&self.unknown_dropped);
    }

    pub fn record_sent(&self) {
        bump(&self.sent);
    }

    pub fn record_send_failure(&self) {
        bump(&self.send_failures);
    }

    pub fn record_edit_started(&self) {
        bump(&self.edits_started);
    }

    pub fn record_orphaned(&self) {
        bump(&self.orphaned);
    }

    pub fn record_ack_matched(&self) {
        bump(&self.acks_matched);
    }

    pub fn record_stale_ack(&self) {
        bump(&self.stale_acks);
    }

    pub fn record_timeout(&self) {
        bump(&self.correlation_timeouts);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            decoded: get(&self.decoded),
            malformed_dropped: get(&self.malformed_dropped),
            unknown_dropped: get(&self.unknown_dropped),
            sent: get(&self.sent),
            send_failures: get(&self.send_failures),
            edits_started: get(&self.edits_started),
            orphaned: get(&self.orphaned),
            acks_matched: get(&self.acks_matched),
            stale_acks: get(&self.stale_acks),
            correlation_timeouts: get(&self.correlation_timeouts),
        }
    }
}

impl StatsSnapshot {
    /// Inbound messages discarded for any reason.
    pub fn dropped(&self) -> u64 {
        self.malformed_dropped + self.unknown_dropped
    }
}
