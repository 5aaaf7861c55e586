//! Per-control edit sessions and their rendering state machine.
//!
//! ```text
//!              edit_started               ack(Success)
//!   ┌────────┐ ───────────▶ ┌────────────────┐ ─────────▶ ┌──────────────┐
//!   │ Normal │              │ EditInProgress │            │ RecentUpdate │
//!   └────────┘ ◀─┐          └────────────────┘            └──────┬───────┘
//!       │        │             │ ack(failure)                    │
//!       │        │             │ or timeout (>= 5000 ms)         │
//!       │        │             ▼                                 │
//!       │        │       ┌──────────────────┐                    │
//!       │        └───────│ CorrelationError │                    │
//!       │   > 1000 ms    └──────────────────┘     > 1000 ms      │
//!       │        ▲                                               │
//!       │        └───────────────────────────────────────────────┘
//!       │ external update
//!       └──────────────▶ RecentUpdate
//! ```
//!
//! Each session serialises its state behind one lock. Observers are
//! notified after that lock is released, but under a per-session
//! reentrant ordering guard: the tick thread and the I/O context deliver
//! notifications in the order their changes were committed, and the last
//! status an observer sees always matches the session. Observers may call
//! back into their own session; they must not block on another thread
//! that edits the same session.

pub mod tracker;

use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Mutex, ReentrantMutex};

use crate::app::ports::{Clock, StatusObserver};
use crate::config::SyncConfig;
use crate::correlation::CorrelationId;
use crate::protocol::command::{AckStatus, MenuItemId};

pub use tracker::{CorrelationTracker, SessionHandle, SessionId, TickReport, TrackedAck};

/// Visual state of one editable control. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderingStatus {
    #[default]
    Normal,
    /// An edit was sent and its acknowledgement is outstanding.
    EditInProgress,
    /// The value changed recently, locally confirmed or remotely pushed.
    RecentUpdate,
    /// The device rejected the edit or never answered.
    CorrelationError,
}

impl RenderingStatus {
    /// Statuses that revert to `Normal` on their own.
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::RecentUpdate | Self::CorrelationError)
    }
}

/// Timing limits of the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Transient statuses revert once strictly older than this.
    pub revert_after_ms: u64,
    /// A pending correlation expires once at least this old.
    pub correlation_timeout_ms: u64,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            revert_after_ms: 1000,
            correlation_timeout_ms: 5000,
        }
    }
}

impl From<&SyncConfig> for SessionTiming {
    fn from(config: &SyncConfig) -> Self {
        Self {
            revert_after_ms: config.recent_update_ms,
            correlation_timeout_ms: config.correlation_timeout_ms,
        }
    }
}

/// Result of feeding an acknowledgement to one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The id was this session's pending correlation.
    Matched(RenderingStatus),
    /// Not pending here: orphaned, expired, duplicated or never issued.
    Stale,
}

/// What one tick changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// A transient status went back to `Normal`.
    pub reverted: bool,
    /// A pending correlation timed out.
    pub expired: Option<CorrelationId>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SessionState {
    pending: Option<CorrelationId>,
    sent_at_ms: u64,
    status: RenderingStatus,
    status_changed_at_ms: u64,
    retired: bool,
}

impl SessionState {
    fn set_status(&mut self, status: RenderingStatus, now_ms: u64) {
        self.status = status;
        self.status_changed_at_ms = now_ms;
    }
}

/// Read-only copy of a session's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub item_id: MenuItemId,
    pub status: RenderingStatus,
    pub pending: Option<CorrelationId>,
    pub status_changed_at_ms: u64,
}

/// Edit lifecycle of one control.
pub struct EditSession {
    item_id: MenuItemId,
    timing: SessionTiming,
    clock: Arc<dyn Clock>,
    observer: Option<Arc<dyn StatusObserver>>,
    /// Held from commit through notify. Taken before `state`.
    ordering: ReentrantMutex<()>,
    state: Mutex<SessionState>,
}

impl EditSession {
    pub fn new(
        item_id: MenuItemId,
        timing: SessionTiming,
        clock: Arc<dyn Clock>,
        observer: Option<Arc<dyn StatusObserver>>,
    ) -> Self {
        let now = clock.now_ms();
        Self {
            item_id,
            timing,
            clock,
            observer,
            ordering: ReentrantMutex::new(()),
            state: Mutex::new(SessionState {
                status_changed_at_ms: now,
                ..SessionState::default()
            }),
        }
    }

    pub fn item_id(&self) -> MenuItemId {
        self.item_id
    }

    pub fn status(&self) -> RenderingStatus {
        self.state.lock().status
    }

    pub fn pending(&self) -> Option<CorrelationId> {
        self.state.lock().pending
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let s = *self.state.lock();
        SessionSnapshot {
            item_id: self.item_id,
            status: s.status,
            pending: s.pending,
            status_changed_at_ms: s.status_changed_at_ms,
        }
    }

    /// An edit carrying `id` was sent.
    ///
    /// Returns the correlation this replaced, if any; that id is orphaned
    /// and its acknowledgement will be ignored. `EMPTY` is a no-op, and so
    /// is any edit on a retired session.
    pub fn edit_started(&self, id: CorrelationId) -> Option<CorrelationId> {
        if id.is_empty() {
            return None;
        }
        let _order = self.ordering.lock();
        let now = self.clock.now_ms();
        let orphaned = {
            let mut s = self.state.lock();
            if s.retired {
                return None;
            }
            let orphaned = s.pending.replace(id);
            s.sent_at_ms = now;
            s.set_status(RenderingStatus::EditInProgress, now);
            orphaned
        };
        if let Some(old) = orphaned {
            debug!("edit[{}]: {old} orphaned by {id}", self.item_id);
        }
        self.notify(RenderingStatus::EditInProgress);
        orphaned
    }

    /// Feed an acknowledgement. Only the pending id has any effect.
    pub fn on_acknowledgement(&self, id: CorrelationId, status: AckStatus) -> AckOutcome {
        let _order = self.ordering.lock();
        let now = self.clock.now_ms();
        let next = {
            let mut s = self.state.lock();
            if id.is_empty() || s.pending != Some(id) {
                return AckOutcome::Stale;
            }
            s.pending = None;
            let next = if status.is_success() {
                RenderingStatus::RecentUpdate
            } else {
                RenderingStatus::CorrelationError
            };
            s.set_status(next, now);
            next
        };
        if !status.is_success() {
            debug!("edit[{}]: {id} rejected: {status}", self.item_id);
        }
        self.notify(next);
        AckOutcome::Matched(next)
    }

    /// The device changed the value on its own.
    ///
    /// Ignored while an edit is in progress, which only an ack or a
    /// timeout may end. Returns whether the status changed.
    pub fn mark_external_update(&self) -> bool {
        let _order = self.ordering.lock();
        let now = self.clock.now_ms();
        {
            let mut s = self.state.lock();
            if s.pending.is_some() || s.retired {
                return false;
            }
            s.set_status(RenderingStatus::RecentUpdate, now);
        }
        self.notify(RenderingStatus::RecentUpdate);
        true
    }

    pub fn tick(&self) -> TickOutcome {
        self.tick_at(self.clock.now_ms())
    }

    /// Age transient statuses and expire a stale correlation.
    ///
    /// Both checks run on every tick, independently.
    pub fn tick_at(&self, now_ms: u64) -> TickOutcome {
        let _order = self.ordering.lock();
        let mut outcome = TickOutcome::default();
        let mut changes: heapless::Vec<RenderingStatus, 2> = heapless::Vec::new();
        {
            let mut s = self.state.lock();

            if s.status.is_transient()
                && now_ms.saturating_sub(s.status_changed_at_ms) > self.timing.revert_after_ms
            {
                s.set_status(RenderingStatus::Normal, now_ms);
                outcome.reverted = true;
                let _ = changes.push(RenderingStatus::Normal);
            }

            if let Some(id) = s.pending {
                if now_ms.saturating_sub(s.sent_at_ms) >= self.timing.correlation_timeout_ms {
                    s.pending = None;
                    s.set_status(RenderingStatus::CorrelationError, now_ms);
                    outcome.expired = Some(id);
                    let _ = changes.push(RenderingStatus::CorrelationError);
                }
            }
        }

        if let Some(id) = outcome.expired {
            warn!(
                "edit[{}]: correlation {id} lost after {} ms",
                self.item_id, self.timing.correlation_timeout_ms
            );
        }
        for status in changes {
            self.notify(status);
        }
        outcome
    }

    /// Detach from the tracker. Later edits and remote updates are
    /// refused. Returns the pending id so its route can be dropped.
    pub fn retire(&self) -> Option<CorrelationId> {
        let mut s = self.state.lock();
        s.retired = true;
        s.pending
    }

    pub fn is_retired(&self) -> bool {
        self.state.lock().retired
    }

    fn notify(&self, status: RenderingStatus) {
        if let Some(observer) = &self.observer {
            observer.on_status_changed(self.item_id, status);
        }
    }
}

impl core::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EditSession")
            .field("item_id", &self.item_id)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
