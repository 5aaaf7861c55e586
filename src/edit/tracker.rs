//! Correlation tracker: owns every live edit session, mints correlation
//! ids and routes acknowledgements to the session waiting for them.
//!
//! ```text
//!   bind(item) ──▶ SessionHandle ──▶ begin_edit ──▶ id ──▶ (wire)
//!                                                          │
//!   on_acknowledgement(id) ◀── outstanding[id] ◀───────────┘
//! ```
//!
//! The outstanding index is only a routing hint. Each session's own
//! pending id decides whether an ack matches, so an index entry that
//! outlived its edit can only ever produce a stale outcome.

use core::sync::atomic::{AtomicU32, Ordering};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::{debug, info};
use parking_lot::{Mutex, RwLock};

use crate::app::ports::{Clock, StatusObserver};
use crate::correlation::{CorrelationId, CorrelationIdGen};
use crate::diagnostics::ProtocolStats;
use crate::protocol::command::{AckStatus, MenuItemId};

use super::{AckOutcome, EditSession, RenderingStatus, SessionTiming};

/// Identifier of a bound session, unique for the tracker's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u32);

impl SessionId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// What a control keeps after binding.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    session: Arc<EditSession>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn item_id(&self) -> MenuItemId {
        self.session.item_id()
    }

    pub fn status(&self) -> RenderingStatus {
        self.session.status()
    }

    pub fn pending(&self) -> Option<CorrelationId> {
        self.session.pending()
    }

    pub fn session(&self) -> &Arc<EditSession> {
        &self.session
    }
}

/// Tracker-level result of an inbound acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedAck {
    Matched {
        session: SessionId,
        item_id: MenuItemId,
        status: RenderingStatus,
    },
    /// No live session was waiting for this id. Dropped silently.
    Stale,
}

/// Totals from one pass over every live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub sessions: usize,
    pub reverted: usize,
    pub expired: usize,
}

pub struct CorrelationTracker {
    ids: CorrelationIdGen,
    clock: Arc<dyn Clock>,
    timing: SessionTiming,
    stats: Arc<ProtocolStats>,
    next_session: AtomicU32,
    sessions: RwLock<BTreeMap<SessionId, Arc<EditSession>>>,
    outstanding: Mutex<HashMap<CorrelationId, SessionId>>,
}

impl CorrelationTracker {
    pub fn new(clock: Arc<dyn Clock>, timing: SessionTiming) -> Self {
        Self {
            ids: CorrelationIdGen::new(clock.clone()),
            clock,
            timing,
            stats: Arc::new(ProtocolStats::new()),
            next_session: AtomicU32::new(1),
            sessions: RwLock::new(BTreeMap::new()),
            outstanding: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the id generator (seeded counters in tests).
    #[must_use]
    pub fn with_ids(mut self, ids: CorrelationIdGen) -> Self {
        self.ids = ids;
        self
    }

    /// Share counters with the rest of the stack.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<ProtocolStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &Arc<ProtocolStats> {
        &self.stats
    }

    pub fn timing(&self) -> SessionTiming {
        self.timing
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ── Session lifecycle ────────────────────────────────────

    /// Start tracking a control bound to `item_id`.
    pub fn bind(&self, item_id: MenuItemId, observer: Arc<dyn StatusObserver>) -> SessionHandle {
        self.insert(item_id, Some(observer))
    }

    /// Like [`bind`](Self::bind), for callers that poll the status.
    pub fn bind_unobserved(&self, item_id: MenuItemId) -> SessionHandle {
        self.insert(item_id, None)
    }

    fn insert(
        &self,
        item_id: MenuItemId,
        observer: Option<Arc<dyn StatusObserver>>,
    ) -> SessionHandle {
        let id = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        let session = Arc::new(EditSession::new(
            item_id,
            self.timing,
            self.clock.clone(),
            observer,
        ));
        self.sessions.write().insert(id, session.clone());
        debug!("tracker: bound session {} to item {item_id}", id.0);
        SessionHandle { id, session }
    }

    /// Stop tracking a session. Later acks for its ids are stale.
    pub fn unbind(&self, id: SessionId) -> bool {
        let Some(session) = self.sessions.write().remove(&id) else {
            return false;
        };
        if let Some(pending) = session.retire() {
            self.outstanding.lock().remove(&pending);
        }
        debug!("tracker: unbound session {}", id.0);
        true
    }

    pub fn session(&self, id: SessionId) -> Option<Arc<EditSession>> {
        self.sessions.read().get(&id).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.lock().len()
    }

    // ── Edits ────────────────────────────────────────────────

    pub fn mint(&self) -> CorrelationId {
        self.ids.mint()
    }

    /// Record that an edit carrying `correlation` was sent for `session`.
    ///
    /// Returns `false` if the session is not bound, including when it is
    /// unbound while the edit starts. `EMPTY` is a no-op.
    pub fn edit_started(&self, session: SessionId, correlation: CorrelationId) -> bool {
        let Some(s) = self.session(session) else {
            return false;
        };
        if correlation.is_empty() {
            return true;
        }

        // The session notifies its observer here, outside every tracker lock.
        let orphaned = s.edit_started(correlation);

        // Route only while still bound; `unbind` takes the write lock, so it
        // either ran before this check or will see the new pending id.
        {
            let sessions = self.sessions.read();
            let mut outstanding = self.outstanding.lock();
            if let Some(old) = orphaned {
                outstanding.remove(&old);
            }
            if !sessions.contains_key(&session) || s.is_retired() {
                debug!("tracker: session {} unbound during edit {correlation}", session.0);
                return false;
            }
            // A newer edit or an expiry may already have replaced it.
            if s.pending() == Some(correlation) {
                outstanding.insert(correlation, session);
            }
        }

        if orphaned.is_some() {
            self.stats.record_orphaned();
        }
        self.stats.record_edit_started();
        true
    }

    /// Mint an id and mark it started in one step.
    pub fn begin_edit(&self, session: SessionId) -> Option<CorrelationId> {
        let correlation = self.mint();
        self.edit_started(session, correlation).then_some(correlation)
    }

    /// Route an acknowledgement. Unmatched ids are counted and dropped.
    pub fn on_acknowledgement(&self, correlation: CorrelationId, status: AckStatus) -> TrackedAck {
        let routed = self.outstanding.lock().remove(&correlation);
        let target = routed.and_then(|id| self.session(id).map(|s| (id, s)));

        if let Some((id, session)) = target {
            if let AckOutcome::Matched(next) = session.on_acknowledgement(correlation, status) {
                self.stats.record_ack_matched();
                return TrackedAck::Matched {
                    session: id,
                    item_id: session.item_id(),
                    status: next,
                };
            }
        }

        self.stats.record_stale_ack();
        debug!("tracker: stale ack {correlation} ({status}) ignored");
        TrackedAck::Stale
    }

    /// The device pushed a new value for `item_id`. Returns how many
    /// sessions changed status.
    pub fn mark_external_update(&self, item_id: MenuItemId) -> usize {
        self.live_sessions()
            .into_iter()
            .filter(|s| s.item_id() == item_id)
            .map(|s| s.mark_external_update())
            .filter(|changed| *changed)
            .count()
    }

    // ── Ticking ──────────────────────────────────────────────

    pub fn tick(&self) -> TickReport {
        self.tick_at(self.clock.now_ms())
    }

    /// Age every live session once.
    pub fn tick_at(&self, now_ms: u64) -> TickReport {
        let sessions = self.live_sessions();
        let mut report = TickReport {
            sessions: sessions.len(),
            ..TickReport::default()
        };

        for session in sessions {
            let outcome = session.tick_at(now_ms);
            if outcome.reverted {
                report.reverted += 1;
            }
            if let Some(expired) = outcome.expired {
                self.outstanding.lock().remove(&expired);
                self.stats.record_timeout();
                report.expired += 1;
            }
        }

        if report.expired > 0 {
            info!("tracker: {} correlation(s) timed out", report.expired);
        }
        report
    }

    /// Snapshot so no tracker lock is held while sessions notify.
    fn live_sessions(&self) -> Vec<Arc<EditSession>> {
        self.sessions.read().values().cloned().collect()
    }
}

impl core::fmt::Debug for CorrelationTracker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CorrelationTracker")
            .field("sessions", &self.session_count())
            .field("outstanding", &self.outstanding_count())
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}
