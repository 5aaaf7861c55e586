//! Port traits: the boundary between the synchronization core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CorrelationTracker / RemoteController
//! ```
//!
//! Time, rendering and event delivery are injected through these traits,
//! so the core runs deterministically under test with a manual clock and
//! recording observers.

use crate::edit::RenderingStatus;
use crate::protocol::command::MenuItemId;

use super::events::ControllerEvent;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.
///
/// Shared between the tick thread and the I/O context, hence `Send + Sync`.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Status observer port (core → rendering layer)
// ───────────────────────────────────────────────────────────────

/// Receives every [`RenderingStatus`] change of one edit session.
///
/// Called from whichever thread caused the change (tick or inbound
/// delivery), never while a session lock is held, so an observer may
/// call back into the tracker.
pub trait StatusObserver: Send + Sync {
    fn on_status_changed(&self, item: MenuItemId, status: RenderingStatus);
}

impl<F> StatusObserver for F
where
    F: Fn(MenuItemId, RenderingStatus) + Send + Sync,
{
    fn on_status_changed(&self, item: MenuItemId, status: RenderingStatus) {
        self(item, status);
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (controller → logging / UI)
// ───────────────────────────────────────────────────────────────

/// The controller emits decoded traffic that is not an acknowledgement
/// through this port. Adapters decide where it goes.
pub trait EventSink {
    fn emit(&mut self, event: &ControllerEvent);
}
