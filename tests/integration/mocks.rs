//! Mock ports for integration tests.
//!
//! Records every status change and controller event so tests can assert
//! on the full history.

use std::sync::Arc;

use parking_lot::Mutex;

use menulink::adapters::loopback::{LoopbackTransport, loopback_pair};
use menulink::adapters::sim_device::{SimulatedDevice, demo_menu};
use menulink::adapters::time::ManualClock;
use menulink::app::events::ControllerEvent;
use menulink::app::ports::{EventSink, StatusObserver};
use menulink::app::service::RemoteController;
use menulink::config::SyncConfig;
use menulink::correlation::CorrelationIdGen;
use menulink::edit::{CorrelationTracker, RenderingStatus, SessionTiming};
use menulink::protocol::WireVariant;
use menulink::protocol::command::MenuItemId;
use menulink::protocol::registry::MessageTypeRegistry;

// ── RecordingObserver ─────────────────────────────────────────

#[derive(Default)]
pub struct RecordingObserver {
    seen: Mutex<Vec<(MenuItemId, RenderingStatus)>>,
}

#[allow(dead_code)]
impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn statuses(&self) -> Vec<RenderingStatus> {
        self.seen.lock().iter().map(|&(_, s)| s).collect()
    }

    pub fn last(&self) -> Option<RenderingStatus> {
        self.seen.lock().last().map(|&(_, s)| s)
    }

    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}

impl StatusObserver for RecordingObserver {
    fn on_status_changed(&self, item: MenuItemId, status: RenderingStatus) {
        self.seen.lock().push((item, status));
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ControllerEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&ControllerEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ControllerEvent) {
        self.events.push(event.clone());
    }
}

// ── Fixtures ──────────────────────────────────────────────────

pub fn registry() -> Arc<MessageTypeRegistry> {
    Arc::new(MessageTypeRegistry::standard().expect("standard table is complete"))
}

/// Tracker on a manual clock starting at 0, ids counting up from 1.
pub fn tracker() -> (Arc<CorrelationTracker>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let tracker = CorrelationTracker::new(clock.clone(), SessionTiming::default())
        .with_ids(CorrelationIdGen::with_counter(clock.clone(), 1));
    (Arc::new(tracker), clock)
}

pub struct Rig {
    pub controller: RemoteController<LoopbackTransport>,
    pub device: SimulatedDevice<LoopbackTransport>,
    pub sink: RecordingSink,
    pub clock: Arc<ManualClock>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        let registry = registry();
        let (tracker, clock) = tracker();
        let (ctl, dev) = loopback_pair();
        Self {
            controller: RemoteController::new(ctl, registry.clone(), tracker, SyncConfig::default()),
            device: SimulatedDevice::new(dev, registry, "amp-01", "dev-uuid").with_menu(demo_menu()),
            sink: RecordingSink::new(),
            clock,
        }
    }

    pub fn with_binary_replies(mut self) -> Self {
        self.device = self.device.with_reply_wire(WireVariant::Binary);
        self
    }

    pub fn tracker(&self) -> &Arc<CorrelationTracker> {
        self.controller.tracker()
    }

    /// Exchange bytes until both sides are idle.
    pub fn pump(&mut self) {
        loop {
            let handled = self.device.poll().expect("device poll");
            let decoded = self.controller.poll(&mut self.sink).expect("controller poll");
            if handled == 0 && decoded == 0 {
                break;
            }
        }
    }
}
