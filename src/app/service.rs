//! Remote controller service.
//!
//! [`RemoteController`] owns the wire codec, the transport and the inbound
//! assembler, and shares the [`CorrelationTracker`] with the tick thread.
//! Acknowledgements and remote value changes are routed into the tracker;
//! everything else leaves through the [`EventSink`] passed at the call
//! site, so the service runs against a loopback transport under test.
//!
//! ```text
//!  Transport ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                │     RemoteController     │
//!  Transport ◀── │ codec · assembler · link │ ──▶ CorrelationTracker
//!                └──────────────────────────┘
//! ```

use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::SyncConfig;
use crate::correlation::CorrelationId;
use crate::diagnostics::ProtocolStats;
use crate::edit::{CorrelationTracker, SessionHandle, TrackedAck};
use crate::error::{Error, Result, WireError};
use crate::protocol::command::{
    ApiPlatform, ChangeValue, Command, Heartbeat, HeartbeatMode, Join, MenuItemId,
    PairingRequest, ValueChange,
};
use crate::protocol::inbound::{Inbound, InboundAssembler};
use crate::protocol::registry::MessageTypeRegistry;
use crate::protocol::transport::Transport;
use crate::protocol::wire::WireCodec;

use super::events::{ConnectionState, ControllerEvent};
use super::ports::{Clock, EventSink};

/// API version announced in our join.
pub const API_VERSION: u16 = 100;

const READ_CHUNK: usize = 512;

// ───────────────────────────────────────────────────────────────
// Link monitor
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Link {
    state: ConnectionState,
    last_rx_ms: u64,
    /// Set once our join went out; heartbeats start from here.
    last_hb_sent_ms: Option<u64>,
}

// ───────────────────────────────────────────────────────────────
// RemoteController
// ───────────────────────────────────────────────────────────────

pub struct RemoteController<T: Transport> {
    codec: WireCodec,
    transport: T,
    inbound: InboundAssembler,
    tracker: Arc<CorrelationTracker>,
    clock: Arc<dyn Clock>,
    stats: Arc<ProtocolStats>,
    config: SyncConfig,
    link: Link,
    out: Vec<u8>,
}

impl<T: Transport> RemoteController<T> {
    /// Time and counters come from `tracker`, so the tick thread and
    /// this service agree on both.
    pub fn new(
        transport: T,
        registry: Arc<MessageTypeRegistry>,
        tracker: Arc<CorrelationTracker>,
        config: SyncConfig,
    ) -> Self {
        Self {
            codec: WireCodec::new(registry),
            transport,
            inbound: InboundAssembler::new(config.max_inbound_bytes),
            clock: tracker.clock().clone(),
            stats: tracker.stats().clone(),
            tracker,
            config,
            link: Link::default(),
            out: Vec::with_capacity(128),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        self.link.state
    }

    pub fn tracker(&self) -> &Arc<CorrelationTracker> {
        &self.tracker
    }

    pub fn stats(&self) -> &Arc<ProtocolStats> {
        &self.stats
    }

    pub fn codec(&self) -> &WireCodec {
        &self.codec
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ── Outbound ──────────────────────────────────────────────

    /// Encode and send one command.
    pub fn send(&mut self, cmd: &Command) -> Result<()> {
        self.out.clear();
        self.codec.encode(&mut self.out, cmd)?;
        let sent = self
            .transport
            .send(&self.out)
            .and_then(|()| self.transport.flush());
        match sent {
            Ok(()) => {
                self.stats.record_sent();
                Ok(())
            }
            Err(e) => {
                self.stats.record_send_failure();
                warn!("controller: send {} failed: {:?}", cmd.kind(), e);
                Err(Error::Transport(format!("{e:?}")))
            }
        }
    }

    /// Introduce ourselves. Heartbeats follow from the next [`tick`](Self::tick).
    pub fn send_join(&mut self) -> Result<()> {
        let join = Command::Join(Join {
            name: self.config.client_name.as_str().into(),
            uuid: self.config.client_uuid.as_str().into(),
            api_version: API_VERSION,
            platform: ApiPlatform::Desktop,
        });
        self.send(&join)?;
        self.send_heartbeat(HeartbeatMode::Start)?;
        info!("controller: joined as {}", self.config.client_name);
        Ok(())
    }

    pub fn send_heartbeat(&mut self, mode: HeartbeatMode) -> Result<()> {
        self.send(&Command::Heartbeat(Heartbeat {
            interval_ms: self.config.heartbeat_interval_ms,
            mode,
        }))?;
        self.link.last_hb_sent_ms = Some(self.clock.now_ms());
        Ok(())
    }

    pub fn send_pairing(&mut self) -> Result<()> {
        self.send(&Command::PairingRequest(PairingRequest {
            name: self.config.client_name.as_str().into(),
            uuid: self.config.client_uuid.as_str().into(),
        }))
    }

    /// Send a tracked edit for the session's item.
    ///
    /// The session enters `EditInProgress` before the bytes go out. If
    /// the send fails the edit is never acknowledged and the session
    /// shows `CorrelationError` once the correlation timeout passes.
    pub fn send_edit(&mut self, session: &SessionHandle, change: ChangeValue) -> Result<CorrelationId> {
        let correlation = self
            .tracker
            .begin_edit(session.id())
            .ok_or(Error::UnknownSession(session.id().raw()))?;
        debug!("controller: edit {correlation} for item {}", session.item_id());
        self.send(&Command::ValueChange(ValueChange {
            item_id: session.item_id(),
            correlation,
            change,
        }))?;
        Ok(correlation)
    }

    /// Fire-and-forget change: no correlation, no status tracking.
    pub fn send_untracked(&mut self, item_id: MenuItemId, change: ChangeValue) -> Result<()> {
        self.send(&Command::ValueChange(ValueChange {
            item_id,
            correlation: CorrelationId::EMPTY,
            change,
        }))
    }

    /// Say goodbye and forget the link.
    pub fn close(&mut self, sink: &mut impl EventSink) -> Result<()> {
        let sent = self.send_heartbeat(HeartbeatMode::End);
        self.link.last_hb_sent_ms = None;
        self.inbound.clear();
        self.set_state(ConnectionState::Disconnected, sink);
        sent
    }

    // ── Inbound ───────────────────────────────────────────────

    /// Drain the transport and dispatch every complete message.
    /// Returns the number of commands decoded.
    pub fn poll(&mut self, sink: &mut impl EventSink) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.transport.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    self.inbound.push(&chunk[..n]);
                }
                Err(e) => {
                    warn!("controller: read failed: {:?}", e);
                    self.set_state(ConnectionState::Lost, sink);
                    return Err(Error::Transport(format!("{e:?}")));
                }
            }
        }
        Ok(self.drain_inbound(sink))
    }

    /// Dispatch bytes that arrived outside the transport.
    pub fn feed(&mut self, bytes: &[u8], sink: &mut impl EventSink) -> usize {
        self.inbound.push(bytes);
        self.drain_inbound(sink)
    }

    fn drain_inbound(&mut self, sink: &mut impl EventSink) -> usize {
        let mut decoded = 0;
        while let Some(inbound) = self.inbound.next(&self.codec) {
            match inbound {
                Inbound::Command(d) => {
                    self.stats.record_decoded();
                    decoded += 1;
                    self.dispatch(d.command, sink);
                }
                Inbound::Dropped(e) => self.dropped(e, sink),
            }
        }
        decoded
    }

    fn dropped(&mut self, e: WireError, sink: &mut impl EventSink) {
        match e {
            WireError::UnknownMessageType { .. } => self.stats.record_unknown(),
            _ => self.stats.record_malformed(),
        }
        warn!("wire: {e}, dropped");
        sink.emit(&ControllerEvent::Dropped(e));
    }

    fn dispatch(&mut self, cmd: Command, sink: &mut impl EventSink) {
        self.link.last_rx_ms = self.clock.now_ms();
        if self.link.state != ConnectionState::Connected {
            self.set_state(ConnectionState::Connected, sink);
        }

        match cmd {
            Command::Acknowledgement(ack) => {
                if let TrackedAck::Matched { item_id, status, .. } =
                    self.tracker.on_acknowledgement(ack.correlation, ack.status)
                {
                    debug!("controller: ack {} -> item {item_id} {:?}", ack.correlation, status);
                }
            }
            Command::ValueChange(vc) => {
                let changed = self.tracker.mark_external_update(vc.item_id);
                debug!("controller: remote update item {} ({changed} sessions)", vc.item_id);
                sink.emit(&ControllerEvent::RemoteUpdate {
                    item_id: vc.item_id,
                    change: vc.change,
                });
            }
            Command::Heartbeat(hb) => {
                if hb.mode == HeartbeatMode::End {
                    info!("controller: device closed the link");
                    self.set_state(ConnectionState::Lost, sink);
                }
            }
            Command::Join(j) => {
                info!("controller: device {} ({}) joined", j.name, j.uuid);
                sink.emit(&ControllerEvent::Joined {
                    name: j.name,
                    uuid: j.uuid,
                    api_version: j.api_version,
                    platform: j.platform,
                });
            }
            Command::Bootstrap(b) => sink.emit(&ControllerEvent::Bootstrap(b.phase)),
            Command::DialogUpdate(d) => sink.emit(&ControllerEvent::Dialog(d)),
            Command::PairingRequest(p) => sink.emit(&ControllerEvent::Pairing(p)),
            boot @ (Command::AnalogBoot(_)
            | Command::EnumBoot(_)
            | Command::BooleanBoot(_)
            | Command::SubMenuBoot(_)
            | Command::ActionBoot(_)
            | Command::FloatBoot(_)
            | Command::TextBoot(_)
            | Command::ListBoot(_)) => sink.emit(&ControllerEvent::ItemBooted(boot)),
        }
    }

    // ── Per-tick housekeeping ─────────────────────────────────

    /// Send a due heartbeat and detect a silent link.
    ///
    /// Session aging is the ticker's job, not this one.
    pub fn tick(&mut self, sink: &mut impl EventSink) -> Result<()> {
        let now = self.clock.now_ms();

        if self.link.state == ConnectionState::Connected
            && now.saturating_sub(self.link.last_rx_ms) > self.config.heartbeat_timeout_ms()
        {
            warn!(
                "controller: no traffic for {} ms, link lost",
                now - self.link.last_rx_ms
            );
            self.set_state(ConnectionState::Lost, sink);
        }

        if let Some(last) = self.link.last_hb_sent_ms {
            if now.saturating_sub(last) >= u64::from(self.config.heartbeat_interval_ms) {
                self.send_heartbeat(HeartbeatMode::Normal)?;
            }
        }
        Ok(())
    }

    fn set_state(&mut self, to: ConnectionState, sink: &mut impl EventSink) {
        let from = self.link.state;
        if from == to {
            return;
        }
        self.link.state = to;
        info!("controller: link {:?} -> {:?}", from, to);
        sink.emit(&ControllerEvent::ConnectionChanged { from, to });
    }
}
