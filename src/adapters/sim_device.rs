//! Scriptable remote device.
//!
//! Speaks the device side of the protocol over any [`Transport`]: answers
//! a join with its own join and the menu bootstrap, echoes heartbeats and
//! acknowledges correlated value changes. Acks can be held back and
//! released later to drive timeout and orphaning scenarios.

use std::sync::Arc;

use log::{debug, info};

use crate::correlation::CorrelationId;
use crate::error::{EncodeError, Error, Result};
use crate::protocol::WireVariant;
use crate::protocol::command::{
    Acknowledgement, AckStatus, AnalogBoot, ApiPlatform, BootHeader, BooleanBoot, BooleanNaming,
    Bootstrap, BootstrapPhase, ChangeValue, Command, EnumBoot, Heartbeat, HeartbeatMode, Join,
    MenuItemId, SubMenuBoot, TextBoot, ValueChange,
};
use crate::protocol::inbound::{Inbound, InboundAssembler};
use crate::protocol::registry::MessageTypeRegistry;
use crate::protocol::transport::Transport;
use crate::protocol::wire::WireCodec;

/// API version the simulated device reports in its join.
pub const DEVICE_API_VERSION: u16 = 100;

const READ_CHUNK: usize = 256;

pub struct SimulatedDevice<T: Transport> {
    transport: T,
    codec: WireCodec,
    inbound: InboundAssembler,
    name: String,
    uuid: String,
    menu: Vec<Command>,
    ack_status: AckStatus,
    hold_acks: bool,
    held: Vec<Acknowledgement>,
    reply_wire: WireVariant,
    received: Vec<Command>,
    out: Vec<u8>,
}

impl<T: Transport> SimulatedDevice<T> {
    pub fn new(transport: T, registry: Arc<MessageTypeRegistry>, name: &str, uuid: &str) -> Self {
        Self {
            transport,
            codec: WireCodec::device_side(registry),
            inbound: InboundAssembler::default(),
            name: name.into(),
            uuid: uuid.into(),
            menu: Vec::new(),
            ack_status: AckStatus::Success,
            hold_acks: false,
            held: Vec::new(),
            reply_wire: WireVariant::TagValue,
            received: Vec::new(),
            out: Vec::with_capacity(128),
        }
    }

    /// Boot commands sent between bootstrap START and END.
    #[must_use]
    pub fn with_menu(mut self, menu: Vec<Command>) -> Self {
        self.menu = menu;
        self
    }

    /// Prefer this wire variant for replies. Kinds without an encoder for
    /// it fall back to tag-value.
    #[must_use]
    pub fn with_reply_wire(mut self, wire: WireVariant) -> Self {
        self.reply_wire = wire;
        self
    }

    /// Status carried by every following acknowledgement.
    pub fn set_ack_status(&mut self, status: AckStatus) {
        self.ack_status = status;
    }

    /// Queue acks instead of sending them.
    pub fn hold_acks(&mut self, hold: bool) {
        self.hold_acks = hold;
    }

    pub fn held_acks(&self) -> &[Acknowledgement] {
        &self.held
    }

    /// Send every held ack, oldest first. Returns how many were sent.
    pub fn release_acks(&mut self) -> Result<usize> {
        let held = core::mem::take(&mut self.held);
        for ack in &held {
            self.send(&Command::Acknowledgement(*ack))?;
        }
        Ok(held.len())
    }

    /// Every command received so far, in arrival order.
    pub fn received(&self) -> &[Command] {
        &self.received
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ── Outbound ─────────────────────────────────────────────

    pub fn send(&mut self, cmd: &Command) -> Result<()> {
        self.out.clear();
        match self.codec.encode_as(&mut self.out, cmd, self.reply_wire) {
            Ok(_) => {}
            Err(EncodeError::MissingEncoder(..)) => {
                self.codec.encode(&mut self.out, cmd)?;
            }
            Err(e) => return Err(e.into()),
        }
        self.transport
            .send(&self.out)
            .map_err(|e| Error::Transport(format!("{e:?}")))
    }

    /// Report a value change nobody asked for.
    pub fn push_value(&mut self, item_id: MenuItemId, change: ChangeValue) -> Result<()> {
        self.send(&Command::ValueChange(ValueChange {
            item_id,
            correlation: CorrelationId::EMPTY,
            change,
        }))
    }

    // ── Inbound ──────────────────────────────────────────────

    /// Drain the transport and answer everything complete. Returns the
    /// number of commands handled.
    pub fn poll(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = self
                .transport
                .read(&mut chunk)
                .map_err(|e| Error::Transport(format!("{e:?}")))?;
            if n == 0 {
                break;
            }
            self.inbound.push(&chunk[..n]);
        }

        let mut handled = 0;
        while let Some(inbound) = self.inbound.next(&self.codec) {
            match inbound {
                Inbound::Command(decoded) => {
                    self.handle(decoded.command)?;
                    handled += 1;
                }
                Inbound::Dropped(e) => debug!("device: dropped inbound message: {e}"),
            }
        }
        Ok(handled)
    }

    fn handle(&mut self, cmd: Command) -> Result<()> {
        self.received.push(cmd.clone());
        match cmd {
            Command::Join(join) => {
                info!("device: {} joined (api {})", join.name, join.api_version);
                self.send_bootstrap()
            }
            Command::Heartbeat(hb) => match hb.mode {
                HeartbeatMode::End => Ok(()),
                HeartbeatMode::Normal | HeartbeatMode::Start => {
                    self.send(&Command::Heartbeat(Heartbeat {
                        interval_ms: hb.interval_ms,
                        mode: HeartbeatMode::Normal,
                    }))
                }
            },
            Command::ValueChange(vc) if !vc.correlation.is_empty() => {
                let ack = Acknowledgement {
                    correlation: vc.correlation,
                    status: self.ack_status,
                    item_id: Some(vc.item_id),
                };
                if self.hold_acks {
                    self.held.push(ack);
                    Ok(())
                } else {
                    self.send(&Command::Acknowledgement(ack))
                }
            }
            _ => Ok(()),
        }
    }

    fn send_bootstrap(&mut self) -> Result<()> {
        self.send(&Command::Join(Join {
            name: self.name.clone(),
            uuid: self.uuid.clone(),
            api_version: DEVICE_API_VERSION,
            platform: ApiPlatform::Arduino32,
        }))?;
        self.send(&Command::Bootstrap(Bootstrap {
            phase: BootstrapPhase::Start,
        }))?;
        let menu = core::mem::take(&mut self.menu);
        let sent = menu.iter().try_for_each(|item| self.send(item));
        self.menu = menu;
        sent?;
        self.send(&Command::Bootstrap(Bootstrap {
            phase: BootstrapPhase::End,
        }))
    }
}

/// Small menu tree for the demo binary and tests.
pub fn demo_menu() -> Vec<Command> {
    fn header(id: MenuItemId, parent_id: MenuItemId, name: &str) -> BootHeader {
        BootHeader {
            id,
            parent_id,
            name: name.into(),
            read_only: false,
            visible: true,
        }
    }

    vec![
        Command::AnalogBoot(AnalogBoot {
            header: header(1, 0, "Volume"),
            max: 100,
            offset: 0,
            divisor: 1,
            unit: "%".into(),
            current: 40,
        }),
        Command::EnumBoot(EnumBoot {
            header: header(2, 0, "Input"),
            choices: vec!["Line".into(), "USB".into(), "Bluetooth".into()],
            current: 1,
        }),
        Command::SubMenuBoot(SubMenuBoot {
            header: header(3, 0, "Settings"),
        }),
        Command::BooleanBoot(BooleanBoot {
            header: header(4, 3, "Backlight"),
            naming: BooleanNaming::OnOff,
            current: true,
        }),
        Command::TextBoot(TextBoot {
            header: header(5, 3, "Device name"),
            max_length: 16,
            edit_mode: 0,
            current: "amp-01".into(),
        }),
    ]
}
