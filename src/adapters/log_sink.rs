//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per controller
//! event through the `log` facade. A UI adapter would implement the same
//! trait.

use log::{info, warn};

use crate::app::events::ControllerEvent;
use crate::app::ports::EventSink;
use crate::protocol::command::{ChangeValue, DialogMode};

/// Adapter that logs every [`ControllerEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u64,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ControllerEvent) {
        self.emitted += 1;
        match event {
            ControllerEvent::ConnectionChanged { from, to } => {
                info!("LINK  | {:?} -> {:?}", from, to);
            }
            ControllerEvent::Joined {
                name,
                uuid,
                api_version,
                platform,
            } => {
                info!(
                    "JOIN  | name={} uuid={} api={} platform={:?}",
                    name, uuid, api_version, platform
                );
            }
            ControllerEvent::Bootstrap(phase) => {
                info!("BOOT  | {}", phase.as_str());
            }
            ControllerEvent::ItemBooted(cmd) => match cmd.boot_header() {
                Some(h) => info!(
                    "ITEM  | {} id={} parent={} name={:?}{}",
                    cmd.kind(),
                    h.id,
                    h.parent_id,
                    h.name,
                    if h.read_only { " ro" } else { "" }
                ),
                None => info!("ITEM  | {}", cmd.kind()),
            },
            ControllerEvent::RemoteUpdate { item_id, change } => match change {
                ChangeValue::Delta(d) => info!("VALUE | id={} delta={:+}", item_id, d),
                ChangeValue::Absolute(v) => info!("VALUE | id={} value={:?}", item_id, v),
                ChangeValue::List(rows) => info!("VALUE | id={} rows={}", item_id, rows.len()),
            },
            ControllerEvent::Dialog(d) => {
                let mode = match d.mode {
                    DialogMode::Show => "show",
                    DialogMode::Hide => "hide",
                    DialogMode::Action => "action",
                };
                info!("DLG   | {} header={:?} buffer={:?}", mode, d.header, d.buffer);
            }
            ControllerEvent::Pairing(p) => {
                info!("PAIR  | name={} uuid={}", p.name, p.uuid);
            }
            ControllerEvent::Dropped(e) => {
                warn!("DROP  | {}", e);
            }
        }
    }
}
