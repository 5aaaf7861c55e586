//! Outbound controller events.
//!
//! The [`RemoteController`](super::service::RemoteController) emits these
//! through the [`EventSink`](super::ports::EventSink) port. Acknowledgements
//! never appear here; they go to the correlation tracker and surface as
//! rendering status changes instead.

use crate::error::WireError;
use crate::protocol::command::{
    ApiPlatform, BootstrapPhase, ChangeValue, Command, DialogUpdate, MenuItemId, PairingRequest,
};

/// Link state as seen through heartbeats and joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Nothing received yet.
    #[default]
    Disconnected,
    /// Traffic within the heartbeat window.
    Connected,
    /// Silent for longer than the heartbeat window, or closed by the device.
    Lost,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    ConnectionChanged {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// The device introduced itself.
    Joined {
        name: String,
        uuid: String,
        api_version: u16,
        platform: ApiPlatform,
    },

    Bootstrap(BootstrapPhase),

    /// One per-item boot command (analog, enum, boolean, ...).
    ItemBooted(Command),

    /// The device reported a value change it was not asked for.
    RemoteUpdate {
        item_id: MenuItemId,
        change: ChangeValue,
    },

    Dialog(DialogUpdate),

    Pairing(PairingRequest),

    /// An inbound message was discarded.
    Dropped(WireError),
}
