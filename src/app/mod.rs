//! Application layer: the controller service and its ports.
//!
//! [`service::RemoteController`] glues the wire codec, a transport and the
//! correlation tracker together. All interaction with time, rendering and
//! event delivery happens through the **port traits** in [`ports`], so
//! this layer is testable with a loopback transport and a manual clock.

pub mod events;
pub mod ports;
pub mod service;
