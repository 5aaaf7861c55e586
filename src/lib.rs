//! MenuLink: remote menu synchronization core.
//!
//! Encodes and decodes the tag-value and binary wire formats of a remote
//! menu device, and tracks each in-flight edit by correlation id so the
//! rendering layer can show edit, success and failure states.
//!
//! Everything outside the protocol (transports, clocks, rendering) is
//! reached through the traits in [`app::ports`] and
//! [`protocol::transport`]; [`adapters`] holds the in-process ones.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod correlation;
pub mod diagnostics;
pub mod edit;
pub mod error;
pub mod protocol;
pub mod scheduler;

pub use error::{Error, Result};
