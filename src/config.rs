//! Synchronization configuration parameters
//!
//! Every tunable timing of the edit-session lifecycle and the link
//! monitor. Values load from a JSON file; anything missing falls back to
//! the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Core synchronization configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    // --- Ticker ---
    /// Period of the session ticker (milliseconds)
    pub tick_interval_ms: u64,

    // --- Edit sessions ---
    /// How long RecentUpdate / CorrelationError stay visible (milliseconds)
    pub recent_update_ms: u64,
    /// Age at which an unacknowledged edit is declared lost (milliseconds)
    pub correlation_timeout_ms: u64,

    // --- Link ---
    /// Heartbeat period announced to the device (milliseconds)
    pub heartbeat_interval_ms: u32,
    /// Missed heartbeat periods before the link counts as lost
    pub heartbeat_timeout_factor: u32,
    /// Inbound assembly buffer cap (bytes)
    pub max_inbound_bytes: usize,

    // --- Identity ---
    /// Name sent in the join message
    pub client_name: heapless::String<32>,
    /// UUID sent in the join message
    pub client_uuid: heapless::String<36>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let mut client_name = heapless::String::new();
        let _ = client_name.push_str("menulink");
        let mut client_uuid = heapless::String::new();
        let _ = client_uuid.push_str("8c5f5e2e-2f07-4c8b-9d1b-6c0c5e0f1a21");

        Self {
            // Ticker
            tick_interval_ms: 100,

            // Edit sessions
            recent_update_ms: 1000,
            correlation_timeout_ms: 5000,

            // Link
            heartbeat_interval_ms: 1500,
            heartbeat_timeout_factor: 3,
            max_inbound_bytes: 4096,

            client_name,
            client_uuid,
        }
    }
}

impl SyncConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Reject values that would stall or invert the session lifecycle.
    ///
    /// Invalid ranges are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be > 0"));
        }
        if self.recent_update_ms == 0 {
            return Err(ConfigError::ValidationFailed("recent_update_ms must be > 0"));
        }
        if self.correlation_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "correlation_timeout_ms must be > 0",
            ));
        }
        if self.tick_interval_ms >= self.recent_update_ms {
            return Err(ConfigError::ValidationFailed(
                "tick_interval_ms must be shorter than recent_update_ms",
            ));
        }
        if self.heartbeat_interval_ms == 0 || self.heartbeat_timeout_factor == 0 {
            return Err(ConfigError::ValidationFailed(
                "heartbeat interval and timeout factor must be > 0",
            ));
        }
        if self.max_inbound_bytes < 64 {
            return Err(ConfigError::ValidationFailed("max_inbound_bytes must be >= 64"));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Silence after which the link counts as lost.
    pub fn heartbeat_timeout_ms(&self) -> u64 {
        u64::from(self.heartbeat_interval_ms) * u64::from(self.heartbeat_timeout_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SyncConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.tick_interval_ms, 100);
        assert_eq!(c.recent_update_ms, 1000);
        assert_eq!(c.correlation_timeout_ms, 5000);
        assert_eq!(c.heartbeat_timeout_ms(), 4500);
        assert_eq!(c.client_name.as_str(), "menulink");
    }

    #[test]
    fn timing_ratios_make_sense() {
        let c = SyncConfig::default();
        assert!(
            c.tick_interval_ms < c.recent_update_ms,
            "ticks must be finer than the revert window"
        );
        assert!(
            c.recent_update_ms < c.correlation_timeout_ms,
            "a status flash should be shorter than the ack timeout"
        );
    }

    #[test]
    fn partial_json_uses_defaults() {
        let c = SyncConfig::from_json(r#"{ "correlation_timeout_ms": 2500 }"#).unwrap();
        assert_eq!(c.correlation_timeout_ms, 2500);
        assert_eq!(c.tick_interval_ms, 100);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            SyncConfig::from_json(r#"{ "tick_interval_ms": 0 }"#),
            Err(ConfigError::ValidationFailed("tick_interval_ms must be > 0"))
        );
        assert!(matches!(
            SyncConfig::from_json(r#"{ "tick_interval_ms": 1000 }"#),
            Err(ConfigError::ValidationFailed(_))
        ));
        assert!(matches!(
            SyncConfig::from_json("not json"),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = SyncConfig::load(Path::new("/nonexistent/menulink.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Load(msg) if msg.contains("menulink.json")));
    }

    #[test]
    fn serde_roundtrip() {
        let c = SyncConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SyncConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = SyncConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: SyncConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c, c2);
    }
}
