// ============================================
// File: crates/shdc-engine/src/config.rs
// ============================================
//! # Engine Configuration
//!
//! ## Creation Reason
//! Provides configuration for hub and sensor engines, supporting TOML
//! files with validated defaults.
//!
//! ## Configuration Sections
//! - `network`: UDP listen address, discovery destination, multicast
//! - `timing`: rotation intervals, grace windows, retry schedules
//! - `limits`: roster size, crypto-failure threshold, id allocation
//!
//! ## Example Configuration
//! ```toml
//! [network]
//! listen_addr = "0.0.0.0:56700"
//! discovery_addr = "239.255.0.1:56700"
//!
//! [timing]
//! broadcast_rotation_secs = 900
//! session_rotation_secs = 86400
//!
//! [limits]
//! max_sensors = 256
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Validate before engine startup; bad values abort `new_*`
//! - Rotation grace must cover in-flight packets; do not set it below
//!   the 30 s clock-skew window in production
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use shdc_core::protocol::{SHDC_MULTICAST_ADDR, SHDC_PORT};

use crate::error::{EngineError, Result};

// ============================================
// EngineConfig
// ============================================

/// Configuration shared by hub and sensor engines.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Timer and retry configuration.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` if the file cannot be read or parsed,
    /// or fails validation.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EngineError::config_invalid(&path_str, e.to_string()))?;

        let config = Self::from_toml_str(&content)?;
        info!(path = %path_str, "Configuration loaded");
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` on parse or validation failure.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| EngineError::config_invalid("<toml>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        self.timing.validate()?;
        self.limits.validate()?;
        Ok(())
    }
}

// ============================================
// NetworkConfig
// ============================================

/// Network addresses for the engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address the hub (or sensor) binds its UDP socket to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Destination sensors send discovery requests to.
    #[serde(default = "default_discovery_addr")]
    pub discovery_addr: SocketAddr,

    /// Whether the hub joins the discovery multicast group.
    #[serde(default = "default_true")]
    pub join_multicast: bool,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], SHDC_PORT))
}

fn default_discovery_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(SHDC_MULTICAST_ADDR), SHDC_PORT)
}

const fn default_true() -> bool {
    true
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            discovery_addr: default_discovery_addr(),
            join_multicast: true,
        }
    }
}

// ============================================
// TimingConfig
// ============================================

/// Timer intervals, grace windows, and retry schedules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Broadcast key rotation interval in seconds (default 15 min).
    #[serde(default = "default_broadcast_rotation")]
    pub broadcast_rotation_secs: u64,

    /// Session key rotation interval in seconds (default 24 h).
    #[serde(default = "default_session_rotation")]
    pub session_rotation_secs: u64,

    /// How long a replaced key stays acceptable past its successor's
    /// activation, in seconds.
    #[serde(default = "default_rotation_grace")]
    pub rotation_grace_secs: u64,

    /// Lead time between announcing a rotated key and its activation,
    /// in seconds.
    #[serde(default = "default_rotation_lead")]
    pub rotation_lead_secs: u32,

    /// Discovery retry intervals in seconds; the last entry repeats.
    #[serde(default = "default_discovery_backoff")]
    pub discovery_backoff_secs: Vec<u64>,

    /// Overall discovery deadline in seconds (default 5 min).
    #[serde(default = "default_discovery_deadline")]
    pub discovery_deadline_secs: u64,

    /// Join request retry interval in seconds.
    #[serde(default = "default_join_retry")]
    pub join_retry_secs: u64,

    /// Replay guard sweep interval in seconds.
    #[serde(default = "default_replay_sweep")]
    pub replay_sweep_secs: u64,

    /// Hub removes sensors not seen for this many seconds
    /// (0 disables idle expiry).
    #[serde(default = "default_idle_expiry")]
    pub sensor_idle_expiry_secs: u64,
}

fn default_broadcast_rotation() -> u64 {
    15 * 60
}
fn default_session_rotation() -> u64 {
    24 * 3600
}
fn default_rotation_grace() -> u64 {
    60
}
fn default_rotation_lead() -> u32 {
    5
}
fn default_discovery_backoff() -> Vec<u64> {
    vec![5, 10, 20, 30]
}
fn default_discovery_deadline() -> u64 {
    5 * 60
}
fn default_join_retry() -> u64 {
    5
}
fn default_replay_sweep() -> u64 {
    30
}
fn default_idle_expiry() -> u64 {
    3600
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            broadcast_rotation_secs: default_broadcast_rotation(),
            session_rotation_secs: default_session_rotation(),
            rotation_grace_secs: default_rotation_grace(),
            rotation_lead_secs: default_rotation_lead(),
            discovery_backoff_secs: default_discovery_backoff(),
            discovery_deadline_secs: default_discovery_deadline(),
            join_retry_secs: default_join_retry(),
            replay_sweep_secs: default_replay_sweep(),
            sensor_idle_expiry_secs: default_idle_expiry(),
        }
    }
}

impl TimingConfig {
    fn validate(&self) -> Result<()> {
        if self.broadcast_rotation_secs == 0 {
            return Err(EngineError::config_invalid(
                "timing.broadcast_rotation_secs",
                "must be nonzero",
            ));
        }
        if self.session_rotation_secs == 0 {
            return Err(EngineError::config_invalid(
                "timing.session_rotation_secs",
                "must be nonzero",
            ));
        }
        if self.discovery_backoff_secs.is_empty() {
            return Err(EngineError::config_invalid(
                "timing.discovery_backoff_secs",
                "must list at least one interval",
            ));
        }
        if self.discovery_backoff_secs.iter().any(|&s| s == 0) {
            return Err(EngineError::config_invalid(
                "timing.discovery_backoff_secs",
                "intervals must be nonzero",
            ));
        }
        Ok(())
    }

    /// Broadcast rotation interval as a `Duration`.
    #[must_use]
    pub const fn broadcast_rotation(&self) -> Duration {
        Duration::from_secs(self.broadcast_rotation_secs)
    }

    /// Session rotation interval as a `Duration`.
    #[must_use]
    pub const fn session_rotation(&self) -> Duration {
        Duration::from_secs(self.session_rotation_secs)
    }

    /// Rotation grace window as a `Duration`.
    #[must_use]
    pub const fn rotation_grace(&self) -> Duration {
        Duration::from_secs(self.rotation_grace_secs)
    }

    /// Backoff interval for the given retry attempt (0-based); the
    /// schedule's last entry repeats.
    #[must_use]
    pub fn discovery_backoff(&self, attempt: usize) -> Duration {
        let idx = attempt.min(self.discovery_backoff_secs.len() - 1);
        Duration::from_secs(self.discovery_backoff_secs[idx])
    }
}

// ============================================
// LimitsConfig
// ============================================

/// Resource limits and allocation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of joined sensors.
    #[serde(default = "default_max_sensors")]
    pub max_sensors: usize,

    /// Consecutive signature/AEAD failures before a sensor re-enters
    /// discovery.
    #[serde(default = "default_failure_threshold")]
    pub crypto_failure_threshold: u32,

    /// First device id the hub allocates to a joining sensor.
    #[serde(default = "default_first_device_id")]
    pub first_device_id: u32,
}

fn default_max_sensors() -> usize {
    256
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_first_device_id() -> u32 {
    0xA000_0001
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sensors: default_max_sensors(),
            crypto_failure_threshold: default_failure_threshold(),
            first_device_id: default_first_device_id(),
        }
    }
}

impl LimitsConfig {
    fn validate(&self) -> Result<()> {
        if self.max_sensors == 0 {
            return Err(EngineError::config_invalid(
                "limits.max_sensors",
                "must be nonzero",
            ));
        }
        if self.first_device_id == 0 {
            return Err(EngineError::config_invalid(
                "limits.first_device_id",
                "0x00000000 is the reserved unassigned sentinel",
            ));
        }
        if self.crypto_failure_threshold == 0 {
            return Err(EngineError::config_invalid(
                "limits.crypto_failure_threshold",
                "must be nonzero",
            ));
        }
        Ok(())
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timing.broadcast_rotation_secs, 900);
        assert_eq!(config.timing.session_rotation_secs, 86_400);
        assert_eq!(config.network.listen_addr.port(), 56700);
    }

    #[test]
    fn test_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            [network]
            listen_addr = "0.0.0.0:15700"

            [timing]
            broadcast_rotation_secs = 60

            [limits]
            max_sensors = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.network.listen_addr.port(), 15700);
        assert_eq!(config.timing.broadcast_rotation_secs, 60);
        assert_eq!(config.limits.max_sensors, 8);
        // Unset sections keep their defaults
        assert_eq!(config.timing.session_rotation_secs, 86_400);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(EngineConfig::from_toml_str("[limits]\nmax_sensors = 0").is_err());
        assert!(EngineConfig::from_toml_str("[limits]\nfirst_device_id = 0").is_err());
        assert!(
            EngineConfig::from_toml_str("[timing]\ndiscovery_backoff_secs = []").is_err()
        );
    }

    #[test]
    fn test_backoff_schedule_caps() {
        let timing = TimingConfig::default();
        assert_eq!(timing.discovery_backoff(0), Duration::from_secs(5));
        assert_eq!(timing.discovery_backoff(1), Duration::from_secs(10));
        assert_eq!(timing.discovery_backoff(2), Duration::from_secs(20));
        assert_eq!(timing.discovery_backoff(3), Duration::from_secs(30));
        // Past the schedule end, the cap repeats
        assert_eq!(timing.discovery_backoff(10), Duration::from_secs(30));
    }
}
