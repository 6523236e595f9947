//! Realtime gateway configuration.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Gateway liveness and housekeeping configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Seconds between heartbeat sweeps. A connection that misses one full
    /// cycle without ponging is terminated.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Seconds an uploaded attachment may stay unlinked before the orphan
    /// sweep removes it.
    #[serde(default = "default_orphan_ttl")]
    pub orphan_attachment_ttl_secs: u64,

    /// Seconds between orphan sweeps.
    #[serde(default = "default_orphan_sweep_interval")]
    pub orphan_sweep_interval_secs: u64,
}

impl GatewayConfig {
    /// Heartbeat interval as a [`Duration`].
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Orphan sweep interval as a [`Duration`].
    pub fn orphan_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.orphan_sweep_interval_secs)
    }

    /// Validate gateway configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.heartbeat_interval_secs == 0 || self.heartbeat_interval_secs > 300 {
            return Err(ValidationError::InvalidHeartbeatInterval);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            orphan_attachment_ttl_secs: default_orphan_ttl(),
            orphan_sweep_interval_secs: default_orphan_sweep_interval(),
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_orphan_ttl() -> u64 {
    3600
}

fn default_orphan_sweep_interval() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_heartbeat_is_thirty_seconds() {
        let config = GatewayConfig::default();
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_heartbeat_is_rejected() {
        let config = GatewayConfig {
            heartbeat_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
