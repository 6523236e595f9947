//! Configuration error types.

use thiserror::Error;

/// Failure to load or deserialize configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Semantic validation failure in loaded configuration.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Server port must not be zero")]
    InvalidPort,

    #[error("Request timeout must be between 1 and 300 seconds")]
    InvalidTimeout,

    #[error("Database URL must not be empty")]
    EmptyDatabaseUrl,

    #[error("Heartbeat interval must be between 1 and 300 seconds")]
    InvalidHeartbeatInterval,

    #[error("Voice token TTL must be between 60 and 86400 seconds")]
    InvalidVoiceTokenTtl,

    #[error("Voice signing secret must be at least 16 bytes")]
    WeakVoiceSecret,
}
