//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `HEARTH` prefix
//! and nested sections use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use hearth::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod gateway;
mod server;
mod voice;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use server::{Environment, ServerConfig};
pub use voice::VoiceConfig;

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (SQLite file)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Realtime gateway configuration (heartbeat, sweeps)
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Voice grant configuration (media server, signing key)
    #[serde(default)]
    pub voice: VoiceConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file if present, then environment variables with the
    /// `HEARTH` prefix: `HEARTH__SERVER__PORT=8080` maps to `server.port`.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().prefix("HEARTH").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gateway.validate()?;
        self.voice.validate()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            gateway: GatewayConfig::default(),
            voice: VoiceConfig::default(),
        }
    }
}
