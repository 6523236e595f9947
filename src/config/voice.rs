//! Voice grant configuration.

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use super::error::ValidationError;

/// Configuration for minting voice room grants against the external media
/// server.
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    /// API key identifying this server to the media transport.
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Signing secret for room grants.
    #[serde(default = "default_api_secret")]
    pub api_secret: Secret<String>,

    /// WebSocket URL of the media server presented to clients.
    #[serde(default = "default_url")]
    pub url: String,

    /// Grant lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

impl VoiceConfig {
    /// Validate voice configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.token_ttl_secs < 60 || self.token_ttl_secs > 86_400 {
            return Err(ValidationError::InvalidVoiceTokenTtl);
        }
        if self.api_secret.expose_secret().len() < 16 {
            return Err(ValidationError::WeakVoiceSecret);
        }
        Ok(())
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            api_secret: default_api_secret(),
            url: default_url(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

fn default_api_key() -> String {
    "devkey".to_string()
}

fn default_api_secret() -> Secret<String> {
    Secret::new("devsecretdevsecretdevsecret12345".to_string())
}

fn default_url() -> String {
    "ws://localhost:7880".to_string()
}

fn default_token_ttl() -> u64 {
    6 * 3600
}
