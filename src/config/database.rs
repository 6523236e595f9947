//! Database configuration (SQLite).

use serde::Deserialize;

use super::error::ValidationError;

/// SQLite connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. `sqlite://data/hearth.db?mode=rwc`
    #[serde(default = "default_url")]
    pub url: String,

    /// Maximum pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Validate database configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::EmptyDatabaseUrl);
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_url() -> String {
    "sqlite://data/hearth.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}
