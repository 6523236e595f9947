//! Server (community) value object.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ServerId, Timestamp, UserId};

/// A community of channels and members. The owner is seeded as an admin
/// member at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatServer {
    pub id: ServerId,
    pub name: String,
    pub owner_id: UserId,
    pub created_at: Timestamp,
    /// Retention policy in days; 0 disables scheduled purging.
    pub purge_after_days: i64,
}
