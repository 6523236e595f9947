//! Presence value objects.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ChannelId, UserId};

/// Reachability of a user, right now. There is no idle state; absence of a
/// presence record means offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresenceStatus {
    Online,
    Offline,
    InVoice,
}

/// One user's presence record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresence {
    pub user_id: UserId,
    pub status: PresenceStatus,
    pub voice_channel_id: Option<ChannelId>,
}

impl UserPresence {
    /// The synthesized record for a user with no live connections.
    pub fn offline(user_id: UserId) -> Self {
        Self {
            user_id,
            status: PresenceStatus::Offline,
            voice_channel_id: None,
        }
    }
}
