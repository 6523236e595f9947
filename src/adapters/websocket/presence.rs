//! Presence tracker - in-memory user presence state.
//!
//! Absence of a record means offline. State is intentionally volatile:
//! after a restart it rebuilds as connections re-register.

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::chat::{PresenceStatus, UserPresence};
use crate::domain::foundation::{ChannelId, UserId};

/// Process-wide map of user id to presence record.
#[derive(Default)]
pub struct PresenceTracker {
    records: RwLock<HashMap<UserId, UserPresence>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a user online, clearing any voice state. Idempotent.
    pub async fn set_online(&self, user_id: &UserId) {
        self.records.write().await.insert(
            user_id.clone(),
            UserPresence {
                user_id: user_id.clone(),
                status: PresenceStatus::Online,
                voice_channel_id: None,
            },
        );
    }

    /// Removes the record entirely; the user reads as offline afterwards.
    pub async fn set_offline(&self, user_id: &UserId) {
        self.records.write().await.remove(user_id);
    }

    /// Transitions an online user into a voice channel.
    pub async fn set_in_voice(&self, user_id: &UserId, channel_id: &ChannelId) {
        self.records.write().await.insert(
            user_id.clone(),
            UserPresence {
                user_id: user_id.clone(),
                status: PresenceStatus::InVoice,
                voice_channel_id: Some(channel_id.clone()),
            },
        );
    }

    /// Drops voice state back to plain online. No-op when no record exists.
    pub async fn leave_voice(&self, user_id: &UserId) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(user_id) {
            record.status = PresenceStatus::Online;
            record.voice_channel_id = None;
        }
    }

    /// Current presence; synthesizes an offline record for unknown users.
    pub async fn get(&self, user_id: &UserId) -> UserPresence {
        self.records
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserPresence::offline(user_id.clone()))
    }
}
