//! Invite code value object.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ServerId, Timestamp, UserId};

/// A capability string resolving to a server, optionally use-limited and
/// time-bound. Consumption is atomic in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub code: String,
    pub server_id: ServerId,
    pub created_by: UserId,
    /// `None` means unlimited uses.
    pub uses_remaining: Option<i64>,
    /// `None` means the code never expires.
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Invite {
    /// Whether the code can still be redeemed at `now`.
    pub fn is_redeemable(&self, now: Timestamp) -> bool {
        if let Some(expires) = self.expires_at {
            if expires <= now {
                return false;
            }
        }
        match self.uses_remaining {
            Some(n) => n > 0,
            None => true,
        }
    }
}
