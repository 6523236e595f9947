//! VoiceTokenIssuer port - capability strings for the external media
//! transport.
//!
//! The core never carries media; it only mints a signed grant naming the
//! room (the voice channel id) and the joining identity.

use crate::domain::foundation::{ChannelId, DomainError, UserId};

/// A signed voice room grant plus the media server URL to present it to.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceGrant {
    pub token: String,
    pub url: String,
}

/// Mints voice room grants.
pub trait VoiceTokenIssuer: Send + Sync {
    /// Issues a grant letting `identity` (displayed as `name`) join the
    /// room for `channel_id`.
    fn issue(
        &self,
        channel_id: &ChannelId,
        identity: &UserId,
        name: &str,
    ) -> Result<VoiceGrant, DomainError>;
}
