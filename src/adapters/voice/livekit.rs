//! LiveKit implementation of VoiceTokenIssuer.
//!
//! Mints an HS256 access token in the shape the LiveKit server expects:
//! the API key as issuer, the joining identity as subject, and a `video`
//! grant naming the room. The room name is the voice channel id.

use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::config::VoiceConfig;
use crate::domain::foundation::{ChannelId, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{VoiceGrant, VoiceTokenIssuer};

#[derive(Serialize)]
struct VideoGrant<'a> {
    room: &'a str,
    #[serde(rename = "roomJoin")]
    room_join: bool,
    #[serde(rename = "canPublish")]
    can_publish: bool,
    #[serde(rename = "canSubscribe")]
    can_subscribe: bool,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    sub: &'a str,
    name: &'a str,
    nbf: i64,
    exp: i64,
    video: VideoGrant<'a>,
}

/// Issues LiveKit room access tokens.
#[derive(Clone)]
pub struct LiveKitTokenIssuer {
    config: VoiceConfig,
}

impl LiveKitTokenIssuer {
    pub fn new(config: VoiceConfig) -> Self {
        Self { config }
    }
}

impl VoiceTokenIssuer for LiveKitTokenIssuer {
    fn issue(
        &self,
        channel_id: &ChannelId,
        identity: &UserId,
        name: &str,
    ) -> Result<VoiceGrant, DomainError> {
        let now = Timestamp::now();
        let claims = Claims {
            iss: &self.config.api_key,
            sub: identity.as_str(),
            name,
            nbf: now.as_unix(),
            exp: now.plus_secs(self.config.token_ttl_secs as i64).as_unix(),
            video: VideoGrant {
                room: channel_id.as_str(),
                room_join: true,
                can_publish: true,
                can_subscribe: true,
            },
        };

        let key = EncodingKey::from_secret(self.config.api_secret.expose_secret().as_bytes());
        let token = encode(&Header::default(), &claims, &key).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Failed to sign voice grant: {}", e),
            )
        })?;

        Ok(VoiceGrant {
            token,
            url: self.config.url.clone(),
        })
    }
}
