//! Voice grant route. The media itself never touches this server; the
//! route only mints a signed room grant for an accessible voice channel.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::domain::chat::ChannelKind;
use crate::domain::foundation::{ChannelId, DomainError, ErrorCode};

use super::error::ApiError;
use super::middleware::RequireAuth;
use super::AppState;

/// Routes:
/// - `POST /voice/token`  mint a voice room grant (channel members only)
pub fn router() -> Router<AppState> {
    Router::new().route("/voice/token", post(issue_token))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoiceTokenRequest {
    channel_id: String,
}

#[derive(Debug, Serialize)]
struct VoiceTokenResponse {
    token: String,
    url: String,
}

async fn issue_token(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<VoiceTokenRequest>,
) -> Result<Json<VoiceTokenResponse>, ApiError> {
    let channel_id = ChannelId::new(request.channel_id);
    let channel = state
        .channels
        .get_channel(&channel_id)
        .await?
        .ok_or_else(|| DomainError::new(ErrorCode::ChannelNotFound, "Channel not found"))?;
    if channel.kind != ChannelKind::Voice {
        return Err(
            DomainError::new(ErrorCode::ValidationFailed, "Not a voice channel").into(),
        );
    }
    if !state
        .membership
        .is_channel_accessible(&user.user_id, &channel_id)
        .await?
    {
        return Err(DomainError::new(ErrorCode::Forbidden, "Not a member of this server").into());
    }

    let grant = state
        .voice
        .issue(&channel_id, &user.user_id, &user.username)?;
    Ok(Json(VoiceTokenResponse {
        token: grant.token,
        url: grant.url,
    }))
}
