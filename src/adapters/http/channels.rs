//! Channel routes. Creation and deletion go through the moderation
//! service so admin checks and realtime fan-out match the gateway's.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;

use crate::domain::chat::{Channel, ChannelKind};
use crate::domain::foundation::{ChannelId, ServerId};

use super::error::ApiError;
use super::middleware::RequireAuth;
use super::servers::require_member;
use super::AppState;

/// Routes:
/// - `GET    /servers/:id/channels`   list channels (members only)
/// - `POST   /servers/:id/channels`   create a channel (admins only)
/// - `DELETE /channels/:id`           delete a channel (admins only)
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/servers/:server_id/channels",
            get(list_channels).post(create_channel),
        )
        .route("/channels/:channel_id", delete(delete_channel))
}

#[derive(Debug, Deserialize)]
struct CreateChannelRequest {
    name: String,
    #[serde(default = "default_kind")]
    kind: ChannelKind,
}

fn default_kind() -> ChannelKind {
    ChannelKind::Text
}

async fn list_channels(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(server_id): Path<String>,
) -> Result<Json<Vec<Channel>>, ApiError> {
    let server_id = ServerId::new(server_id);
    require_member(&state, &user.user_id, &server_id).await?;
    Ok(Json(state.channels.channels_for_server(&server_id).await?))
}

async fn create_channel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(server_id): Path<String>,
    Json(request): Json<CreateChannelRequest>,
) -> Result<(StatusCode, Json<Channel>), ApiError> {
    let server_id = ServerId::new(server_id);
    let channel = state
        .moderation
        .create_channel(&user.user_id, &server_id, &request.name, request.kind)
        .await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

async fn delete_channel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(channel_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let channel_id = ChannelId::new(channel_id);
    state
        .moderation
        .delete_channel(&user.user_id, &channel_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
