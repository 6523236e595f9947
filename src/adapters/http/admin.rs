//! Moderation routes - thin wrappers over the moderation service, which
//! owns the admin checks and the realtime fan-out.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MessageId, ServerId, Timestamp, UserId};

use super::error::ApiError;
use super::middleware::RequireAuth;
use super::AppState;

/// Routes:
/// - `POST   /servers/:id/members/:uid/ban`
/// - `POST   /servers/:id/members/:uid/timeout`
/// - `POST   /servers/:id/members/:uid/promote`
/// - `POST   /servers/:id/members/:uid/demote`
/// - `DELETE /messages/:id`
/// - `PATCH  /messages/:id/lock`
/// - `POST   /servers/:id/purge`
/// - `PATCH  /servers/:id/purge-settings`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/servers/:server_id/members/:user_id/ban", post(ban_member))
        .route("/servers/:server_id/members/:user_id/timeout", post(timeout_member))
        .route("/servers/:server_id/members/:user_id/promote", post(promote_member))
        .route("/servers/:server_id/members/:user_id/demote", post(demote_member))
        .route("/messages/:message_id", delete(delete_message))
        .route("/messages/:message_id/lock", patch(set_message_lock))
        .route("/servers/:server_id/purge", post(purge_now))
        .route("/servers/:server_id/purge-settings", patch(set_purge_settings))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimeoutResponse {
    timeout_until: Timestamp,
}

#[derive(Debug, Deserialize)]
struct LockRequest {
    locked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurgeSettingsRequest {
    purge_after_days: i64,
}

async fn ban_member(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((server_id, target)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .moderation
        .ban(&user.user_id, &ServerId::new(server_id), &UserId::new(target))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn timeout_member(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((server_id, target)): Path<(String, String)>,
) -> Result<Json<TimeoutResponse>, ApiError> {
    let until = state
        .moderation
        .timeout(&user.user_id, &ServerId::new(server_id), &UserId::new(target))
        .await?;
    Ok(Json(TimeoutResponse { timeout_until: until }))
}

async fn promote_member(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((server_id, target)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .moderation
        .promote(&user.user_id, &ServerId::new(server_id), &UserId::new(target))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn demote_member(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((server_id, target)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .moderation
        .demote(&user.user_id, &ServerId::new(server_id), &UserId::new(target))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_message(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(message_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .moderation
        .delete_message(&user.user_id, &MessageId::new(message_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_message_lock(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(message_id): Path<String>,
    Json(request): Json<LockRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .moderation
        .set_message_locked(&user.user_id, &MessageId::new(message_id), request.locked)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn purge_now(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(server_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .moderation
        .purge_now(&user.user_id, &ServerId::new(server_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_purge_settings(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(server_id): Path<String>,
    Json(request): Json<PurgeSettingsRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .moderation
        .set_purge_after_days(
            &user.user_id,
            &ServerId::new(server_id),
            request.purge_after_days,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
