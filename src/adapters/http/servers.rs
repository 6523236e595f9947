//! Server (community) routes: lifecycle, member listing and invites.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::domain::chat::{validate_name, ChatServer, Invite, PublicUser, Role};
use crate::domain::foundation::{DomainError, ErrorCode, ServerId, Timestamp};

use super::error::ApiError;
use super::middleware::RequireAuth;
use super::AppState;

/// Routes:
/// - `POST   /servers`                create a server
/// - `GET    /servers`                list the caller's servers
/// - `GET    /servers/:id`            fetch one server (members only)
/// - `DELETE /servers/:id`            delete a server (owner only)
/// - `GET    /servers/:id/members`    member listing (members only)
/// - `POST   /servers/:id/invites`    mint an invite code (members only)
/// - `POST   /invites/:code/join`     redeem an invite code
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/servers", post(create_server).get(list_servers))
        .route("/servers/:server_id", get(get_server).delete(delete_server))
        .route("/servers/:server_id/members", get(list_members))
        .route("/servers/:server_id/invites", post(create_invite))
        .route("/invites/:code/join", post(join_server))
}

#[derive(Debug, Deserialize)]
struct CreateServerRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInviteRequest {
    /// `None` means unlimited uses.
    max_uses: Option<i64>,
    /// `None` means the code never expires.
    expires_in_secs: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MemberResponse {
    user: PublicUser,
    role: Role,
    joined_at: Timestamp,
}

async fn create_server(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateServerRequest>,
) -> Result<(StatusCode, Json<ChatServer>), ApiError> {
    validate_name("name", &request.name)?;
    let server = state.servers.create_server(&request.name, &user.user_id).await?;
    Ok((StatusCode::CREATED, Json(server)))
}

async fn list_servers(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ChatServer>>, ApiError> {
    Ok(Json(state.servers.servers_for_user(&user.user_id).await?))
}

async fn get_server(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(server_id): Path<String>,
) -> Result<Json<ChatServer>, ApiError> {
    let server_id = ServerId::new(server_id);
    let server = state
        .servers
        .get_server(&server_id)
        .await?
        .ok_or_else(|| DomainError::new(ErrorCode::ServerNotFound, "Server not found"))?;
    require_member(&state, &user.user_id, &server_id).await?;
    Ok(Json(server))
}

async fn delete_server(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(server_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let server_id = ServerId::new(server_id);
    let server = state
        .servers
        .get_server(&server_id)
        .await?
        .ok_or_else(|| DomainError::new(ErrorCode::ServerNotFound, "Server not found"))?;
    if server.owner_id != user.user_id {
        return Err(DomainError::new(
            ErrorCode::Forbidden,
            "Only the owner can delete a server",
        )
        .into());
    }
    state.servers.delete_server(&server_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_members(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(server_id): Path<String>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let server_id = ServerId::new(server_id);
    require_member(&state, &user.user_id, &server_id).await?;
    let members = state
        .servers
        .server_members(&server_id)
        .await?
        .into_iter()
        .map(|m| MemberResponse {
            user: m.user,
            role: m.role,
            joined_at: m.joined_at,
        })
        .collect();
    Ok(Json(members))
}

async fn create_invite(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(server_id): Path<String>,
    Json(request): Json<CreateInviteRequest>,
) -> Result<(StatusCode, Json<Invite>), ApiError> {
    let server_id = ServerId::new(server_id);
    require_member(&state, &user.user_id, &server_id).await?;
    if matches!(request.max_uses, Some(n) if n <= 0) {
        return Err(DomainError::new(
            ErrorCode::ValidationFailed,
            "maxUses must be positive",
        )
        .into());
    }
    if matches!(request.expires_in_secs, Some(n) if n <= 0) {
        return Err(DomainError::new(
            ErrorCode::ValidationFailed,
            "expiresInSecs must be positive",
        )
        .into());
    }
    let expires_at = request
        .expires_in_secs
        .map(|secs| Timestamp::now().plus_secs(secs));
    let invite = state
        .servers
        .create_invite(&server_id, &user.user_id, request.max_uses, expires_at)
        .await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

/// Redeems an invite. Consumption is atomic, so a banned user's attempt
/// still burns a use; bans are checked against the resolved server.
async fn join_server(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(code): Path<String>,
) -> Result<Json<ChatServer>, ApiError> {
    let server_id = state
        .servers
        .consume_invite(&code)
        .await?
        .ok_or_else(|| {
            DomainError::new(ErrorCode::InviteInvalid, "Invite is invalid or expired")
        })?;

    if state.servers.is_banned(&server_id, &user.user_id).await? {
        return Err(
            DomainError::new(ErrorCode::Forbidden, "You are banned from this server").into(),
        );
    }

    state.servers.add_member(&server_id, &user.user_id).await?;
    let server = state
        .servers
        .get_server(&server_id)
        .await?
        .ok_or_else(|| DomainError::new(ErrorCode::ServerNotFound, "Server not found"))?;
    Ok(Json(server))
}

pub(super) async fn require_member(
    state: &AppState,
    user_id: &crate::domain::foundation::UserId,
    server_id: &ServerId,
) -> Result<(), ApiError> {
    if state.membership.is_server_member(user_id, server_id).await? {
        Ok(())
    } else {
        Err(DomainError::new(ErrorCode::Forbidden, "Not a member of this server").into())
    }
}
