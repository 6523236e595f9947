//! HTTP surface - REST routes over the same ports the realtime gateway
//! uses.
//!
//! Every route requires a bearer token except where noted; the auth
//! middleware resolves it once and handlers pick the identity up through
//! [`RequireAuth`]. Realtime side effects (channel lifecycle, moderation)
//! go through the application services so the broadcast behaviour is the
//! same no matter which surface triggered it.

pub mod error;
pub mod middleware;

mod admin;
mod channels;
mod conversations;
mod messages;
mod servers;
mod voice;

use std::sync::Arc;

use axum::Router;

use crate::application::ModerationService;
use crate::ports::{
    ChannelStore, ConversationStore, MembershipReader, MessageStore, ServerStore,
    VoiceTokenIssuer,
};

pub use error::ApiError;
pub use middleware::auth::AuthState;
pub use middleware::{auth_middleware, RequireAuth};

/// Shared handler state: the ports plus the moderation service.
#[derive(Clone)]
pub struct AppState {
    pub membership: Arc<dyn MembershipReader>,
    pub servers: Arc<dyn ServerStore>,
    pub channels: Arc<dyn ChannelStore>,
    pub messages: Arc<dyn MessageStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub voice: Arc<dyn VoiceTokenIssuer>,
    pub moderation: Arc<ModerationService>,
}

/// Assembles the `/api` router with the auth middleware applied.
pub fn api_router(state: AppState, auth: AuthState) -> Router {
    Router::new()
        .nest("/api", resource_routes())
        .layer(axum::middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state)
}

fn resource_routes() -> Router<AppState> {
    Router::new()
        .merge(servers::router())
        .merge(channels::router())
        .merge(messages::router())
        .merge(conversations::router())
        .merge(admin::router())
        .merge(voice::router())
}
