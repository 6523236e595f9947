//! Service entrypoint: configuration, storage, realtime gateway and HTTP
//! wiring.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hearth::adapters::http::{api_router, AppState, AuthState};
use hearth::adapters::sqlite::{
    init_pool, SqliteChannelStore, SqliteConversationStore, SqliteMembershipReader,
    SqliteMessageStore, SqliteServerStore, SqliteSessionAuth,
};
use hearth::adapters::storage::LocalFileStore;
use hearth::adapters::voice::LiveKitTokenIssuer;
use hearth::adapters::websocket::{
    spawn_heartbeat, ws_handler, BroadcastRouter, ConnectionRegistry, EventService, Gateway,
    PresenceTracker,
};
use hearth::application::{spawn_orphan_sweep, ModerationService};
use hearth::config::AppConfig;
use hearth::ports::{
    ChannelStore, ConversationStore, FileStore, MembershipReader, MessageStore, ServerStore,
    VoiceTokenIssuer,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    let pool = init_pool(&config.database).await?;
    info!(url = %config.database.url, "Database ready");

    let membership: Arc<dyn MembershipReader> = Arc::new(SqliteMembershipReader::new(pool.clone()));
    let servers: Arc<dyn ServerStore> = Arc::new(SqliteServerStore::new(pool.clone()));
    let channels: Arc<dyn ChannelStore> = Arc::new(SqliteChannelStore::new(pool.clone()));
    let messages: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::new(pool.clone()));
    let conversations: Arc<dyn ConversationStore> =
        Arc::new(SqliteConversationStore::new(pool.clone()));
    let files: Arc<dyn FileStore> = Arc::new(LocalFileStore::new("data/uploads"));
    let voice: Arc<dyn VoiceTokenIssuer> =
        Arc::new(LiveKitTokenIssuer::new(config.voice.clone()));
    let auth: AuthState = Arc::new(SqliteSessionAuth::new(pool.clone()));

    let registry = Arc::new(ConnectionRegistry::new());
    let presence = Arc::new(PresenceTracker::new());
    let router = Arc::new(BroadcastRouter::new(
        Arc::clone(&membership),
        Arc::clone(&registry),
    ));
    let events = Arc::new(EventService::new(
        Arc::clone(&membership),
        Arc::clone(&messages),
        Arc::clone(&presence),
        Arc::clone(&router),
    ));
    let gateway = Arc::new(Gateway::new(
        Arc::clone(&auth),
        Arc::clone(&membership),
        Arc::clone(&registry),
        Arc::clone(&presence),
        Arc::clone(&router),
        events,
    ));
    let moderation = Arc::new(ModerationService::new(
        Arc::clone(&membership),
        Arc::clone(&servers),
        Arc::clone(&channels),
        Arc::clone(&messages),
        Arc::clone(&files),
        gateway.router(),
    ));

    spawn_heartbeat(Arc::clone(&registry), config.gateway.heartbeat_interval());
    spawn_orphan_sweep(
        Arc::clone(&messages),
        Arc::clone(&files),
        Duration::from_secs(config.gateway.orphan_attachment_ttl_secs),
        config.gateway.orphan_sweep_interval(),
    );

    let state = AppState {
        membership,
        servers,
        channels,
        messages,
        conversations,
        voice,
        moderation,
    };

    let app = api_router(state, auth)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        // The websocket route sits outside the request timeout.
        .merge(Router::new().route("/ws", get(ws_handler)).with_state(gateway))
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = config.server.cors_origins_list();
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
