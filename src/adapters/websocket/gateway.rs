//! Realtime gateway - websocket upgrade, handshake, connection lifecycle.
//!
//! A connection authenticates once at upgrade time via a `?token=` query
//! parameter. After registration it receives pushed broadcasts and sends
//! `{event, data}` frames; malformed or unauthorized frames are dropped
//! without any reply. Liveness is a single periodic sweep over all
//! connections rather than a timer per socket.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::adapters::websocket::broadcast::BroadcastRouter;
use crate::adapters::websocket::events::{ClientEvent, ServerEvent};
use crate::adapters::websocket::handlers::EventService;
use crate::adapters::websocket::presence::PresenceTracker;
use crate::adapters::websocket::registry::{
    ConnectionHandle, ConnectionRegistry, OutboundFrame,
};
use crate::domain::chat::{MessageDraft, PresenceStatus};
use crate::domain::foundation::{ConnectionId, DomainError, UserId};
use crate::ports::{AuthProvider, AuthenticatedUser, MembershipReader};

/// Close code when the client supplied no credential.
pub const CLOSE_MISSING_TOKEN: u16 = 4001;
/// Close code when the supplied credential did not resolve to a session.
pub const CLOSE_INVALID_TOKEN: u16 = 4002;

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    token: Option<String>,
}

/// Owns the realtime side: registry, presence, router and handlers.
pub struct Gateway {
    auth: Arc<dyn AuthProvider>,
    membership: Arc<dyn MembershipReader>,
    registry: Arc<ConnectionRegistry>,
    presence: Arc<PresenceTracker>,
    router: Arc<BroadcastRouter>,
    events: Arc<EventService>,
}

impl Gateway {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        membership: Arc<dyn MembershipReader>,
        registry: Arc<ConnectionRegistry>,
        presence: Arc<PresenceTracker>,
        router: Arc<BroadcastRouter>,
        events: Arc<EventService>,
    ) -> Self {
        Self {
            auth,
            membership,
            registry,
            presence,
            router,
            events,
        }
    }

    /// The broadcast router, shared with the HTTP moderation side.
    pub fn router(&self) -> Arc<BroadcastRouter> {
        Arc::clone(&self.router)
    }

    /// Presence frames a freshly registered client needs to paint correct
    /// state: one `presence:update` per non-offline co-member.
    async fn initial_presence_sync(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ServerEvent>, DomainError> {
        let mut frames = Vec::new();
        for peer in self.membership.co_member_ids(user_id).await? {
            let presence = self.presence.get(&peer).await;
            if presence.status != PresenceStatus::Offline {
                frames.push(ServerEvent::PresenceUpdate {
                    user_id: peer,
                    status: presence.status,
                    voice_channel_id: presence.voice_channel_id,
                });
            }
        }
        Ok(frames)
    }

    async fn handle_socket(self: Arc<Self>, socket: WebSocket, token: Option<String>) {
        let Some(token) = token else {
            close_with(socket, CLOSE_MISSING_TOKEN, "missing token").await;
            return;
        };

        let user = match self.auth.authenticate(&token).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                close_with(socket, CLOSE_INVALID_TOKEN, "invalid token").await;
                return;
            }
            Err(e) => {
                warn!(error = %e, "Authentication lookup failed");
                close_with(socket, 1011, "internal error").await;
                return;
            }
        };

        let (mut ws_tx, mut ws_rx) = socket.split();
        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(frame_tx);
        let connection_id = ConnectionId::new();

        // Writer task: drains queued frames onto the socket. Exits on the
        // close frame or when every sender is gone.
        let writer = tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                match frame {
                    OutboundFrame::Event(json) => {
                        if ws_tx.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    OutboundFrame::Ping => {
                        if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                            break;
                        }
                    }
                    OutboundFrame::Close { code, reason } => {
                        let _ = ws_tx
                            .send(Message::Close(Some(CloseFrame {
                                code,
                                reason: reason.into(),
                            })))
                            .await;
                        break;
                    }
                }
            }
        });

        let first = self
            .registry
            .register(&user.user_id, connection_id, handle.clone())
            .await;
        info!(user_id = %user.user_id, %connection_id, first, "Connection registered");

        if first {
            self.presence.set_online(&user.user_id).await;
            if let Err(e) = self.events.announce_presence(&user.user_id).await {
                warn!(error = %e, "Failed to broadcast online presence");
            }
        }

        match self.initial_presence_sync(&user.user_id).await {
            Ok(frames) => {
                for event in frames {
                    if let Ok(json) = serde_json::to_string(&event) {
                        handle.send(OutboundFrame::Event(json));
                    }
                }
            }
            Err(e) => warn!(error = %e, "Initial presence sync failed"),
        }

        // The close signal races the socket: a half-open peer never sends
        // another frame, so termination must not wait on `ws_rx`.
        loop {
            tokio::select! {
                message = ws_rx.next() => {
                    let Some(message) = message else { break };
                    match message {
                        Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => self.dispatch(&user, event).await,
                            Err(_) => debug!(user_id = %user.user_id, "Dropped malformed frame"),
                        },
                        Ok(Message::Pong(_)) => handle.mark_alive(),
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }
                _ = handle.closed() => break,
            }
        }

        let last = self.registry.deregister(&user.user_id, &connection_id).await;
        info!(user_id = %user.user_id, %connection_id, last, "Connection closed");
        if last {
            self.presence.set_offline(&user.user_id).await;
            if let Err(e) = self.events.announce_presence(&user.user_id).await {
                warn!(error = %e, "Failed to broadcast offline presence");
            }
        }

        drop(handle);
        let _ = writer.await;
    }

    /// Routes one inbound event to its handler. Every failure is a silent
    /// drop on the wire; the reason only reaches the logs.
    async fn dispatch(&self, user: &AuthenticatedUser, event: ClientEvent) {
        let result = match event {
            ClientEvent::MessageSend {
                channel_id,
                content,
                attachment_id,
                gif_url,
            } => {
                self.events
                    .message_send(
                        user,
                        &channel_id,
                        MessageDraft {
                            content,
                            attachment_id,
                            gif_url,
                        },
                    )
                    .await
            }
            ClientEvent::MessageTyping { channel_id } => {
                self.events.message_typing(user, &channel_id).await
            }
            ClientEvent::DmSend {
                conversation_id,
                content,
                attachment_id,
                gif_url,
            } => {
                self.events
                    .dm_send(
                        user,
                        &conversation_id,
                        MessageDraft {
                            content,
                            attachment_id,
                            gif_url,
                        },
                    )
                    .await
            }
            ClientEvent::DmTyping { conversation_id } => {
                self.events.dm_typing(user, &conversation_id).await
            }
            ClientEvent::VoiceJoin { channel_id } => {
                self.events.voice_join(user, &channel_id).await
            }
            ClientEvent::VoiceLeave => self.events.voice_leave(user).await,
        };

        if let Err(reason) = result {
            debug!(user_id = %user.user_id, %reason, "Dropped inbound event");
        }
    }
}

async fn close_with(mut socket: WebSocket, code: u16, reason: &str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await;
}

/// Axum handler for `GET /ws`.
pub async fn ws_handler(
    State(gateway): State<Arc<Gateway>>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| gateway.handle_socket(socket, params.token))
}

/// Spawns the periodic liveness sweep.
pub fn spawn_heartbeat(
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick of tokio's interval fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            registry.heartbeat_tick().await;
        }
    })
}
