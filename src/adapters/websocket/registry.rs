//! Connection registry - per-user sets of live websocket connections.
//!
//! One user may hold many connections (multiple devices or tabs). The
//! registry owns nothing about the socket itself; each entry is a handle
//! carrying the outbound frame sender, the heartbeat liveness flag and
//! the close signal that wakes the reader task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::{Notify, RwLock};
use tracing::debug;

use crate::domain::foundation::{ConnectionId, UserId};

/// A frame queued for one connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// A serialized `{event, data}` envelope.
    Event(String),
    /// Heartbeat ping; the writer maps it to a transport-level ping.
    Ping,
    /// Orderly close; the writer shuts the socket and exits.
    Close { code: u16, reason: String },
}

/// Handle to one live connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    sender: mpsc::UnboundedSender<OutboundFrame>,
    alive: Arc<AtomicBool>,
    closed: Arc<Notify>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self {
            sender,
            alive: Arc::new(AtomicBool::new(true)),
            closed: Arc::new(Notify::new()),
        }
    }

    /// Queues a frame; a full/closed writer just means the connection is
    /// on its way out, so failures are ignored.
    pub fn send(&self, frame: OutboundFrame) {
        let _ = self.sender.send(frame);
    }

    /// Marks the connection alive; called on every pong.
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::SeqCst);
    }

    /// Queues an orderly close and wakes the reader. A dead peer never
    /// answers the close frame, so the reader must not wait on the socket
    /// to learn that the connection is over.
    pub fn close(&self, code: u16, reason: impl Into<String>) {
        self.send(OutboundFrame::Close {
            code,
            reason: reason.into(),
        });
        // notify_one stores a permit, so a close that lands before the
        // reader awaits is not lost.
        self.closed.notify_one();
    }

    /// Resolves once the connection has been told to close.
    pub async fn closed(&self) {
        self.closed.notified().await;
    }

    fn take_alive(&self) -> bool {
        self.alive.swap(false, Ordering::SeqCst)
    }
}

/// Process-wide map of user id to live connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, HashMap<ConnectionId, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection. Returns true when this is the user's first live
    /// connection (the caller flips presence to online on that edge).
    pub async fn register(
        &self,
        user_id: &UserId,
        connection_id: ConnectionId,
        handle: ConnectionHandle,
    ) -> bool {
        let mut map = self.connections.write().await;
        let set = map.entry(user_id.clone()).or_default();
        let first = set.is_empty();
        set.insert(connection_id, handle);
        first
    }

    /// Removes a connection. Returns true when the user has no connections
    /// left (the caller flips presence to offline on that edge).
    pub async fn deregister(&self, user_id: &UserId, connection_id: &ConnectionId) -> bool {
        let mut map = self.connections.write().await;
        let Some(set) = map.get_mut(user_id) else {
            return false;
        };
        set.remove(connection_id);
        if set.is_empty() {
            map.remove(user_id);
            true
        } else {
            false
        }
    }

    /// Number of live connections for one user.
    pub async fn connection_count(&self, user_id: &UserId) -> usize {
        self.connections
            .read()
            .await
            .get(user_id)
            .map(|set| set.len())
            .unwrap_or(0)
    }

    /// Queues a frame on every connection of one user.
    pub async fn send_to_user(&self, user_id: &UserId, frame: &OutboundFrame) {
        let map = self.connections.read().await;
        if let Some(set) = map.get(user_id) {
            for handle in set.values() {
                handle.send(frame.clone());
            }
        }
    }

    /// One heartbeat tick: connections that ponged since the previous tick
    /// get a fresh ping; the rest are terminated. Termination queues a
    /// close frame and wakes the reader, so deregistration and the offline
    /// broadcast run immediately even when the peer's TCP side is gone.
    pub async fn heartbeat_tick(&self) {
        let map = self.connections.read().await;
        for (user_id, set) in map.iter() {
            for (connection_id, handle) in set.iter() {
                if handle.take_alive() {
                    handle.send(OutboundFrame::Ping);
                } else {
                    debug!(%user_id, %connection_id, "Terminating unresponsive connection");
                    handle.close(1001, "heartbeat timeout");
                }
            }
        }
    }
}
