//! Realtime websocket layer - gateway, registry, presence, broadcast and
//! event handlers.

pub mod broadcast;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod presence;
pub mod registry;

pub use broadcast::{BroadcastRouter, Scope};
pub use events::{ClientEvent, ServerEvent};
pub use gateway::{spawn_heartbeat, ws_handler, Gateway};
pub use handlers::{DropReason, EventService};
pub use presence::PresenceTracker;
pub use registry::{ConnectionHandle, ConnectionRegistry, OutboundFrame};
