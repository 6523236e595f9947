//! Chat domain: servers, channels, messages, conversations, presence.

mod channel;
mod invite;
mod member;
mod message;
mod presence;
mod server;

pub use channel::{validate_name, Channel, ChannelKind};
pub use invite::Invite;
pub use member::{Membership, PublicUser, Role};
pub use message::{Attachment, DirectMessage, Message, MessageDraft};
pub use presence::{PresenceStatus, UserPresence};
pub use server::ChatServer;
