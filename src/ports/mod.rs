//! Ports - trait seams between the core and its external collaborators.
//!
//! The realtime core and the HTTP surface depend only on these traits;
//! adapters provide SQLite, in-memory and token-minting implementations.

mod auth_provider;
mod channel_store;
mod conversation_store;
mod file_store;
mod membership_reader;
mod message_store;
mod server_store;
mod voice_tokens;

pub use auth_provider::{AuthProvider, AuthenticatedUser};
pub use channel_store::ChannelStore;
pub use conversation_store::{ConversationStore, ConversationView};
pub use file_store::FileStore;
pub use membership_reader::MembershipReader;
pub use message_store::{MessageStore, OrphanedAttachment};
pub use server_store::{MemberProfile, ServerStore};
pub use voice_tokens::{VoiceGrant, VoiceTokenIssuer};
