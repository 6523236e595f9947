//! Foundation types shared across the domain: identifiers, timestamps
//! and error taxonomy.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{
    AttachmentId, ChannelId, ConnectionId, ConversationId, MessageId, ServerId, UserId,
};
pub use timestamp::Timestamp;
