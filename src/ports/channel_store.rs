//! ChannelStore port - channel lifecycle within a server.

use async_trait::async_trait;

use crate::domain::chat::{Channel, ChannelKind};
use crate::domain::foundation::{ChannelId, DomainError, ServerId};

/// Writes and reads for channels.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Channels of a server, oldest-first.
    async fn channels_for_server(
        &self,
        server_id: &ServerId,
    ) -> Result<Vec<Channel>, DomainError>;

    /// One channel, if it exists.
    async fn get_channel(&self, channel_id: &ChannelId) -> Result<Option<Channel>, DomainError>;

    /// Creates a channel.
    async fn create_channel(
        &self,
        server_id: &ServerId,
        name: &str,
        kind: ChannelKind,
    ) -> Result<Channel, DomainError>;

    /// Deletes a channel and its messages.
    async fn delete_channel(&self, channel_id: &ChannelId) -> Result<(), DomainError>;

    /// Number of text channels remaining in a server.
    async fn text_channel_count(&self, server_id: &ServerId) -> Result<i64, DomainError>;
}
