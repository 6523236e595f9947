//! Realtime event handlers - validate, persist, broadcast.
//!
//! Every inbound-event failure is a silent drop on the wire; the
//! [`DropReason`] is internal only, for logs and tests. Nothing is ever
//! sent back to the client for a rejected event.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::adapters::websocket::broadcast::{BroadcastRouter, Scope};
use crate::adapters::websocket::events::ServerEvent;
use crate::adapters::websocket::presence::PresenceTracker;
use crate::domain::chat::MessageDraft;
use crate::domain::foundation::{ChannelId, ConversationId, DomainError, UserId};
use crate::ports::{AuthenticatedUser, MembershipReader, MessageStore};

/// Why an inbound event was dropped. Never transmitted to the client.
#[derive(Debug, Error)]
pub enum DropReason {
    #[error("nothing to send")]
    EmptyMessage,

    #[error("target does not exist")]
    MissingTarget,

    #[error("sender is not a member of the server")]
    NotServerMember,

    #[error("sender is not a conversation participant")]
    NotParticipant,

    #[error("sender is timed out")]
    TimedOut,

    #[error(transparent)]
    Store(#[from] DomainError),
}

/// Dispatcher for client-originated realtime events.
pub struct EventService {
    membership: Arc<dyn MembershipReader>,
    messages: Arc<dyn MessageStore>,
    presence: Arc<PresenceTracker>,
    router: Arc<BroadcastRouter>,
}

impl EventService {
    pub fn new(
        membership: Arc<dyn MembershipReader>,
        messages: Arc<dyn MessageStore>,
        presence: Arc<PresenceTracker>,
        router: Arc<BroadcastRouter>,
    ) -> Self {
        Self {
            membership,
            messages,
            presence,
            router,
        }
    }

    /// Validates, persists and broadcasts one channel message.
    ///
    /// The attachment claim is conditional: if another send already linked
    /// the same upload, this message goes out without it rather than
    /// failing entirely.
    pub async fn message_send(
        &self,
        sender: &AuthenticatedUser,
        channel_id: &ChannelId,
        draft: MessageDraft,
    ) -> Result<(), DropReason> {
        if !draft.has_payload() {
            return Err(DropReason::EmptyMessage);
        }

        let server_id = self
            .membership
            .channel_server(channel_id)
            .await?
            .ok_or(DropReason::MissingTarget)?;
        let membership = self
            .membership
            .membership(&sender.user_id, &server_id)
            .await?
            .ok_or(DropReason::NotServerMember)?;
        if membership.is_timed_out() {
            return Err(DropReason::TimedOut);
        }

        let mut message = self
            .messages
            .insert_message(
                channel_id,
                &sender.user_id,
                draft.stored_content(),
                draft.gif_url.as_deref(),
            )
            .await?;

        if let Some(attachment_id) = &draft.attachment_id {
            match self
                .messages
                .claim_attachment_for_message(attachment_id, &message.id)
                .await?
            {
                Some(attachment) => message.attachment = Some(attachment),
                None => {
                    debug!(%attachment_id, message_id = %message.id, "Attachment claim lost, sending without it");
                }
            }
        }

        self.router
            .broadcast(
                &Scope::Channel(channel_id.clone()),
                &ServerEvent::MessageNew {
                    message,
                    author: sender.public(),
                },
                None,
            )
            .await?;
        Ok(())
    }

    /// Rebroadcasts a typing signal to the channel audience minus the
    /// sender. No state is kept server-side; expiry is a client concern.
    pub async fn message_typing(
        &self,
        sender: &AuthenticatedUser,
        channel_id: &ChannelId,
    ) -> Result<(), DropReason> {
        if !self
            .membership
            .is_channel_accessible(&sender.user_id, channel_id)
            .await?
        {
            return Err(DropReason::NotServerMember);
        }

        self.router
            .broadcast(
                &Scope::Channel(channel_id.clone()),
                &ServerEvent::MessageTyping {
                    channel_id: channel_id.clone(),
                    user_id: sender.user_id.clone(),
                    username: sender.username.clone(),
                },
                Some(&sender.user_id),
            )
            .await?;
        Ok(())
    }

    /// Validates, persists and broadcasts one direct message. The sender
    /// is included in the fan-out so their other devices stay in sync.
    pub async fn dm_send(
        &self,
        sender: &AuthenticatedUser,
        conversation_id: &ConversationId,
        draft: MessageDraft,
    ) -> Result<(), DropReason> {
        if !draft.has_payload() {
            return Err(DropReason::EmptyMessage);
        }

        if !self
            .membership
            .is_conversation_participant(&sender.user_id, conversation_id)
            .await?
        {
            return Err(DropReason::NotParticipant);
        }

        let mut message = self
            .messages
            .insert_direct_message(
                conversation_id,
                &sender.user_id,
                draft.stored_content(),
                draft.gif_url.as_deref(),
            )
            .await?;

        if let Some(attachment_id) = &draft.attachment_id {
            match self
                .messages
                .claim_attachment_for_dm(attachment_id, &message.id)
                .await?
            {
                Some(attachment) => message.attachment = Some(attachment),
                None => {
                    debug!(%attachment_id, message_id = %message.id, "Attachment claim lost, sending without it");
                }
            }
        }

        self.router
            .broadcast(
                &Scope::Conversation(conversation_id.clone()),
                &ServerEvent::DmNew {
                    conversation_id: conversation_id.clone(),
                    message,
                    author: sender.public(),
                },
                None,
            )
            .await?;
        Ok(())
    }

    /// Rebroadcasts a conversation typing signal minus the sender.
    pub async fn dm_typing(
        &self,
        sender: &AuthenticatedUser,
        conversation_id: &ConversationId,
    ) -> Result<(), DropReason> {
        if !self
            .membership
            .is_conversation_participant(&sender.user_id, conversation_id)
            .await?
        {
            return Err(DropReason::NotParticipant);
        }

        self.router
            .broadcast(
                &Scope::Conversation(conversation_id.clone()),
                &ServerEvent::DmTyping {
                    conversation_id: conversation_id.clone(),
                    user_id: sender.user_id.clone(),
                    username: sender.username.clone(),
                },
                Some(&sender.user_id),
            )
            .await?;
        Ok(())
    }

    /// Flips presence to in-voice and announces it to the user's peers.
    pub async fn voice_join(
        &self,
        sender: &AuthenticatedUser,
        channel_id: &ChannelId,
    ) -> Result<(), DropReason> {
        if !self
            .membership
            .is_channel_accessible(&sender.user_id, channel_id)
            .await?
        {
            return Err(DropReason::NotServerMember);
        }

        self.presence.set_in_voice(&sender.user_id, channel_id).await;
        self.announce_presence(&sender.user_id).await?;
        Ok(())
    }

    /// Drops voice state back to online and announces it.
    pub async fn voice_leave(&self, sender: &AuthenticatedUser) -> Result<(), DropReason> {
        self.presence.leave_voice(&sender.user_id).await;
        self.announce_presence(&sender.user_id).await?;
        Ok(())
    }

    /// Pushes the user's current presence to self and all co-members.
    pub async fn announce_presence(&self, user_id: &UserId) -> Result<(), DomainError> {
        let presence = self.presence.get(user_id).await;
        self.router
            .broadcast_presence(
                user_id,
                &ServerEvent::PresenceUpdate {
                    user_id: user_id.clone(),
                    status: presence.status,
                    voice_channel_id: presence.voice_channel_id,
                },
            )
            .await
    }
}
