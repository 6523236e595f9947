//! Wire envelope for the realtime protocol.
//!
//! Every frame in either direction is `{"event": string, "data": object}`.
//! Inbound frames that fail to deserialize are dropped by the gateway.

use serde::{Deserialize, Serialize};

use crate::domain::chat::{
    Channel, DirectMessage, Message, PresenceStatus, PublicUser, Role,
};
use crate::domain::foundation::{
    AttachmentId, ChannelId, ConversationId, MessageId, ServerId, Timestamp, UserId,
};

/// Client-to-server event frames.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "message:send", rename_all = "camelCase")]
    MessageSend {
        channel_id: ChannelId,
        #[serde(default)]
        content: String,
        #[serde(default)]
        attachment_id: Option<AttachmentId>,
        #[serde(default)]
        gif_url: Option<String>,
    },

    #[serde(rename = "message:typing", rename_all = "camelCase")]
    MessageTyping { channel_id: ChannelId },

    #[serde(rename = "dm:send", rename_all = "camelCase")]
    DmSend {
        conversation_id: ConversationId,
        #[serde(default)]
        content: String,
        #[serde(default)]
        attachment_id: Option<AttachmentId>,
        #[serde(default)]
        gif_url: Option<String>,
    },

    #[serde(rename = "dm:typing", rename_all = "camelCase")]
    DmTyping { conversation_id: ConversationId },

    #[serde(rename = "voice:join", rename_all = "camelCase")]
    VoiceJoin { channel_id: ChannelId },

    #[serde(rename = "voice:leave")]
    VoiceLeave,
}

/// Server-to-client event frames.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "message:new", rename_all = "camelCase")]
    MessageNew { message: Message, author: PublicUser },

    #[serde(rename = "message:typing", rename_all = "camelCase")]
    MessageTyping {
        channel_id: ChannelId,
        user_id: UserId,
        username: String,
    },

    #[serde(rename = "message:deleted", rename_all = "camelCase")]
    MessageDeleted {
        message_id: MessageId,
        channel_id: ChannelId,
    },

    #[serde(rename = "message:locked", rename_all = "camelCase")]
    MessageLocked {
        message_id: MessageId,
        channel_id: ChannelId,
        locked: bool,
    },

    #[serde(rename = "dm:new", rename_all = "camelCase")]
    DmNew {
        conversation_id: ConversationId,
        message: DirectMessage,
        author: PublicUser,
    },

    #[serde(rename = "dm:typing", rename_all = "camelCase")]
    DmTyping {
        conversation_id: ConversationId,
        user_id: UserId,
        username: String,
    },

    #[serde(rename = "presence:update", rename_all = "camelCase")]
    PresenceUpdate {
        user_id: UserId,
        status: PresenceStatus,
        voice_channel_id: Option<ChannelId>,
    },

    #[serde(rename = "member:banned", rename_all = "camelCase")]
    MemberBanned { server_id: ServerId, user_id: UserId },

    #[serde(rename = "member:kicked", rename_all = "camelCase")]
    MemberKicked { server_id: ServerId, reason: String },

    #[serde(rename = "member:timeout", rename_all = "camelCase")]
    MemberTimeout {
        server_id: ServerId,
        user_id: UserId,
        timeout_until: Timestamp,
    },

    #[serde(rename = "member:role-changed", rename_all = "camelCase")]
    MemberRoleChanged {
        server_id: ServerId,
        user_id: UserId,
        role: Role,
    },

    #[serde(rename = "channel:created", rename_all = "camelCase")]
    ChannelCreated { channel: Channel },

    #[serde(rename = "channel:deleted", rename_all = "camelCase")]
    ChannelDeleted {
        channel_id: ChannelId,
        server_id: ServerId,
    },

    /// Reserved in the protocol; the realtime handlers never emit it.
    #[serde(rename = "error", rename_all = "camelCase")]
    Error { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_send_parses_with_optional_fields_absent() {
        let frame = r#"{"event":"message:send","data":{"channelId":"c1","content":"hi"}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        assert_eq!(
            event,
            ClientEvent::MessageSend {
                channel_id: ChannelId::new("c1"),
                content: "hi".to_string(),
                attachment_id: None,
                gif_url: None,
            }
        );
    }

    #[test]
    fn voice_leave_parses_without_data() {
        let event: ClientEvent = serde_json::from_str(r#"{"event":"voice:leave"}"#).unwrap();
        assert_eq!(event, ClientEvent::VoiceLeave);
    }

    #[test]
    fn unknown_event_name_fails_to_parse() {
        assert!(serde_json::from_str::<ClientEvent>(
            r#"{"event":"message:edit","data":{"channelId":"c1"}}"#
        )
        .is_err());
    }

    #[test]
    fn typing_broadcast_serializes_envelope_shape() {
        let event = ServerEvent::MessageTyping {
            channel_id: ChannelId::new("c1"),
            user_id: UserId::new("u1"),
            username: "ada".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "message:typing");
        assert_eq!(json["data"]["channelId"], "c1");
        assert_eq!(json["data"]["username"], "ada");
    }

    #[test]
    fn presence_update_serializes_status_kebab_case() {
        let event = ServerEvent::PresenceUpdate {
            user_id: UserId::new("u1"),
            status: PresenceStatus::InVoice,
            voice_channel_id: Some(ChannelId::new("v1")),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["status"], "in-voice");
        assert_eq!(json["data"]["voiceChannelId"], "v1");
    }
}
