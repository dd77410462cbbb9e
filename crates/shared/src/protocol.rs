use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{DeliveryStatus, MessageId, UserId},
    error::ApiError,
};

/// Account profile as returned by the auth endpoints and the contact list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub email: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_logout: Option<DateTime<Utc>>,
    #[serde(default)]
    pub login_count: i64,
    #[serde(default)]
    pub messages_sent: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Partial profile update; absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
}

/// Outgoing message body. At least one of `text`/`image` must be present;
/// `image` is a data URI produced by the composer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// One stored message in a one-to-one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
}

impl MessagePayload {
    /// True when the message belongs to the conversation between `a` and `b`,
    /// in either direction.
    pub fn is_between(&self, a: UserId, b: UserId) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

/// Events delivered over the session WebSocket stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage {
        message: MessagePayload,
    },
    MessageDeleted {
        message_id: MessageId,
    },
    OnlineUsers {
        user_ids: Vec<UserId>,
    },
    Error(ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: i64, receiver: i64) -> MessagePayload {
        MessagePayload {
            message_id: MessageId(1),
            sender_id: UserId(sender),
            receiver_id: UserId(receiver),
            text: Some("hi".to_string()),
            image: None,
            status: DeliveryStatus::Sent,
            created_at: "2024-06-01T12:00:00Z".parse().expect("timestamp"),
        }
    }

    #[test]
    fn server_events_use_tagged_snake_case_encoding() {
        let encoded = serde_json::to_value(ServerEvent::MessageDeleted {
            message_id: MessageId(7),
        })
        .expect("encode");

        assert_eq!(encoded["type"], "message_deleted");
        assert_eq!(encoded["payload"]["message_id"], 7);
    }

    #[test]
    fn delivery_status_defaults_to_sent_when_absent() {
        let decoded: MessagePayload = serde_json::from_value(serde_json::json!({
            "message_id": 3,
            "sender_id": 1,
            "receiver_id": 2,
            "text": "hello",
            "created_at": "2024-06-01T12:00:00Z",
        }))
        .expect("decode");

        assert_eq!(decoded.status, DeliveryStatus::Sent);
        assert!(decoded.image.is_none());
    }

    #[test]
    fn message_direction_is_symmetric_between_participants() {
        let msg = message(1, 2);
        assert!(msg.is_between(UserId(1), UserId(2)));
        assert!(msg.is_between(UserId(2), UserId(1)));
        assert!(!msg.is_between(UserId(1), UserId(3)));
    }
}
