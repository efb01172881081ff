// src/models/message.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    #[serde(default)]
    pub sender_name: Option<String>,
    pub recipient_id: Uuid,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// Order-independent key shared by both directions of a conversation.
    pub fn conversation_key(&self) -> String {
        conversation_key(self.sender_id, self.recipient_id)
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }
}

pub fn conversation_key(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{}_{}", lo, hi)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub recipient_id: Uuid,
    #[validate(length(max = 200, message = "Subject is too long."))]
    pub subject: Option<String>,
    #[validate(length(min = 1, message = "Message content is required."))]
    pub content: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MessageListQuery {
    /// Only messages newer than this instant, for polling clients.
    pub since: Option<DateTime<Utc>>,
    /// Restrict to the conversation with this user.
    pub with: Option<Uuid>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub key: String,
    pub other_user_id: Uuid,
    pub other_user_name: Option<String>,
    pub last_message: Message,
    pub unread_count: usize,
    pub message_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_key_ignores_direction() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(conversation_key(a, b), conversation_key(b, a));
        assert_ne!(conversation_key(a, b), conversation_key(a, Uuid::new_v4()));
    }
}
