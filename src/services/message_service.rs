// src/services/message_service.rs

use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{MessageRepository, UserDirectory},
    models::{
        message::{Conversation, Message, MessageListQuery, SendMessagePayload, UnreadCount},
        user::UserRecord,
    },
};

#[derive(Clone)]
pub struct MessageService {
    messages: MessageRepository,
    users: UserDirectory,
}

impl MessageService {
    pub fn new(messages: MessageRepository, users: UserDirectory) -> Self {
        Self { messages, users }
    }

    pub async fn send(&self, sender: &UserRecord, payload: &SendMessagePayload) -> Result<Message, AppError> {
        if payload.recipient_id == sender.id {
            return Err(AppError::bad_request("You cannot send a message to yourself"));
        }
        let recipient = self
            .users
            .find_person(payload.recipient_id)
            .await?
            .ok_or_else(|| AppError::not_found("Recipient not found"))?;

        let message = Message {
            id: Uuid::new_v4(),
            sender_id: sender.id,
            sender_name: sender.display_name(),
            recipient_id: recipient.id,
            recipient_name: recipient.display_name(),
            subject: payload.subject.clone().filter(|s| !s.trim().is_empty()),
            content: payload.content.clone(),
            timestamp: Utc::now(),
            read: false,
        };
        self.messages.insert(&message).await?;
        tracing::debug!("Message {} from {} to {}", message.id, message.sender_id, message.recipient_id);
        Ok(message)
    }

    async fn mailbox(&self, user_id: Uuid) -> Result<Vec<Message>, AppError> {
        let mut all = self.messages.find_where(json!({ "senderId": user_id })).await?;
        all.extend(self.messages.find_where(json!({ "recipientId": user_id })).await?);
        all.sort_by_key(|m| m.timestamp);
        all.dedup_by_key(|m| m.id);
        Ok(all)
    }

    /// Oldest first, so a polling client can append what it receives.
    pub async fn list(&self, user: &UserRecord, query: &MessageListQuery) -> Result<Vec<Message>, AppError> {
        Ok(self
            .mailbox(user.id)
            .await?
            .into_iter()
            .filter(|m| query.since.is_none_or(|since| m.timestamp > since))
            .filter(|m| query.with.is_none_or(|other| m.involves(other)))
            .filter(|m| !query.unread_only || (m.recipient_id == user.id && !m.read))
            .collect())
    }

    /// One entry per correspondent, most recent conversation first.
    pub async fn conversations(&self, user: &UserRecord) -> Result<Vec<Conversation>, AppError> {
        let mut grouped: HashMap<String, Conversation> = HashMap::new();

        for message in self.mailbox(user.id).await? {
            let (other_id, other_name) = if message.sender_id == user.id {
                (message.recipient_id, message.recipient_name.clone())
            } else {
                (message.sender_id, message.sender_name.clone())
            };
            let unread = message.recipient_id == user.id && !message.read;

            let entry = grouped
                .entry(message.conversation_key())
                .or_insert_with(|| Conversation {
                    key: message.conversation_key(),
                    other_user_id: other_id,
                    other_user_name: other_name.clone(),
                    last_message: message.clone(),
                    unread_count: 0,
                    message_count: 0,
                });
            entry.message_count += 1;
            if unread {
                entry.unread_count += 1;
            }
            if message.timestamp >= entry.last_message.timestamp {
                if other_name.is_some() {
                    entry.other_user_name = other_name;
                }
                entry.last_message = message;
            }
        }

        let mut conversations: Vec<Conversation> = grouped.into_values().collect();
        conversations.sort_by(|a, b| b.last_message.timestamp.cmp(&a.last_message.timestamp));
        Ok(conversations)
    }

    pub async fn unread_count(&self, user: &UserRecord) -> Result<UnreadCount, AppError> {
        let unread = self
            .messages
            .count_where(json!({ "recipientId": user.id, "read": false }))
            .await?;
        Ok(UnreadCount { unread })
    }

    pub async fn mark_read(&self, user: &UserRecord, id: Uuid) -> Result<Message, AppError> {
        let mut message = self.messages.find_404(id, "Message").await?;
        if message.recipient_id != user.id {
            return Err(AppError::forbidden("Only the recipient can mark a message as read"));
        }
        if !message.read {
            message.read = true;
            self.messages.save(&message).await?;
        }
        Ok(message)
    }

    pub async fn delete(&self, user: &UserRecord, id: Uuid) -> Result<(), AppError> {
        let message = self.messages.find_404(id, "Message").await?;
        if !message.involves(user.id) {
            return Err(AppError::forbidden("You can only delete your own messages"));
        }
        self.messages.delete(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Collection, DocumentStore, MemoryDocumentStore, Repository};
    use std::sync::Arc;

    async fn setup() -> (MessageService, UserRecord, UserRecord, UserRecord) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let users = UserDirectory::new(store.clone());
        let mut people = Vec::new();
        for name in ["Hala", "Fadi", "Joe"] {
            let mut r = UserRecord::new(Uuid::new_v4());
            r.name = Some(name.into());
            users.insert(Collection::UnifiedUsers, &r).await.unwrap();
            people.push(r);
        }
        let service = MessageService::new(Repository::new(store, Collection::Messages), users);
        let joe = people.pop().unwrap();
        let fadi = people.pop().unwrap();
        let hala = people.pop().unwrap();
        (service, hala, fadi, joe)
    }

    fn text(to: &UserRecord, content: &str) -> SendMessagePayload {
        SendMessagePayload {
            recipient_id: to.id,
            subject: None,
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn groups_conversations_and_counts_unread() {
        let (service, hala, fadi, joe) = setup().await;

        service.send(&hala, &text(&fadi, "hello")).await.unwrap();
        let reply = service.send(&fadi, &text(&hala, "hi back")).await.unwrap();
        service.send(&joe, &text(&hala, "meeting?")).await.unwrap();

        assert_eq!(service.unread_count(&hala).await.unwrap().unread, 2);

        let convs = service.conversations(&hala).await.unwrap();
        assert_eq!(convs.len(), 2);
        assert_eq!(convs[0].other_user_id, joe.id);
        assert_eq!(convs[1].other_user_name.as_deref(), Some("Fadi"));
        assert_eq!(convs[1].message_count, 2);
        assert_eq!(convs[1].unread_count, 1);
        assert_eq!(convs[1].last_message.id, reply.id);

        service.mark_read(&hala, reply.id).await.unwrap();
        assert_eq!(service.unread_count(&hala).await.unwrap().unread, 1);
        assert!(matches!(service.mark_read(&fadi, reply.id).await, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn polling_returns_only_newer_messages() {
        let (service, hala, fadi, joe) = setup().await;
        let first = service.send(&hala, &text(&fadi, "one")).await.unwrap();
        let second = service.send(&fadi, &text(&hala, "two")).await.unwrap();

        let query = MessageListQuery {
            since: Some(first.timestamp),
            ..Default::default()
        };
        let newer = service.list(&fadi, &query).await.unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].id, second.id);

        assert!(service.list(&joe, &MessageListQuery::default()).await.unwrap().is_empty());
        assert!(matches!(service.delete(&joe, first.id).await, Err(AppError::Forbidden(_))));
        service.delete(&fadi, first.id).await.unwrap();
        assert_eq!(service.list(&hala, &MessageListQuery::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_unknown_recipients_and_self_messages() {
        let (service, hala, _, _) = setup().await;
        let stranger = UserRecord::new(Uuid::new_v4());
        assert!(matches!(
            service.send(&hala, &text(&stranger, "?")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.send(&hala, &text(&hala, "me")).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
