//! Conversation and message records.

use super::{ConversationKey, Identity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a message.
///
/// Generated as a `UUIDv7`, so ids sort by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wraps an existing message id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh time-ordered id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A two-party conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Canonical key; also names both participants.
    pub key: ConversationKey,
    /// Text of the most recent message, if any was recorded.
    pub last_message_text: Option<String>,
    /// Time of the most recent message, if any was recorded.
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Creates a conversation record with no last-message metadata.
    #[must_use]
    pub const fn new(key: ConversationKey) -> Self {
        Self {
            key,
            last_message_text: None,
            last_message_at: None,
        }
    }

    /// Returns both participants in canonical order.
    #[must_use]
    pub const fn participants(&self) -> [&Identity; 2] {
        self.key.participants()
    }
}

/// An immutable message appended to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique, time-ordered identifier.
    pub id: MessageId,
    /// Conversation the message belongs to.
    pub conversation_key: ConversationKey,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Message body.
    pub text: String,
    /// Sending participant.
    pub sender: Identity,
    /// Display name of the sender at send time.
    pub sender_name: String,
}

/// Partial update for a conversation record.
///
/// Applied with merge semantics: `participants` come from the key and are
/// always written; `last_message` is written only when present. Fields not
/// named here are never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationUpsert {
    /// Conversation to create or update.
    pub key: ConversationKey,
    /// New last-message metadata, if any.
    pub last_message: Option<LastMessage>,
}

/// Last-message metadata carried by a [`ConversationUpsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastMessage {
    /// Message text.
    pub text: String,
    /// Message time.
    pub at: DateTime<Utc>,
}

impl ConversationUpsert {
    /// Upsert that only guarantees the record exists.
    #[must_use]
    pub const fn ensure(key: ConversationKey) -> Self {
        Self {
            key,
            last_message: None,
        }
    }

    /// Upsert that records `message` as the conversation's latest.
    #[must_use]
    pub fn reflecting(message: &Message) -> Self {
        Self {
            key: message.conversation_key.clone(),
            last_message: Some(LastMessage {
                text: message.text.clone(),
                at: message.created_at,
            }),
        }
    }

    /// Merges this upsert into an existing record (or a fresh one).
    #[must_use]
    pub fn apply(self, existing: Option<Conversation>) -> Conversation {
        let mut conversation = existing.unwrap_or_else(|| Conversation::new(self.key.clone()));
        if let Some(last) = self.last_message {
            conversation.last_message_text = Some(last.text);
            conversation.last_message_at = Some(last.at);
        }
        conversation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::canonicalize;

    fn key() -> ConversationKey {
        canonicalize(
            &Identity::new("U1").expect("id"),
            &Identity::new("C1").expect("id"),
        )
        .expect("key")
    }

    #[test]
    fn test_message_ids_are_time_ordered() {
        let first = MessageId::generate();
        let second = MessageId::generate();
        assert!(first < second);
    }

    #[test]
    fn test_ensure_upsert_keeps_existing_metadata() {
        let at = Utc::now();
        let existing = Conversation {
            key: key(),
            last_message_text: Some("hello".to_string()),
            last_message_at: Some(at),
        };

        let merged = ConversationUpsert::ensure(key()).apply(Some(existing.clone()));
        assert_eq!(merged, existing);
    }

    #[test]
    fn test_reflecting_upsert_overwrites_last_message() {
        let message = Message {
            id: MessageId::generate(),
            conversation_key: key(),
            created_at: Utc::now(),
            text: "https://www.google.com/maps?q=1,2".to_string(),
            sender: Identity::new("U1").expect("id"),
            sender_name: "Ayesha".to_string(),
        };

        let merged = ConversationUpsert::reflecting(&message).apply(None);
        assert_eq!(merged.key, key());
        assert_eq!(merged.last_message_text.as_deref(), Some(message.text.as_str()));
        assert_eq!(merged.last_message_at, Some(message.created_at));
    }
}
