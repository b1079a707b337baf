//! In-memory store.
//!
//! Non-persistent implementation of every storage port, for tests and for
//! hosts that keep their own persistence and only need the fan-out logic.

use crate::models::{
    Conversation, ConversationKey, ConversationUpsert, EmergencyContact, Identity, Message,
};
use crate::storage::traits::{ContactStore, ConversationStore, ProfileStore};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory store.
///
/// Uses `RwLock` for thread-safe access with reader-writer semantics.
///
/// # Example
///
/// ```rust,ignore
/// use lifeline::storage::InMemoryStore;
///
/// let store = InMemoryStore::new();
/// store.add_contact(&EmergencyContact::new(user, "+923001234567"))?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    conversations: RwLock<BTreeMap<ConversationKey, Conversation>>,
    messages: RwLock<HashMap<ConversationKey, Vec<Message>>>,
    contacts: RwLock<Vec<EmergencyContact>>,
    profiles: RwLock<HashMap<Identity, String>>,
}

fn read<'a, T>(lock: &'a RwLock<T>, operation: &str) -> Result<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|e| Error::store(operation, e))
}

fn write<'a, T>(lock: &'a RwLock<T>, operation: &str) -> Result<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|e| Error::store(operation, e))
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of conversations stored.
    #[must_use]
    pub fn conversation_count(&self) -> usize {
        self.conversations.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Returns the number of messages stored across all conversations.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages
            .read()
            .map(|m| m.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

impl ConversationStore for InMemoryStore {
    fn list_conversations(&self, participant: &Identity) -> Result<Vec<Conversation>> {
        Ok(read(&self.conversations, "list_conversations")?
            .values()
            .filter(|c| c.key.involves(participant))
            .cloned()
            .collect())
    }

    fn get_conversation(&self, key: &ConversationKey) -> Result<Option<Conversation>> {
        Ok(read(&self.conversations, "get_conversation")?
            .get(key)
            .cloned())
    }

    fn list_contacts(&self, owner: &Identity) -> Result<Vec<EmergencyContact>> {
        Ok(read(&self.contacts, "list_contacts")?
            .iter()
            .filter(|c| &c.owner == owner)
            .cloned()
            .collect())
    }

    fn append_message(&self, message: &Message) -> Result<()> {
        if !read(&self.conversations, "append_message")?.contains_key(&message.conversation_key) {
            return Err(Error::store(
                "append_message",
                format!("unknown conversation {}", message.conversation_key),
            ));
        }

        let mut messages = write(&self.messages, "append_message")?;
        let thread = messages
            .entry(message.conversation_key.clone())
            .or_default();
        if thread.iter().any(|m| m.id == message.id) {
            return Err(Error::store(
                "append_message",
                format!("duplicate message id {}", message.id),
            ));
        }
        thread.push(message.clone());
        Ok(())
    }

    fn upsert_conversation(&self, upsert: &ConversationUpsert) -> Result<()> {
        let mut conversations = write(&self.conversations, "upsert_conversation")?;
        let existing = conversations.remove(&upsert.key);
        let merged = upsert.clone().apply(existing);
        conversations.insert(merged.key.clone(), merged);
        Ok(())
    }

    fn list_messages(&self, key: &ConversationKey) -> Result<Vec<Message>> {
        Ok(read(&self.messages, "list_messages")?
            .get(key)
            .cloned()
            .unwrap_or_default())
    }
}

impl ContactStore for InMemoryStore {
    fn add_contact(&self, contact: &EmergencyContact) -> Result<()> {
        let mut contacts = write(&self.contacts, "add_contact")?;
        if let Some(existing) = contacts
            .iter_mut()
            .find(|c| c.owner == contact.owner && c.contact == contact.contact)
        {
            if contact.name.is_some() {
                existing.name.clone_from(&contact.name);
            }
        } else {
            contacts.push(contact.clone());
        }
        Ok(())
    }
}

impl ProfileStore for InMemoryStore {
    fn get_display_name(&self, identity: &Identity) -> Result<String> {
        read(&self.profiles, "get_display_name")?
            .get(identity)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("profile for {identity}")))
    }

    fn set_display_name(&self, identity: &Identity, name: &str) -> Result<()> {
        write(&self.profiles, "set_display_name")?.insert(identity.clone(), name.to_string());
        Ok(())
    }
}
