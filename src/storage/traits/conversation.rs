//! Conversation and contact store traits.
//!
//! The conversation store is the authoritative record of conversations and
//! their messages. Lifeline only reads and appends: it never deletes, and
//! never assumes it is the sole writer.
//!
//! # Available Implementations
//!
//! | Backend | Use Case |
//! |---------|----------|
//! | `InMemoryStore` | Tests; embedding in a host app with its own persistence |
//! | `SqliteStore` | Default; CLI and single-device deployments |
//!
//! # Error Modes and Guarantees
//!
//! All operations return [`crate::Error::Store`] on backend failure.
//!
//! | Operation | Atomicity | On Conflict |
//! |-----------|-----------|-------------|
//! | `append_message` | Per message | Duplicate ids are rejected |
//! | `upsert_conversation` | Per record | Merge: only named fields are written |
//!
//! There is no cross-conversation transaction. A fan-out that fails for one
//! conversation leaves the others as written.

use crate::Result;
use crate::models::{
    Conversation, ConversationKey, ConversationUpsert, EmergencyContact, Identity, Message,
};

/// Read/append access to conversations, messages and emergency contacts.
pub trait ConversationStore: Send + Sync {
    /// Lists every conversation that has `participant` as one of its two
    /// participants.
    fn list_conversations(&self, participant: &Identity) -> Result<Vec<Conversation>>;

    /// Retrieves a conversation by key.
    fn get_conversation(&self, key: &ConversationKey) -> Result<Option<Conversation>>;

    /// Lists the emergency contacts registered by `owner`, in insertion order.
    fn list_contacts(&self, owner: &Identity) -> Result<Vec<EmergencyContact>>;

    /// Appends a message to its conversation.
    ///
    /// Messages are immutable once appended; read order is append order.
    fn append_message(&self, message: &Message) -> Result<()>;

    /// Creates or partially updates a conversation record.
    ///
    /// Fields the upsert does not carry are left untouched.
    fn upsert_conversation(&self, upsert: &ConversationUpsert) -> Result<()>;

    /// Lists a conversation's messages in append order.
    fn list_messages(&self, key: &ConversationKey) -> Result<Vec<Message>>;
}

/// Write access to emergency contacts.
///
/// Contact management lives outside the fan-out; this trait exists for the
/// CLI and for seeding stores.
pub trait ContactStore: Send + Sync {
    /// Registers a contact for its owner.
    ///
    /// Registering the same contact twice keeps a single entry.
    fn add_contact(&self, contact: &EmergencyContact) -> Result<()>;
}
