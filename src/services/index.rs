//! Per-call index of a user's existing conversations.

use crate::models::{Conversation, ConversationKey, Identity, canonicalize};
use std::collections::HashSet;
use tracing::warn;

/// Set of canonical keys for the conversations one user takes part in.
///
/// Built fresh for every fan-out from that user's slice of the store and
/// dropped afterwards.
#[derive(Debug, Clone)]
pub struct ConversationIndex {
    user: Identity,
    keys: HashSet<ConversationKey>,
    ordered: Vec<ConversationKey>,
}

impl ConversationIndex {
    /// Builds the index for `user`.
    ///
    /// Records that do not involve `user` are skipped with a warning, and a
    /// key listed twice is indexed once.
    #[must_use]
    pub fn build(user: &Identity, conversations: &[Conversation]) -> Self {
        let mut keys = HashSet::with_capacity(conversations.len());
        let mut ordered = Vec::with_capacity(conversations.len());

        for conversation in conversations {
            if !conversation.key.involves(user) {
                warn!(
                    user = %user,
                    key = %conversation.key,
                    "Skipping conversation that does not involve the user"
                );
                continue;
            }
            if keys.insert(conversation.key.clone()) {
                ordered.push(conversation.key.clone());
            }
        }

        Self {
            user: user.clone(),
            keys,
            ordered,
        }
    }

    /// Returns the user this index was built for.
    #[must_use]
    pub const fn user(&self) -> &Identity {
        &self.user
    }

    /// Returns whether the user already has a conversation with `contact`.
    ///
    /// Always `false` for the user's own identity.
    #[must_use]
    pub fn exists(&self, contact: &Identity) -> bool {
        canonicalize(&self.user, contact).is_ok_and(|key| self.keys.contains(&key))
    }

    /// Returns the indexed keys in the order the store listed them.
    #[must_use]
    pub fn keys(&self) -> &[ConversationKey] {
        &self.ordered
    }

    /// Number of indexed conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Returns whether the user has no conversations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
