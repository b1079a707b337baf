//! Emergency contacts with no existing conversation.

use super::ConversationIndex;
use crate::models::{EmergencyContact, Identity, RejectedContact};
use std::collections::HashSet;
use tracing::debug;

/// Result of resolving a contact list against an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uncontacted {
    /// Contacts to open a conversation with, in first-seen order.
    pub targets: Vec<Identity>,
    /// Contacts whose identity is malformed.
    pub rejected: Vec<RejectedContact>,
}

/// Returns the contacts of `index.user()` that have no conversation yet.
///
/// Duplicates collapse onto their first occurrence, the user's own identity
/// is never returned, and contacts owned by someone else are ignored.
#[must_use]
pub fn resolve_uncontacted(contacts: &[EmergencyContact], index: &ConversationIndex) -> Uncontacted {
    let user = index.user();
    let mut seen = HashSet::with_capacity(contacts.len());
    let mut result = Uncontacted::default();

    for contact in contacts.iter().filter(|c| &c.owner == user) {
        let identity = match Identity::new(&contact.contact) {
            Ok(identity) => identity,
            Err(e) => {
                result.rejected.push(RejectedContact {
                    contact: contact.contact.clone(),
                    reason: e.to_string(),
                });
                continue;
            },
        };

        if &identity == user {
            debug!(user = %user, "Ignoring emergency contact equal to the user");
            continue;
        }
        if !seen.insert(identity.clone()) {
            continue;
        }
        if !index.exists(&identity) {
            result.targets.push(identity);
        }
    }

    result
}
