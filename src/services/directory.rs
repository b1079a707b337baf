//! Chat list shown to a user: known contacts first, then other threads.

use crate::models::{Conversation, EmergencyContact, Identity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A contact that every user's chat list starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredefinedContact {
    /// Display name.
    pub name: String,
    /// Contact identity.
    pub identity: Identity,
}

/// One row of the chat list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    /// Display name; the identity itself when no name is known.
    pub name: String,
    /// Counterpart identity.
    pub identity: Identity,
    /// Last message of the conversation with this counterpart, if any.
    pub last_message_text: Option<String>,
    /// Time of that message.
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Builds `user`'s chat list.
///
/// Predefined contacts come first, then emergency contacts, each in input
/// order and each listed once. Every contact row carries the last message of
/// its conversation with `user`. Conversations whose counterpart is not a
/// listed contact follow, named by the counterpart identity. The user's own
/// identity is never listed; malformed emergency contacts are skipped.
#[must_use]
pub fn build_chat_list(
    user: &Identity,
    predefined: &[PredefinedContact],
    contacts: &[EmergencyContact],
    conversations: &[Conversation],
) -> Vec<ChatEntry> {
    let by_counterpart: HashMap<&Identity, &Conversation> = conversations
        .iter()
        .filter_map(|c| c.key.counterpart(user).map(|other| (other, c)))
        .collect();

    let named = predefined
        .iter()
        .map(|p| (p.identity.clone(), p.name.clone()))
        .chain(
            contacts
                .iter()
                .filter(|c| &c.owner == user)
                .filter_map(|c| {
                    let identity = Identity::new(&c.contact).ok()?;
                    let name = c.name.clone().unwrap_or_else(|| identity.to_string());
                    Some((identity, name))
                }),
        );

    let mut listed = HashSet::new();
    let mut entries = Vec::new();
    for (identity, name) in named {
        if &identity == user || !listed.insert(identity.clone()) {
            continue;
        }
        let conversation = by_counterpart.get(&identity);
        entries.push(ChatEntry {
            name,
            last_message_text: conversation.and_then(|c| c.last_message_text.clone()),
            last_message_at: conversation.and_then(|c| c.last_message_at),
            identity,
        });
    }

    for conversation in conversations {
        let Some(other) = conversation.key.counterpart(user) else {
            continue;
        };
        if !listed.insert(other.clone()) {
            continue;
        }
        entries.push(ChatEntry {
            name: other.to_string(),
            identity: other.clone(),
            last_message_text: conversation.last_message_text.clone(),
            last_message_at: conversation.last_message_at,
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationKey;

    fn id(s: &str) -> Identity {
        Identity::new(s).expect("identity")
    }

    fn conversation(a: &str, b: &str, last: Option<&str>) -> Conversation {
        let mut c = Conversation::new(ConversationKey::for_pair(a, b).expect("key"));
        c.last_message_text = last.map(str::to_string);
        c.last_message_at = last.map(|_| Utc::now());
        c
    }

    #[test]
    fn test_contacts_then_unlisted_conversations() {
        let predefined = vec![
            PredefinedContact {
                name: "Police".to_string(),
                identity: id("15"),
            },
            PredefinedContact {
                name: "Me".to_string(),
                identity: id("U1"),
            },
        ];
        let contacts = vec![
            EmergencyContact::new(id("U1"), "C1").with_name("Sara"),
            EmergencyContact::new(id("U1"), "C2"),
            EmergencyContact::new(id("U1"), "15"),
            EmergencyContact::new(id("U1"), "bad_id"),
        ];
        let conversations = vec![
            conversation("U1", "C1", Some("hi")),
            conversation("C9", "U1", Some("yo")),
        ];

        let list = build_chat_list(&id("U1"), &predefined, &contacts, &conversations);
        let names: Vec<_> = list.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Police", "Sara", "C2", "C9"]);

        assert_eq!(list[1].last_message_text.as_deref(), Some("hi"));
        assert!(list[2].last_message_text.is_none());
        assert_eq!(list[3].identity, id("C9"));
        assert_eq!(list[3].last_message_text.as_deref(), Some("yo"));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(build_chat_list(&id("U1"), &[], &[], &[]).is_empty());
    }
}
