//! Chat list and thread commands.

use super::{OutputFormat, print_json, truncate};
use crate::models::{ConversationKey, Identity};
use crate::services::{ChatEntry, PredefinedContact, build_chat_list};
use crate::storage::{ConversationStore, SqliteStore};
use crate::{Error, Result};

/// Parses `NAME=IDENTITY` pairs given with `--predefined`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for a pair without `=` and
/// [`Error::InvalidIdentity`] for a malformed identity.
pub fn parse_predefined(values: &[String]) -> Result<Vec<PredefinedContact>> {
    values
        .iter()
        .map(|value| -> Result<PredefinedContact> {
            let (name, identity) = value.split_once('=').ok_or_else(|| {
                Error::InvalidInput(format!("expected NAME=IDENTITY, got '{value}'"))
            })?;
            Ok(PredefinedContact {
                name: name.trim().to_string(),
                identity: Identity::new(identity)?,
            })
        })
        .collect()
}

/// Prints `user`'s chat list.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn cmd_chats(
    store: &SqliteStore,
    user: &str,
    predefined: &[PredefinedContact],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let user = Identity::new(user)?;
    let contacts = store.list_contacts(&user)?;
    let conversations = store.list_conversations(&user)?;
    let entries = build_chat_list(&user, predefined, &contacts, &conversations);

    match format {
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Table => print_chats(&entries),
    }
    Ok(())
}

fn print_chats(entries: &[ChatEntry]) {
    if entries.is_empty() {
        println!("No chats.");
        return;
    }

    println!("{:<20} {:<18} {:<20} LAST MESSAGE", "NAME", "IDENTITY", "AT");
    println!("{}", "-".repeat(90));
    for entry in entries {
        let at = entry
            .last_message_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{:<20} {:<18} {:<20} {}",
            truncate(&entry.name, 20),
            entry.identity.as_str(),
            at,
            truncate(entry.last_message_text.as_deref().unwrap_or(""), 40)
        );
    }
}

/// Prints the thread between `a` and `b`, oldest first.
///
/// # Errors
///
/// Returns an error if either identity is malformed or the store cannot be
/// read.
pub fn cmd_messages(
    store: &SqliteStore,
    a: &str,
    b: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let key = ConversationKey::for_pair(a, b)?;
    let messages = store.list_messages(&key)?;

    match format {
        OutputFormat::Json => print_json(&messages)?,
        OutputFormat::Table => {
            println!("Conversation {key} ({} messages)", messages.len());
            for message in &messages {
                println!(
                    "[{}] {} ({}): {}",
                    message.created_at.format("%Y-%m-%d %H:%M:%S%.3f"),
                    message.sender_name,
                    message.sender,
                    message.text
                );
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_predefined() {
        let parsed = parse_predefined(&["Police = 15".to_string()]).expect("parse");
        assert_eq!(parsed[0].name, "Police");
        assert_eq!(parsed[0].identity.as_str(), "15");

        assert!(matches!(
            parse_predefined(&["15".to_string()]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            parse_predefined(&["Bad=a_b".to_string()]),
            Err(Error::InvalidIdentity { .. })
        ));
    }
}
