//! Emergency contact commands.

use super::{OutputFormat, print_json};
use crate::models::{EmergencyContact, Identity};
use crate::storage::{ContactStore, ConversationStore, SqliteStore};

/// Adds (or renames) an emergency contact for `owner`.
///
/// # Errors
///
/// Returns an error if either identity is malformed or the write fails.
pub fn cmd_contact_add(
    store: &SqliteStore,
    owner: &str,
    contact: &str,
    name: Option<String>,
) -> anyhow::Result<()> {
    let owner = Identity::new(owner)?;
    let identity = Identity::new(contact)?;
    if identity == owner {
        anyhow::bail!("an emergency contact cannot be the owner ({owner})");
    }

    let mut record = EmergencyContact::new(owner, identity.as_str());
    if let Some(name) = name {
        record = record.with_name(name);
    }
    store.add_contact(&record)?;

    println!("Emergency contact added: {identity}");
    Ok(())
}

/// Lists `owner`'s emergency contacts.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn cmd_contact_list(
    store: &SqliteStore,
    owner: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let owner = Identity::new(owner)?;
    let contacts = store.list_contacts(&owner)?;

    match format {
        OutputFormat::Json => print_json(&contacts)?,
        OutputFormat::Table => {
            if contacts.is_empty() {
                println!("No emergency contacts.");
                return Ok(());
            }
            println!("{:<20} NAME", "CONTACT");
            println!("{}", "-".repeat(40));
            for contact in &contacts {
                println!(
                    "{:<20} {}",
                    contact.contact,
                    contact.name.as_deref().unwrap_or("")
                );
            }
            println!();
            println!("Total: {} contacts", contacts.len());
        },
    }
    Ok(())
}
