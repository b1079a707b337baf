//! Profile command.

use crate::models::Identity;
use crate::storage::{ProfileStore, SqliteStore};

/// Sets the display name shown on messages `identity` sends.
///
/// # Errors
///
/// Returns an error if the identity is malformed, the name is blank, or the
/// write fails.
pub fn cmd_profile_set(store: &SqliteStore, identity: &str, name: &str) -> anyhow::Result<()> {
    let identity = Identity::new(identity)?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("display name cannot be empty");
    }

    store.set_display_name(&identity, name)?;
    println!("Display name for {identity} set to '{name}'");
    Ok(())
}
