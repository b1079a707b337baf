//! CLI command implementations.
//!
//! Each submodule implements one group of commands. Argument parsing lives
//! in the binary; these functions take parsed values and print results.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `alert` | Send the emergency alert and location to every target |
//! | `share-location` | Send only the location link to every target |
//! | `uncontacted` | List emergency contacts with no conversation yet |
//! | `chats` | Show the chat list |
//! | `messages` | Show a conversation thread |
//! | `contact` | Add or list emergency contacts |
//! | `profile` | Set a display name |
//! | `config` | Show the effective configuration |
//!
//! # Example Usage
//!
//! ```bash
//! lifeline contact add +923001111111 +923002222222 --name Sara
//! lifeline alert +923001111111 --latitude 31.5 --longitude 74.3 --events
//! lifeline messages +923001111111 +923002222222 --format json
//! ```

// CLI commands are allowed to print their output
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod chats;
mod config;
mod contact;
mod fanout;
mod profile;

pub use chats::{cmd_chats, cmd_messages, parse_predefined};
pub use config::cmd_config;
pub use contact::{cmd_contact_add, cmd_contact_list};
pub use fanout::{FanoutArgs, cmd_fanout, cmd_uncontacted};
pub use profile::cmd_profile_set;

use crate::config::LifelineConfig;
use crate::models::FanoutOutcome;
use crate::storage::SqliteStore;
use std::sync::Arc;

/// Output format for read commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned columns.
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses output format from string; anything unknown is a table.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Table,
        }
    }
}

/// Opens the `SQLite` store under the configured data directory.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or initialized.
pub fn open_store(config: &LifelineConfig) -> crate::Result<Arc<SqliteStore>> {
    SqliteStore::new(config.database_path()).map(Arc::new)
}

/// Process exit code for a fan-out outcome.
///
/// `0` when everything (or nothing) was sent, `2` for a partial send, `1`
/// when every target failed.
#[must_use]
pub const fn exit_code(outcome: FanoutOutcome) -> u8 {
    match outcome {
        FanoutOutcome::NoTargets | FanoutOutcome::AllSucceeded => 0,
        FanoutOutcome::Partial => 2,
        FanoutOutcome::TotalFailure => 1,
    }
}

/// Prints `value` as pretty JSON.
fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Shortens `text` to `max` characters for table output.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(FanoutOutcome::NoTargets, 0 ; "no targets")]
    #[test_case(FanoutOutcome::AllSucceeded, 0 ; "all")]
    #[test_case(FanoutOutcome::Partial, 2 ; "partial")]
    #[test_case(FanoutOutcome::TotalFailure, 1 ; "total failure")]
    fn test_exit_code(outcome: FanoutOutcome, expected: u8) {
        assert_eq!(exit_code(outcome), expected);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::parse("csv"), OutputFormat::Table);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer line of text", 10), "a longe...");
    }
}
