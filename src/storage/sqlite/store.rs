//! `SQLite`-backed conversation, contact and profile store.

use super::{acquire_lock, configure_connection, observe};
use crate::models::{
    Conversation, ConversationKey, ConversationUpsert, EmergencyContact, Identity, Message,
    MessageId,
};
use crate::storage::traits::{ContactStore, ConversationStore, ProfileStore};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{instrument, warn};

/// `SQLite` store implementing every lifeline storage port.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` because `rusqlite::Connection` is not `Sync`.
/// Fan-out targets run on separate blocking threads and serialize here; WAL
/// mode and `busy_timeout` cover other processes writing the same file.
///
/// # Schema
///
/// - `conversations`: one row per canonical key, both participants split out
///   for indexed lookup, nullable last-message metadata
/// - `messages`: append-only, `seq` preserves append order
/// - `emergency_contacts`: `(owner, contact)` unique, `seq` preserves insertion order
/// - `profiles`: display names
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (or creates) a store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_data_dir".to_string(),
                cause: format!("{}: {e}", parent.display()),
            })?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::store("open_sqlite", e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::store("open_sqlite_in_memory", e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS conversations (
                key TEXT PRIMARY KEY,
                participant_low TEXT NOT NULL,
                participant_high TEXT NOT NULL,
                last_message_text TEXT,
                last_message_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_conversations_low ON conversations(participant_low);
            CREATE INDEX IF NOT EXISTS idx_conversations_high ON conversations(participant_high);

            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                conversation_key TEXT NOT NULL REFERENCES conversations(key),
                created_at INTEGER NOT NULL,
                text TEXT NOT NULL,
                sender TEXT NOT NULL,
                sender_name TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_key, seq);

            CREATE TABLE IF NOT EXISTS emergency_contacts (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                contact TEXT NOT NULL,
                name TEXT,
                UNIQUE(owner, contact)
            );

            CREATE TABLE IF NOT EXISTS profiles (
                identity TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );",
        )
        .map_err(|e| Error::store("create_schema", e))
    }
}

type ConversationRow = (String, Option<String>, Option<i64>);
type MessageRow = (String, String, i64, String, String, String);

fn decode_time(operation: &str, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::store(operation, format!("timestamp out of range: {millis}")))
}

/// Decodes a conversation row.
///
/// A stored key must already be canonical: messages reference the stored
/// key, so a `B_A` row could never take an append under `A_B`.
fn decode_conversation((stored, text, at): ConversationRow) -> Result<Conversation> {
    let key =
        ConversationKey::parse(&stored).map_err(|e| Error::store("decode_conversation", e))?;
    if key.as_str() != stored {
        return Err(Error::store(
            "decode_conversation",
            format!("non-canonical key '{stored}'"),
        ));
    }
    let last_message_at = at
        .map(|millis| decode_time("decode_conversation", millis))
        .transpose()?;
    Ok(Conversation {
        key,
        last_message_text: text,
        last_message_at,
    })
}

fn decode_message((id, key, at, text, sender, sender_name): MessageRow) -> Result<Message> {
    Ok(Message {
        id: MessageId::new(id),
        conversation_key: ConversationKey::parse(&key)
            .map_err(|e| Error::store("decode_message", e))?,
        created_at: decode_time("decode_message", at)?,
        text,
        sender: Identity::new(&sender).map_err(|e| Error::store("decode_message", e))?,
        sender_name,
    })
}

impl ConversationStore for SqliteStore {
    #[instrument(skip_all, fields(backend = "sqlite", participant = %participant))]
    fn list_conversations(&self, participant: &Identity) -> Result<Vec<Conversation>> {
        let start = Instant::now();
        let rows: Result<Vec<ConversationRow>> = (|| {
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn
                .prepare(
                    "SELECT key, last_message_text, last_message_at FROM conversations
                     WHERE participant_low = ?1 OR participant_high = ?1
                     ORDER BY key",
                )
                .map_err(|e| Error::store("list_conversations", e))?;
            let rows = stmt
                .query_map(params![participant.as_str()], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })
                .map_err(|e| Error::store("list_conversations", e))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::store("list_conversations", e))?;
            Ok(rows)
        })();

        Ok(observe("list_conversations", start, rows)?
            .into_iter()
            .filter_map(|row| {
                let stored = row.0.clone();
                decode_conversation(row)
                    .inspect_err(|e| {
                        warn!(key = %stored, error = %e, "Skipping unreadable conversation row");
                        metrics::counter!("store_rows_skipped_total", "table" => "conversations")
                            .increment(1);
                    })
                    .ok()
            })
            .collect())
    }

    #[instrument(skip_all, fields(backend = "sqlite", key = %key))]
    fn get_conversation(&self, key: &ConversationKey) -> Result<Option<Conversation>> {
        let start = Instant::now();
        let row: Result<Option<ConversationRow>> = (|| {
            let conn = acquire_lock(&self.conn);
            conn.query_row(
                "SELECT key, last_message_text, last_message_at FROM conversations WHERE key = ?1",
                params![key.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| Error::store("get_conversation", e))
        })();

        observe("get_conversation", start, row)?
            .map(decode_conversation)
            .transpose()
    }

    #[instrument(skip_all, fields(backend = "sqlite", owner = %owner))]
    fn list_contacts(&self, owner: &Identity) -> Result<Vec<EmergencyContact>> {
        let start = Instant::now();
        let rows: Result<Vec<(String, Option<String>)>> = (|| {
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn
                .prepare(
                    "SELECT contact, name FROM emergency_contacts WHERE owner = ?1 ORDER BY seq",
                )
                .map_err(|e| Error::store("list_contacts", e))?;
            let rows = stmt
                .query_map(params![owner.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(|e| Error::store("list_contacts", e))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::store("list_contacts", e))?;
            Ok(rows)
        })();

        Ok(observe("list_contacts", start, rows)?
            .into_iter()
            .map(|(contact, name)| EmergencyContact {
                owner: owner.clone(),
                contact,
                name,
            })
            .collect())
    }

    #[instrument(skip_all, fields(backend = "sqlite", key = %message.conversation_key, message.id = %message.id))]
    fn append_message(&self, message: &Message) -> Result<()> {
        let start = Instant::now();
        let result: Result<()> = (|| {
            let conn = acquire_lock(&self.conn);
            conn.execute(
                "INSERT INTO messages (id, conversation_key, created_at, text, sender, sender_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.id.as_str(),
                    message.conversation_key.as_str(),
                    message.created_at.timestamp_millis(),
                    message.text,
                    message.sender.as_str(),
                    message.sender_name,
                ],
            )
            .map_err(|e| Error::store("append_message", e))?;
            Ok(())
        })();

        observe("append_message", start, result)
    }

    #[instrument(skip_all, fields(backend = "sqlite", key = %upsert.key))]
    fn upsert_conversation(&self, upsert: &ConversationUpsert) -> Result<()> {
        let start = Instant::now();
        let [low, high] = upsert.key.participants();
        let (text, at) = upsert
            .last_message
            .as_ref()
            .map_or((None, None), |last| {
                (Some(last.text.as_str()), Some(last.at.timestamp_millis()))
            });

        let result: Result<()> = (|| {
            let conn = acquire_lock(&self.conn);
            conn.execute(
                "INSERT INTO conversations (key, participant_low, participant_high, last_message_text, last_message_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(key) DO UPDATE SET
                    last_message_text = COALESCE(excluded.last_message_text, conversations.last_message_text),
                    last_message_at = COALESCE(excluded.last_message_at, conversations.last_message_at)",
                params![upsert.key.as_str(), low.as_str(), high.as_str(), text, at],
            )
            .map_err(|e| Error::store("upsert_conversation", e))?;
            Ok(())
        })();

        observe("upsert_conversation", start, result)
    }

    #[instrument(skip_all, fields(backend = "sqlite", key = %key))]
    fn list_messages(&self, key: &ConversationKey) -> Result<Vec<Message>> {
        let start = Instant::now();
        let rows: Result<Vec<MessageRow>> = (|| {
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn
                .prepare(
                    "SELECT id, conversation_key, created_at, text, sender, sender_name
                     FROM messages WHERE conversation_key = ?1 ORDER BY seq",
                )
                .map_err(|e| Error::store("list_messages", e))?;
            let rows = stmt
                .query_map(params![key.as_str()], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                })
                .map_err(|e| Error::store("list_messages", e))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::store("list_messages", e))?;
            Ok(rows)
        })();

        observe("list_messages", start, rows)?
            .into_iter()
            .map(decode_message)
            .collect()
    }
}

impl ContactStore for SqliteStore {
    #[instrument(skip_all, fields(backend = "sqlite", owner = %contact.owner))]
    fn add_contact(&self, contact: &EmergencyContact) -> Result<()> {
        let start = Instant::now();
        let result: Result<()> = (|| {
            let conn = acquire_lock(&self.conn);
            conn.execute(
                "INSERT INTO emergency_contacts (owner, contact, name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(owner, contact) DO UPDATE SET name = COALESCE(excluded.name, emergency_contacts.name)",
                params![contact.owner.as_str(), contact.contact, contact.name],
            )
            .map_err(|e| Error::store("add_contact", e))?;
            Ok(())
        })();

        observe("add_contact", start, result)
    }
}

impl ProfileStore for SqliteStore {
    #[instrument(skip_all, fields(backend = "sqlite", identity = %identity))]
    fn get_display_name(&self, identity: &Identity) -> Result<String> {
        let start = Instant::now();
        let name: Result<Option<String>> = (|| {
            let conn = acquire_lock(&self.conn);
            conn.query_row(
                "SELECT name FROM profiles WHERE identity = ?1",
                params![identity.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::store("get_display_name", e))
        })();

        observe("get_display_name", start, name)?
            .ok_or_else(|| Error::NotFound(format!("profile for {identity}")))
    }

    #[instrument(skip_all, fields(backend = "sqlite", identity = %identity))]
    fn set_display_name(&self, identity: &Identity, name: &str) -> Result<()> {
        let start = Instant::now();
        let result: Result<()> = (|| {
            let conn = acquire_lock(&self.conn);
            conn.execute(
                "INSERT INTO profiles (identity, name) VALUES (?1, ?2)
                 ON CONFLICT(identity) DO UPDATE SET name = excluded.name",
                params![identity.as_str(), name],
            )
            .map_err(|e| Error::store("set_display_name", e))?;
            Ok(())
        })();

        observe("set_display_name", start, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::canonicalize;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn id(s: &str) -> Identity {
        Identity::new(s).expect("identity")
    }

    fn key(a: &str, b: &str) -> ConversationKey {
        canonicalize(&id(a), &id(b)).expect("key")
    }

    fn message(key: &ConversationKey, text: &str, millis: i64) -> Message {
        Message {
            id: MessageId::generate(),
            conversation_key: key.clone(),
            created_at: Utc.timestamp_millis_opt(millis).single().expect("time"),
            text: text.to_string(),
            sender: id("U1"),
            sender_name: "Ayesha".to_string(),
        }
    }

    #[test]
    fn test_upsert_creates_and_lists_by_either_participant() {
        let store = SqliteStore::in_memory().expect("store");
        store
            .upsert_conversation(&ConversationUpsert::ensure(key("U1", "C1")))
            .expect("upsert");

        assert_eq!(store.list_conversations(&id("U1")).expect("list").len(), 1);
        assert_eq!(store.list_conversations(&id("C1")).expect("list").len(), 1);
        assert!(store.list_conversations(&id("C2")).expect("list").is_empty());
    }

    #[test]
    fn test_upsert_merge_keeps_last_message() {
        let store = SqliteStore::in_memory().expect("store");
        let k = key("U1", "C1");
        let msg = message(&k, "hello", 1_700_000_000_000);
        store
            .upsert_conversation(&ConversationUpsert::reflecting(&msg))
            .expect("upsert");
        store
            .upsert_conversation(&ConversationUpsert::ensure(k.clone()))
            .expect("upsert");

        let conversation = store.get_conversation(&k).expect("get").expect("exists");
        assert_eq!(conversation.last_message_text.as_deref(), Some("hello"));
        assert_eq!(conversation.last_message_at, Some(msg.created_at));
    }

    #[test]
    fn test_messages_keep_append_order() {
        let store = SqliteStore::in_memory().expect("store");
        let k = key("U1", "C1");
        store
            .upsert_conversation(&ConversationUpsert::ensure(k.clone()))
            .expect("upsert");
        store
            .append_message(&message(&k, "first", 2_000))
            .expect("append");
        store
            .append_message(&message(&k, "second", 1_000))
            .expect("append");

        let texts: Vec<_> = store
            .list_messages(&k)
            .expect("list")
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_append_to_unknown_conversation_fails() {
        let store = SqliteStore::in_memory().expect("store");
        let k = key("U1", "C9");
        let result = store.append_message(&message(&k, "orphan", 1));
        assert!(matches!(result, Err(Error::Store { .. })));
    }

    #[test]
    fn test_contacts_dedupe_and_keep_order() {
        let store = SqliteStore::in_memory().expect("store");
        for phone in ["C2", "C1", "C2"] {
            store
                .add_contact(&EmergencyContact::new(id("U1"), phone))
                .expect("add");
        }

        let contacts: Vec<_> = store
            .list_contacts(&id("U1"))
            .expect("list")
            .into_iter()
            .map(|c| c.contact)
            .collect();
        assert_eq!(contacts, vec!["C2", "C1"]);
    }

    #[test]
    fn test_profile_lookup() {
        let store = SqliteStore::in_memory().expect("store");
        assert!(matches!(
            store.get_display_name(&id("U1")),
            Err(Error::NotFound(_))
        ));

        store.set_display_name(&id("U1"), "Ayesha").expect("set");
        assert_eq!(store.get_display_name(&id("U1")).expect("get"), "Ayesha");
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("lifeline.db");
        {
            let store = SqliteStore::new(&path).expect("store");
            store
                .upsert_conversation(&ConversationUpsert::ensure(key("U1", "C1")))
                .expect("upsert");
        }

        let reopened = SqliteStore::new(&path).expect("reopen");
        assert_eq!(reopened.db_path(), Some(path.as_path()));
        assert!(
            reopened
                .get_conversation(&key("C1", "U1"))
                .expect("get")
                .is_some()
        );
    }

    fn insert_raw_conversation(store: &SqliteStore, key: &str, low: &str, high: &str) {
        let conn = acquire_lock(&store.conn);
        conn.execute(
            "INSERT INTO conversations (key, participant_low, participant_high) VALUES (?1, ?2, ?3)",
            params![key, low, high],
        )
        .expect("raw insert");
    }

    #[test]
    fn test_listing_skips_self_conversation_row() {
        let store = SqliteStore::in_memory().expect("store");
        insert_raw_conversation(&store, "U1_U1", "U1", "U1");
        store
            .upsert_conversation(&ConversationUpsert::ensure(key("U1", "C1")))
            .expect("upsert");

        let listed = store.list_conversations(&id("U1")).expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, key("U1", "C1"));
    }

    #[test]
    fn test_listing_skips_non_canonical_row() {
        let store = SqliteStore::in_memory().expect("store");
        insert_raw_conversation(&store, "U1_C1", "C1", "U1");

        assert!(store.list_conversations(&id("U1")).expect("list").is_empty());
        assert!(store.get_conversation(&key("U1", "C1")).expect("get").is_none());
    }
}
