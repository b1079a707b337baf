//! Storage layer abstraction.
//!
//! Lifeline consumes three ports:
//! - [`ConversationStore`]: conversations, messages, emergency-contact reads
//! - [`ContactStore`]: emergency-contact writes (CLI and seeding only)
//! - [`ProfileStore`]: display names for message attribution
//!
//! Two backends implement all of them: [`InMemoryStore`] and [`SqliteStore`].

// Allow significant_drop_tightening - holding the connection guard for a
// whole statement is clearer than dropping it early.
#![allow(clippy::significant_drop_tightening)]
// Allow redundant_closure_call - the `(|| { ... })()` pattern scopes `?` so
// metrics are recorded on both paths.
#![allow(clippy::redundant_closure_call)]

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{ContactStore, ConversationStore, ProfileStore};
