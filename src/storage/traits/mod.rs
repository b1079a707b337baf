//! Storage port traits.

mod conversation;
mod profile;

pub use conversation::{ContactStore, ConversationStore};
pub use profile::ProfileStore;
