//! Business logic services.
//!
//! Services combine the storage ports, the location resolver, and the pure
//! discovery helpers into the operations the CLI and host apps call.

mod composer;
pub mod directory;
mod fanout;
mod index;
mod uncontacted;

pub use composer::MessageComposer;
pub use directory::{ChatEntry, PredefinedContact, build_chat_list};
pub use fanout::FanoutOrchestrator;
pub use index::ConversationIndex;
pub use uncontacted::{Uncontacted, resolve_uncontacted};
