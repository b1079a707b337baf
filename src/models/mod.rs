//! Data models for lifeline.
//!
//! Identities, conversation records, emergency contacts, location fixes and
//! fan-out results.

mod contact;
mod conversation;
mod events;
mod fanout;
mod identity;
mod location;

pub use contact::EmergencyContact;
pub use conversation::{Conversation, ConversationUpsert, LastMessage, Message, MessageId};
pub use events::{EventMeta, FanoutEvent};
pub use fanout::{
    DeliveryStage, FanoutMode, FanoutOutcome, FanoutResult, RejectedContact, TargetError,
    TargetKind, TargetReport,
};
pub use identity::{ConversationKey, Identity, KEY_SEPARATOR, canonicalize};
pub use location::LocationFix;
