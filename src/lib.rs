//! # Lifeline
//!
//! Emergency alert fan-out and conversation discovery.
//!
//! Lifeline lets a user, identified by a stable phone identity, broadcast an
//! emergency alert and a live-location link to every counterpart they already
//! converse with, and opens a first conversation with every emergency contact
//! that has no thread yet.
//!
//! ## Features
//!
//! - Order-independent conversation keys for participant pairs
//! - O(1) "already talking?" lookups over the user's conversations
//! - Concurrent per-conversation delivery with alert-before-location ordering
//! - Per-target failure isolation with an aggregate [`FanoutResult`]
//! - Pluggable stores (in-memory, `SQLite`) and location sources
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lifeline::location::StaticLocationResolver;
//! use lifeline::services::FanoutOrchestrator;
//! use lifeline::storage::InMemoryStore;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let location = Arc::new(StaticLocationResolver::at(31.5, 74.3));
//! let orchestrator = FanoutOrchestrator::new(store.clone(), store, location);
//!
//! let result = orchestrator.send_emergency_alert("U1").await?;
//! println!("{}", result.summary());
//! ```

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod location;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::{FanoutConfig, LifelineConfig};
pub use location::{LocationError, LocationResolver};
pub use models::{
    Conversation, ConversationKey, EmergencyContact, FanoutMode, FanoutOutcome, FanoutResult,
    Identity, LocationFix, Message, MessageId, TargetError, canonicalize,
};
pub use services::{ConversationIndex, FanoutOrchestrator, MessageComposer};
pub use storage::{ContactStore, ConversationStore, InMemoryStore, ProfileStore, SqliteStore};

/// Error type for lifeline operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidIdentity` | Empty identity, or one containing the reserved key separator |
/// | `Location` | Location permission denied or no fix available |
/// | `NotFound` | Profile lookup for a display name misses |
/// | `Store` | A conversation/profile store read or write fails |
/// | `InvalidInput` | Malformed configuration or CLI arguments |
/// | `OperationFailed` | Config I/O, logging init, or a task that could not be joined |
#[derive(Debug, ThisError)]
pub enum Error {
    /// An identity failed validation.
    ///
    /// Fatal to the canonicalization call that raised it. Aborts a fan-out
    /// only when it is the sending user's own identity.
    #[error("invalid identity '{value}': {reason}")]
    InvalidIdentity {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Location acquisition failed.
    ///
    /// Always fatal to a fan-out: nothing is written without a fix.
    #[error(transparent)]
    Location(#[from] LocationError),

    /// A looked-up record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A store operation failed.
    #[error("store operation '{operation}' failed: {cause}")]
    Store {
        /// The store operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An infrastructure operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::Store`] from an operation name and any displayable cause.
    pub fn store(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::Store {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for lifeline operations.
pub type Result<T> = std::result::Result<T, Error>;
