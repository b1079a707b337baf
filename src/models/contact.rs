//! Emergency contact associations.

use super::Identity;
use serde::{Deserialize, Serialize};

/// A directed "owner trusts contact" association.
///
/// Owned by external contact management; read-only to the fan-out. The
/// contact side is kept as entered so malformed entries can be reported
/// instead of failing the whole read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    /// The user who registered the contact.
    pub owner: Identity,
    /// The contact's identity as stored.
    pub contact: String,
    /// Optional human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EmergencyContact {
    /// Creates an unnamed contact entry.
    #[must_use]
    pub fn new(owner: Identity, contact: impl Into<String>) -> Self {
        Self {
            owner,
            contact: contact.into(),
            name: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
