//! Participant identities and canonical conversation keys.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator joining the two identities of a conversation key.
///
/// Never valid inside an [`Identity`].
pub const KEY_SEPARATOR: char = '_';

/// Stable token identifying a participant (a phone number in practice).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Validates and wraps an identity.
    ///
    /// Surrounding whitespace is trimmed first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if the value is empty or contains
    /// [`KEY_SEPARATOR`].
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let raw = value.as_ref();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidIdentity {
                value: raw.to_string(),
                reason: "identity is empty",
            });
        }
        if trimmed.contains(KEY_SEPARATOR) {
            return Err(Error::InvalidIdentity {
                value: raw.to_string(),
                reason: "identity contains the reserved key separator",
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Identity {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

/// Canonical, order-independent key for a two-party conversation.
///
/// Only constructible through [`canonicalize`] (or [`ConversationKey::parse`],
/// which re-canonicalizes), so `key(a, b) == key(b, a)` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationKey {
    key: String,
    low: Identity,
    high: Identity,
}

impl ConversationKey {
    /// Parses a stored key string back into a canonical key.
    ///
    /// A key written in the non-canonical order (`B_A`) parses to the same
    /// value as `A_B`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if the string does not split into
    /// exactly two valid identities.
    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.split(KEY_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), None) => Self::for_pair(a, b),
            _ => Err(Error::InvalidIdentity {
                value: value.to_string(),
                reason: "conversation key must join exactly two identities",
            }),
        }
    }

    /// Validates two raw identities and canonicalizes them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if either side is empty, contains
    /// [`KEY_SEPARATOR`], or both sides are the same identity.
    pub fn for_pair(a: &str, b: &str) -> Result<Self> {
        canonicalize(&Identity::new(a)?, &Identity::new(b)?)
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Returns both participants in canonical order.
    #[must_use]
    pub const fn participants(&self) -> [&Identity; 2] {
        [&self.low, &self.high]
    }

    /// Returns whether `identity` is one of the two participants.
    #[must_use]
    pub fn involves(&self, identity: &Identity) -> bool {
        &self.low == identity || &self.high == identity
    }

    /// Returns the participant that is not `identity`.
    ///
    /// Returns `None` when `identity` is not a participant.
    #[must_use]
    pub fn counterpart(&self, identity: &Identity) -> Option<&Identity> {
        if &self.low == identity {
            Some(&self.high)
        } else if &self.high == identity {
            Some(&self.low)
        } else {
            None
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl TryFrom<String> for ConversationKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ConversationKey> for String {
    fn from(key: ConversationKey) -> Self {
        key.key
    }
}

/// Canonicalizes a pair of identities into one conversation key.
///
/// The identities are sorted lexicographically and joined with
/// [`KEY_SEPARATOR`], so the result is the same for either argument order.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentity`] when both sides are the same identity;
/// a conversation has exactly two distinct participants.
pub fn canonicalize(a: &Identity, b: &Identity) -> Result<ConversationKey> {
    if a == b {
        return Err(Error::InvalidIdentity {
            value: a.to_string(),
            reason: "a conversation needs two distinct participants",
        });
    }
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    Ok(ConversationKey {
        key: format!("{low}{KEY_SEPARATOR}{high}"),
        low: low.clone(),
        high: high.clone(),
    })
}
