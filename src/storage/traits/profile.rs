//! Profile store trait.

use crate::Result;
use crate::models::Identity;

/// Display-name lookup used to attribute outgoing messages.
pub trait ProfileStore: Send + Sync {
    /// Returns the display name registered for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] when no profile exists, or
    /// [`crate::Error::Store`] when the lookup itself fails.
    fn get_display_name(&self, identity: &Identity) -> Result<String>;

    /// Sets the display name for `identity`, creating the profile if needed.
    fn set_display_name(&self, identity: &Identity, name: &str) -> Result<()>;
}
