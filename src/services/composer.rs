//! Emergency message texts.

use crate::config::{DEFAULT_ALERT_TEXT, DEFAULT_MAPS_BASE_URL, MessageSettings};
use crate::models::LocationFix;

/// Builds the two texts a fan-out sends.
///
/// Both outputs depend only on the composer's settings and the fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageComposer {
    alert_text: String,
    maps_base_url: String,
}

impl Default for MessageComposer {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_TEXT, DEFAULT_MAPS_BASE_URL)
    }
}

impl MessageComposer {
    /// Creates a composer.
    #[must_use]
    pub fn new(alert_text: impl Into<String>, maps_base_url: impl Into<String>) -> Self {
        Self {
            alert_text: alert_text.into(),
            maps_base_url: maps_base_url.into(),
        }
    }

    /// Creates a composer from message settings.
    #[must_use]
    pub fn from_settings(settings: &MessageSettings) -> Self {
        Self::new(&settings.alert_text, &settings.maps_base_url)
    }

    /// The fixed emergency phrase.
    #[must_use]
    pub fn alert_text(&self) -> &str {
        &self.alert_text
    }

    /// Maps link for `fix`: `{base}?q={latitude},{longitude}`.
    ///
    /// Coordinates are written as-is; the capture time is not included.
    #[must_use]
    pub fn location_text(&self, fix: &LocationFix) -> String {
        let joiner = if self.maps_base_url.contains('?') {
            '&'
        } else {
            '?'
        };
        format!(
            "{}{joiner}q={},{}",
            self.maps_base_url, fix.latitude, fix.longitude
        )
    }
}
