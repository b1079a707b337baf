//! Position fixes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single position fix.
///
/// Produced once per fan-out and only ever rendered into a link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// When the fix was taken.
    pub captured_at: DateTime<Utc>,
}

impl LocationFix {
    /// Creates a fix captured now.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self::captured(latitude, longitude, Utc::now())
    }

    /// Creates a fix with an explicit capture time.
    #[must_use]
    pub const fn captured(latitude: f64, longitude: f64, captured_at: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            captured_at,
        }
    }

    /// Returns whether both coordinates are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(31.5, 74.3, true ; "lahore")]
    #[test_case(-90.0, 180.0, true ; "bounds inclusive")]
    #[test_case(91.0, 0.0, false ; "latitude out of range")]
    #[test_case(0.0, -180.5, false ; "longitude out of range")]
    #[test_case(f64::NAN, 0.0, false ; "nan")]
    fn test_is_valid(lat: f64, lon: f64, expected: bool) {
        assert_eq!(LocationFix::new(lat, lon).is_valid(), expected);
    }
}
