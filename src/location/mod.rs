//! Location acquisition.
//!
//! The fan-out consumes a [`LocationResolver`] and treats both of its
//! failures as fatal: an alert without a position is not sent at all.
//! Device geolocation lives in the host application; this module only ships
//! a resolver for fixes known up front (CLI arguments, configuration, tests).

use crate::config::LocationSettings;
use crate::models::LocationFix;
use thiserror::Error as ThisError;

/// Why no fix could be produced.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum LocationError {
    /// The user did not grant location access.
    #[error("location permission denied")]
    PermissionDenied,

    /// Access was granted but no position is available.
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Source of the position fix rendered into every location message.
pub trait LocationResolver: Send + Sync {
    /// Produces a fix for the current position.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::PermissionDenied`] or
    /// [`LocationError::Unavailable`].
    fn acquire(&self) -> Result<LocationFix, LocationError>;
}

/// Resolver that always returns the same answer.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticLocationResolver {
    answer: Result<(f64, f64), LocationError>,
}

impl StaticLocationResolver {
    /// Resolves to a fixed position, stamped at each call.
    #[must_use]
    pub const fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            answer: Ok((latitude, longitude)),
        }
    }

    /// Always fails with [`LocationError::PermissionDenied`].
    #[must_use]
    pub const fn denied() -> Self {
        Self {
            answer: Err(LocationError::PermissionDenied),
        }
    }

    /// Always fails with [`LocationError::Unavailable`].
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            answer: Err(LocationError::Unavailable(reason.into())),
        }
    }

    /// Builds a resolver from location settings.
    ///
    /// Disabled location means the permission was not granted; enabled
    /// location without coordinates has no fix to offer.
    #[must_use]
    pub fn from_settings(settings: &LocationSettings) -> Self {
        if !settings.enabled {
            return Self::denied();
        }
        match (settings.latitude, settings.longitude) {
            (Some(latitude), Some(longitude)) => Self::at(latitude, longitude),
            _ => Self::unavailable("no coordinates configured"),
        }
    }
}

impl LocationResolver for StaticLocationResolver {
    fn acquire(&self) -> Result<LocationFix, LocationError> {
        self.answer
            .clone()
            .map(|(latitude, longitude)| LocationFix::new(latitude, longitude))
    }
}
