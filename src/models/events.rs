//! Fan-out lifecycle events for observers.

use super::{ConversationKey, DeliveryStage, FanoutMode, FanoutOutcome, Identity, TargetKind};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Shared event metadata.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// Unique identifier for this event.
    pub event_id: String,
    /// Alert the event belongs to.
    pub alert_id: String,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

impl EventMeta {
    /// Creates event metadata stamped now.
    #[must_use]
    pub fn new(alert_id: &str) -> Self {
        Self::with_timestamp(alert_id, Utc::now())
    }

    /// Creates event metadata with a specified timestamp.
    #[must_use]
    pub fn with_timestamp(alert_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            alert_id: alert_id.to_string(),
            timestamp,
        }
    }
}

/// Events emitted while a fan-out runs.
#[derive(Debug, Clone)]
pub enum FanoutEvent {
    /// Location was acquired and target sequences are about to start.
    Started {
        /// Event metadata.
        meta: EventMeta,
        /// The sending user.
        user: Identity,
        /// What is being sent.
        mode: FanoutMode,
        /// Number of targets.
        targets: usize,
    },
    /// A target's whole sequence succeeded.
    TargetDelivered {
        /// Event metadata.
        meta: EventMeta,
        /// Target conversation.
        key: ConversationKey,
        /// Existing or new.
        kind: TargetKind,
    },
    /// A target's sequence stopped on an error.
    TargetFailed {
        /// Event metadata.
        meta: EventMeta,
        /// Target conversation.
        key: ConversationKey,
        /// Failing step.
        stage: DeliveryStage,
        /// Error message.
        error: String,
    },
    /// All target sequences finished.
    Completed {
        /// Event metadata.
        meta: EventMeta,
        /// Aggregate projection.
        outcome: FanoutOutcome,
        /// Targets attempted.
        attempted: usize,
        /// Targets succeeded.
        succeeded: usize,
    },
    /// The call was aborted before any write.
    Aborted {
        /// Event metadata.
        meta: EventMeta,
        /// Abort reason.
        reason: String,
    },
}

impl FanoutEvent {
    /// Returns the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "fanout.started",
            Self::TargetDelivered { .. } => "fanout.target_delivered",
            Self::TargetFailed { .. } => "fanout.target_failed",
            Self::Completed { .. } => "fanout.completed",
            Self::Aborted { .. } => "fanout.aborted",
        }
    }

    /// Returns the event metadata.
    #[must_use]
    pub const fn meta(&self) -> &EventMeta {
        match self {
            Self::Started { meta, .. }
            | Self::TargetDelivered { meta, .. }
            | Self::TargetFailed { meta, .. }
            | Self::Completed { meta, .. }
            | Self::Aborted { meta, .. } => meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        let event = FanoutEvent::Aborted {
            meta: EventMeta::new("alert-1"),
            reason: "location permission denied".to_string(),
        };
        assert_eq!(event.event_type(), "fanout.aborted");
        assert_eq!(event.meta().alert_id, "alert-1");
    }
}
