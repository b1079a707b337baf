//! Fan-out requests and aggregate results.

use super::ConversationKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What each target conversation receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutMode {
    /// Alert text followed by the location link.
    #[default]
    EmergencyAlert,
    /// Location link only.
    ShareLocation,
}

impl FanoutMode {
    /// Returns the mode name used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmergencyAlert => "emergency_alert",
            Self::ShareLocation => "share_location",
        }
    }

    /// Returns whether the alert message precedes the location message.
    #[must_use]
    pub const fn sends_alert(self) -> bool {
        matches!(self, Self::EmergencyAlert)
    }
}

impl fmt::Display for FanoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a target conversation existed before the fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// The user already had a conversation with this counterpart.
    Existing,
    /// An uncontacted emergency contact; the conversation is created.
    New,
}

impl TargetKind {
    /// Returns the kind name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Existing => "existing",
            Self::New => "new",
        }
    }
}

/// Step of a target's delivery sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStage {
    /// Upserting the new conversation record.
    CreateConversation,
    /// Appending the alert message.
    AppendAlert,
    /// Appending the location message.
    AppendLocation,
    /// Upserting last-message metadata.
    UpdateMetadata,
    /// The target's task itself failed (panicked or was cancelled).
    Task,
}

impl DeliveryStage {
    /// Returns the stage name used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateConversation => "create_conversation",
            Self::AppendAlert => "append_alert",
            Self::AppendLocation => "append_location",
            Self::UpdateMetadata => "update_metadata",
            Self::Task => "task",
        }
    }
}

impl fmt::Display for DeliveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First error hit by a failed target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetError {
    /// Where the sequence stopped.
    pub stage: DeliveryStage,
    /// The underlying cause.
    pub cause: String,
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.cause)
    }
}

/// Per-target line of a [`FanoutResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    /// Target conversation.
    pub key: ConversationKey,
    /// Existing or newly created.
    pub kind: TargetKind,
    /// Messages appended before the sequence finished or failed.
    pub messages_appended: usize,
    /// Whether the whole sequence succeeded.
    pub succeeded: bool,
}

/// An emergency contact that could not be targeted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedContact {
    /// The contact value as stored.
    pub contact: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Aggregate outcome of one fan-out call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanoutResult {
    /// Correlation id shared by every log line of this call.
    pub alert_id: String,
    /// What was sent.
    pub mode: FanoutMode,
    /// Number of target sequences started.
    pub targets_attempted: usize,
    /// Number of target sequences that completed.
    pub targets_succeeded: usize,
    /// First error of each failed target.
    pub per_target_errors: BTreeMap<ConversationKey, TargetError>,
    /// One line per target, existing targets first.
    pub targets: Vec<TargetReport>,
    /// Emergency contacts skipped before fan-out.
    pub rejected_contacts: Vec<RejectedContact>,
    /// The location link that was sent.
    pub location_text: String,
}

/// Caller-facing projection of a [`FanoutResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutOutcome {
    /// The user has no conversations and no emergency contacts.
    NoTargets,
    /// Every target succeeded.
    AllSucceeded,
    /// Some, but not all, targets succeeded.
    Partial,
    /// Every target failed.
    TotalFailure,
}

impl FanoutResult {
    /// Projects the counts into an outcome.
    #[must_use]
    pub const fn outcome(&self) -> FanoutOutcome {
        if self.targets_attempted == 0 {
            FanoutOutcome::NoTargets
        } else if self.targets_succeeded == self.targets_attempted {
            FanoutOutcome::AllSucceeded
        } else if self.targets_succeeded == 0 {
            FanoutOutcome::TotalFailure
        } else {
            FanoutOutcome::Partial
        }
    }

    /// Returns whether every attempted target succeeded.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(
            self.outcome(),
            FanoutOutcome::AllSucceeded | FanoutOutcome::NoTargets
        )
    }

    /// Short user-facing summary.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.outcome() {
            FanoutOutcome::NoTargets => "no recipients".to_string(),
            FanoutOutcome::AllSucceeded => "sent".to_string(),
            FanoutOutcome::Partial => format!(
                "sent to {} of {}",
                self.targets_succeeded, self.targets_attempted
            ),
            FanoutOutcome::TotalFailure => "failed".to_string(),
        }
    }

    /// Returns the report for `key`, if it was a target.
    #[must_use]
    pub fn target(&self, key: &ConversationKey) -> Option<&TargetReport> {
        self.targets.iter().find(|t| &t.key == key)
    }
}
