//! Emergency fan-out orchestration.
//!
//! One call discovers the user's targets, acquires a location fix, and then
//! delivers to every target concurrently:
//!
//! 1. List the user's conversations and emergency contacts.
//! 2. Index the conversations and resolve uncontacted contacts.
//! 3. Acquire the location fix. Failure aborts before any write.
//! 4. Look up the sender's display name, falling back on failure.
//! 5. Compose the alert and location texts.
//! 6. Existing targets: append alert, append location, update metadata.
//! 7. New targets: create the conversation, then as in 6.
//! 8. Target sequences run in parallel, isolated from each other.
//! 9. Aggregate one [`FanoutResult`].
//!
//! Target sequences run as detached tasks; dropping the returned future
//! does not interrupt a sequence that already started.

use super::{ConversationIndex, MessageComposer, Uncontacted, resolve_uncontacted};
use crate::config::{DEFAULT_FALLBACK_NAME, FanoutConfig, LifelineConfig};
use crate::location::{LocationError, LocationResolver};
use crate::models::{
    ConversationKey, ConversationUpsert, DeliveryStage, EventMeta, FanoutEvent, FanoutMode,
    FanoutResult, Identity, LocationFix, Message, MessageId, TargetError, TargetKind,
    TargetReport, canonicalize,
};
use crate::observability::EventBus;
use crate::storage::{ConversationStore, ProfileStore};
use crate::{Error, Result};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

/// Runs emergency fan-outs against the configured stores.
pub struct FanoutOrchestrator {
    conversations: Arc<dyn ConversationStore>,
    profiles: Arc<dyn ProfileStore>,
    location: Arc<dyn LocationResolver>,
    composer: MessageComposer,
    fallback_name: String,
    config: FanoutConfig,
    event_bus: Option<EventBus>,
}

/// Targets discovered in steps 1 and 2.
struct Discovery {
    index: ConversationIndex,
    uncontacted: Uncontacted,
}

/// A target and whether its conversation exists yet.
#[derive(Debug, Clone)]
struct TargetPlan {
    key: ConversationKey,
    kind: TargetKind,
}

/// Outcome of one target sequence.
#[derive(Debug)]
struct TargetOutcome {
    messages_appended: usize,
    error: Option<TargetError>,
}

impl TargetOutcome {
    fn task_failed(cause: impl std::fmt::Display) -> Self {
        Self {
            messages_appended: 0,
            error: Some(TargetError {
                stage: DeliveryStage::Task,
                cause: cause.to_string(),
            }),
        }
    }
}

/// Read-only inputs shared by every target sequence of one call.
struct Delivery {
    store: Arc<dyn ConversationStore>,
    sender: Identity,
    sender_name: String,
    alert_text: Option<String>,
    location_text: String,
}

impl FanoutOrchestrator {
    /// Creates an orchestrator with default texts and concurrency.
    #[must_use]
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        profiles: Arc<dyn ProfileStore>,
        location: Arc<dyn LocationResolver>,
    ) -> Self {
        Self {
            conversations,
            profiles,
            location,
            composer: MessageComposer::default(),
            fallback_name: DEFAULT_FALLBACK_NAME.to_string(),
            config: FanoutConfig::default(),
            event_bus: None,
        }
    }

    /// Applies message and fan-out settings from `config`.
    #[must_use]
    pub fn with_config(mut self, config: &LifelineConfig) -> Self {
        self.composer = MessageComposer::from_settings(&config.messages);
        self.fallback_name.clone_from(&config.messages.fallback_name);
        self.config = config.fanout.clone();
        self
    }

    /// Sets the message composer.
    #[must_use]
    pub fn with_composer(mut self, composer: MessageComposer) -> Self {
        self.composer = composer;
        self
    }

    /// Sets the sender name used when the profile lookup fails.
    #[must_use]
    pub fn with_fallback_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_name = name.into();
        self
    }

    /// Sets the fan-out concurrency settings.
    #[must_use]
    pub fn with_fanout_config(mut self, config: FanoutConfig) -> Self {
        self.config = config;
        self
    }

    /// Publishes lifecycle events to `bus`.
    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Sends the alert and location messages to all of `user`'s targets.
    ///
    /// # Errors
    ///
    /// See [`FanoutOrchestrator::run`].
    pub async fn send_emergency_alert(&self, user: &str) -> Result<FanoutResult> {
        self.run(user, FanoutMode::EmergencyAlert).await
    }

    /// Sends only the location message to all of `user`'s targets.
    ///
    /// # Errors
    ///
    /// See [`FanoutOrchestrator::run`].
    pub async fn share_location(&self, user: &str) -> Result<FanoutResult> {
        self.run(user, FanoutMode::ShareLocation).await
    }

    /// Returns the emergency contacts `user` has no conversation with.
    ///
    /// Read-only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] for a malformed `user` and
    /// [`Error::Store`] if the conversations or contacts cannot be listed.
    pub async fn uncontacted(&self, user: &str) -> Result<Vec<Identity>> {
        let user = Identity::new(user)?;
        Ok(self.discover(&user).await?.uncontacted.targets)
    }

    /// Runs one fan-out.
    ///
    /// Per-target failures are reported in the result, never as an error.
    ///
    /// # Errors
    ///
    /// Returns an error, with nothing written, if:
    /// - `user` is not a valid identity
    /// - the user's conversations or contacts cannot be listed
    /// - no location fix can be acquired
    #[instrument(
        name = "lifeline.fanout",
        skip(self, mode),
        fields(alert_id = tracing::field::Empty, mode = mode.as_str())
    )]
    pub async fn run(&self, user: &str, mode: FanoutMode) -> Result<FanoutResult> {
        let start = Instant::now();
        let alert_id = uuid::Uuid::now_v7().to_string();
        tracing::Span::current().record("alert_id", alert_id.as_str());
        metrics::counter!("fanout_alerts_total", "mode" => mode.as_str()).increment(1);

        let result = self.run_inner(user, mode, &alert_id).await;

        let status = if result.is_ok() { "completed" } else { "aborted" };
        metrics::histogram!(
            "fanout_duration_ms",
            "mode" => mode.as_str(),
            "status" => status
        )
        .record(start.elapsed().as_secs_f64() * 1000.0);

        if let Err(e) = &result {
            metrics::counter!("fanout_aborted_total", "reason" => abort_reason(e)).increment(1);
            warn!(alert_id = %alert_id, error = %e, "Fan-out aborted before any write");
            self.publish(FanoutEvent::Aborted {
                meta: EventMeta::new(&alert_id),
                reason: e.to_string(),
            });
        }

        result
    }

    async fn run_inner(&self, user: &str, mode: FanoutMode, alert_id: &str) -> Result<FanoutResult> {
        let user = Identity::new(user)?;

        let discovery = self.discover(&user).await?;
        let fix = self.acquire_location().await?;
        let sender_name = self.sender_name(&user).await;

        let location_text = self.composer.location_text(&fix);
        let delivery = Arc::new(Delivery {
            store: Arc::clone(&self.conversations),
            sender: user.clone(),
            sender_name,
            alert_text: mode
                .sends_alert()
                .then(|| self.composer.alert_text().to_string()),
            location_text: location_text.clone(),
        });

        let plans = plan_targets(&user, &discovery)?;
        info!(
            user = %user,
            existing = discovery.index.len(),
            new = discovery.uncontacted.targets.len(),
            rejected = discovery.uncontacted.rejected.len(),
            "Starting fan-out"
        );
        self.publish(FanoutEvent::Started {
            meta: EventMeta::new(alert_id),
            user: user.clone(),
            mode,
            targets: plans.len(),
        });
        metrics::counter!("fanout_targets_attempted_total").increment(plans.len() as u64);

        let handles = self.spawn_targets(&plans, &delivery);

        let mut per_target_errors = BTreeMap::new();
        let mut targets = Vec::with_capacity(plans.len());
        for (plan, handle) in plans.into_iter().zip(handles) {
            let outcome = handle.await.unwrap_or_else(TargetOutcome::task_failed);
            let succeeded = outcome.error.is_none();

            if let Some(error) = outcome.error {
                warn!(
                    alert_id,
                    key = %plan.key,
                    kind = plan.kind.as_str(),
                    stage = error.stage.as_str(),
                    error = %error.cause,
                    "Target delivery failed"
                );
                metrics::counter!("fanout_targets_failed_total", "stage" => error.stage.as_str())
                    .increment(1);
                self.publish(FanoutEvent::TargetFailed {
                    meta: EventMeta::new(alert_id),
                    key: plan.key.clone(),
                    stage: error.stage,
                    error: error.cause.clone(),
                });
                per_target_errors.insert(plan.key.clone(), error);
            } else {
                self.publish(FanoutEvent::TargetDelivered {
                    meta: EventMeta::new(alert_id),
                    key: plan.key.clone(),
                    kind: plan.kind,
                });
            }

            targets.push(TargetReport {
                key: plan.key,
                kind: plan.kind,
                messages_appended: outcome.messages_appended,
                succeeded,
            });
        }

        let targets_succeeded = targets.iter().filter(|t| t.succeeded).count();
        let result = FanoutResult {
            alert_id: alert_id.to_string(),
            mode,
            targets_attempted: targets.len(),
            targets_succeeded,
            per_target_errors,
            targets,
            rejected_contacts: discovery.uncontacted.rejected,
            location_text,
        };

        info!(
            alert_id,
            attempted = result.targets_attempted,
            succeeded = result.targets_succeeded,
            outcome = %result.summary(),
            "Fan-out finished"
        );
        self.publish(FanoutEvent::Completed {
            meta: EventMeta::new(alert_id),
            outcome: result.outcome(),
            attempted: result.targets_attempted,
            succeeded: result.targets_succeeded,
        });

        Ok(result)
    }

    /// Steps 1 and 2.
    async fn discover(&self, user: &Identity) -> Result<Discovery> {
        let store = Arc::clone(&self.conversations);
        let owner = user.clone();
        let (conversations, contacts) = blocking("discover_targets", move || {
            Ok((store.list_conversations(&owner)?, store.list_contacts(&owner)?))
        })
        .await?;

        let index = ConversationIndex::build(user, &conversations);
        let uncontacted = resolve_uncontacted(&contacts, &index);
        for rejected in &uncontacted.rejected {
            warn!(contact = %rejected.contact, reason = %rejected.reason, "Skipping emergency contact");
        }

        Ok(Discovery { index, uncontacted })
    }

    /// Step 3.
    async fn acquire_location(&self) -> Result<LocationFix> {
        let resolver = Arc::clone(&self.location);
        let fix = blocking("acquire_location", move || Ok(resolver.acquire()?)).await?;
        if !fix.is_valid() {
            return Err(LocationError::Unavailable(format!(
                "coordinates out of range: {},{}",
                fix.latitude, fix.longitude
            ))
            .into());
        }
        Ok(fix)
    }

    /// Step 4. Never fails.
    async fn sender_name(&self, user: &Identity) -> String {
        let profiles = Arc::clone(&self.profiles);
        let identity = user.clone();
        match blocking("get_display_name", move || profiles.get_display_name(&identity)).await {
            Ok(name) => name,
            Err(e) => {
                warn!(
                    user = %user,
                    error = %e,
                    fallback = %self.fallback_name,
                    "Display name lookup failed, using fallback"
                );
                self.fallback_name.clone()
            },
        }
    }

    /// Starts one detached task per target, at most
    /// `max_concurrent_targets` of them running at once.
    fn spawn_targets(
        &self,
        plans: &[TargetPlan],
        delivery: &Arc<Delivery>,
    ) -> Vec<JoinHandle<TargetOutcome>> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_targets.max(1)));

        plans
            .iter()
            .cloned()
            .map(|plan| {
                let delivery = Arc::clone(delivery);
                let permits = Arc::clone(&permits);
                let span = info_span!(
                    "lifeline.fanout.target",
                    key = %plan.key,
                    kind = plan.kind.as_str()
                );

                tokio::spawn(
                    async move {
                        let _permit = match permits.acquire_owned().await {
                            Ok(permit) => permit,
                            Err(e) => return TargetOutcome::task_failed(e),
                        };
                        let span = tracing::Span::current();
                        tokio::task::spawn_blocking(move || {
                            let _entered = span.enter();
                            delivery.deliver(&plan)
                        })
                        .await
                        .unwrap_or_else(TargetOutcome::task_failed)
                    }
                    .instrument(span),
                )
            })
            .collect()
    }

    fn publish(&self, event: FanoutEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

impl Delivery {
    /// Runs one target's sequence, stopping at the first failure.
    fn deliver(&self, plan: &TargetPlan) -> TargetOutcome {
        let mut messages_appended = 0;
        let result = self.deliver_steps(plan, &mut messages_appended);

        TargetOutcome {
            messages_appended,
            error: result.err(),
        }
    }

    fn deliver_steps(
        &self,
        plan: &TargetPlan,
        messages_appended: &mut usize,
    ) -> std::result::Result<(), TargetError> {
        if plan.kind == TargetKind::New {
            self.store
                .upsert_conversation(&ConversationUpsert::ensure(plan.key.clone()))
                .map_err(|e| stage_error(DeliveryStage::CreateConversation, &e))?;
            debug!("Created conversation");
        }

        let mut previous_at = None;
        if let Some(alert_text) = &self.alert_text {
            let alert = self.message(&plan.key, alert_text, None);
            self.store
                .append_message(&alert)
                .map_err(|e| stage_error(DeliveryStage::AppendAlert, &e))?;
            *messages_appended += 1;
            debug!(message_id = %alert.id, "Appended alert message");
            previous_at = Some(alert.created_at);
        }

        let location = self.message(&plan.key, &self.location_text, previous_at);
        self.store
            .append_message(&location)
            .map_err(|e| stage_error(DeliveryStage::AppendLocation, &e))?;
        *messages_appended += 1;
        debug!(message_id = %location.id, "Appended location message");

        self.store
            .upsert_conversation(&ConversationUpsert::reflecting(&location))
            .map_err(|e| stage_error(DeliveryStage::UpdateMetadata, &e))
    }

    /// Builds a message stamped strictly after `after`, if given.
    fn message(&self, key: &ConversationKey, text: &str, after: Option<DateTime<Utc>>) -> Message {
        Message {
            id: MessageId::generate(),
            conversation_key: key.clone(),
            created_at: timestamp_after(after),
            text: text.to_string(),
            sender: self.sender.clone(),
            sender_name: self.sender_name.clone(),
        }
    }
}

/// Existing targets first, in store order, then new ones in contact order.
fn plan_targets(user: &Identity, discovery: &Discovery) -> Result<Vec<TargetPlan>> {
    let existing = discovery.index.keys().iter().map(|key| -> Result<TargetPlan> {
        Ok(TargetPlan {
            key: key.clone(),
            kind: TargetKind::Existing,
        })
    });
    let new = discovery.uncontacted.targets.iter().map(|contact| -> Result<TargetPlan> {
        Ok(TargetPlan {
            key: canonicalize(user, contact)?,
            kind: TargetKind::New,
        })
    });
    existing.chain(new).collect()
}

/// Current time at millisecond precision, bumped past `after`.
fn timestamp_after(after: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(3);
    let min = after
        .map(|t| t.trunc_subsecs(3))
        .and_then(|t| t.checked_add_signed(TimeDelta::milliseconds(1)));
    match min {
        Some(min) if now < min => min,
        _ => now,
    }
}

fn stage_error(stage: DeliveryStage, error: &Error) -> TargetError {
    TargetError {
        stage,
        cause: error.to_string(),
    }
}

const fn abort_reason(error: &Error) -> &'static str {
    match error {
        Error::InvalidIdentity { .. } => "invalid_identity",
        Error::Location(LocationError::PermissionDenied) => "permission_denied",
        Error::Location(LocationError::Unavailable(_)) => "location_unavailable",
        Error::Store { .. } => "store",
        _ => "other",
    }
}

/// Runs a synchronous port call on the blocking pool.
async fn blocking<T, F>(operation: &'static str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::OperationFailed {
            operation: operation.to_string(),
            cause: e.to_string(),
        })?
}
