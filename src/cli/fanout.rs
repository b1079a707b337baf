//! Alert, share-location, and uncontacted commands.

use super::{OutputFormat, print_json};
use crate::config::LifelineConfig;
use crate::location::{LocationResolver, StaticLocationResolver};
use crate::models::{FanoutEvent, FanoutMode, FanoutOutcome, FanoutResult};
use crate::observability::{EventBus, drain_pending};
use crate::services::FanoutOrchestrator;
use crate::storage::SqliteStore;
use std::sync::Arc;

/// Arguments shared by `alert` and `share-location`.
#[derive(Debug, Clone, Default)]
pub struct FanoutArgs {
    /// Sending user.
    pub user: String,
    /// Latitude overriding the configured fix.
    pub latitude: Option<f64>,
    /// Longitude overriding the configured fix.
    pub longitude: Option<f64>,
    /// Output format.
    pub format: OutputFormat,
    /// Print lifecycle events to stderr once the run ends.
    pub events: bool,
}

const EVENT_BUFFER: usize = 1024;

impl FanoutArgs {
    /// Location source: explicit coordinates win over configuration.
    fn resolver(&self, config: &LifelineConfig) -> StaticLocationResolver {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => StaticLocationResolver::at(latitude, longitude),
            _ => StaticLocationResolver::from_settings(&config.location),
        }
    }
}

fn orchestrator(
    config: &LifelineConfig,
    store: &Arc<SqliteStore>,
    location: Arc<dyn LocationResolver>,
) -> FanoutOrchestrator {
    FanoutOrchestrator::new(store.clone(), store.clone(), location).with_config(config)
}

/// Runs a fan-out and prints its result.
///
/// # Errors
///
/// Returns an error if the fan-out aborts or the result cannot be printed.
pub async fn cmd_fanout(
    config: &LifelineConfig,
    store: &Arc<SqliteStore>,
    args: &FanoutArgs,
    mode: FanoutMode,
) -> anyhow::Result<FanoutOutcome> {
    let location = Arc::new(args.resolver(config));
    let mut fanout = orchestrator(config, store, location);
    let mut events = None;
    if args.events {
        let bus = EventBus::new(EVENT_BUFFER);
        events = Some(bus.subscribe());
        fanout = fanout.with_event_bus(bus);
    }

    let run = fanout.run(&args.user, mode).await;
    // Aborted runs emit events too, so print before propagating.
    if let Some(receiver) = events.as_mut() {
        for event in drain_pending(receiver) {
            eprintln!("{}", describe_event(&event));
        }
    }
    let result = run?;

    match args.format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_result(&result),
    }

    Ok(result.outcome())
}

/// One-line rendering of a lifecycle event.
fn describe_event(event: &FanoutEvent) -> String {
    let detail = match event {
        FanoutEvent::Started {
            user,
            mode,
            targets,
            ..
        } => format!("{user} {mode} to {targets} target(s)"),
        FanoutEvent::TargetDelivered { key, kind, .. } => {
            format!("{key} ({})", kind.as_str())
        },
        FanoutEvent::TargetFailed {
            key, stage, error, ..
        } => format!("{key} at {stage}: {error}"),
        FanoutEvent::Completed {
            attempted,
            succeeded,
            ..
        } => format!("{succeeded} of {attempted} succeeded"),
        FanoutEvent::Aborted { reason, .. } => reason.clone(),
    };
    format!(
        "[{}] {} {detail}",
        event.meta().alert_id,
        event.event_type()
    )
}

fn print_result(result: &FanoutResult) {
    println!("{} ({})", result.summary(), result.mode);
    println!("Alert ID: {}", result.alert_id);
    println!("Location: {}", result.location_text);

    if !result.targets.is_empty() {
        println!();
        println!("{:<40} {:<9} {:<9} STATUS", "CONVERSATION", "KIND", "MESSAGES");
        println!("{}", "-".repeat(72));
        for target in &result.targets {
            let status = result
                .per_target_errors
                .get(&target.key)
                .map_or_else(|| "ok".to_string(), |e| format!("failed at {e}"));
            println!(
                "{:<40} {:<9} {:<9} {status}",
                target.key.as_str(),
                target.kind.as_str(),
                target.messages_appended
            );
        }
    }

    for rejected in &result.rejected_contacts {
        println!("Skipped contact '{}': {}", rejected.contact, rejected.reason);
    }
}

/// Prints the emergency contacts `user` has no conversation with.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn cmd_uncontacted(
    config: &LifelineConfig,
    store: &Arc<SqliteStore>,
    user: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let location = Arc::new(StaticLocationResolver::from_settings(&config.location));
    let uncontacted = orchestrator(config, store, location).uncontacted(user).await?;

    match format {
        OutputFormat::Json => print_json(&uncontacted)?,
        OutputFormat::Table => {
            if uncontacted.is_empty() {
                println!("Every emergency contact already has a conversation.");
            }
            for identity in &uncontacted {
                println!("{identity}");
            }
        },
    }

    Ok(())
}
