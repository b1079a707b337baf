//! Broadcast bus for fan-out lifecycle events.
//!
//! The orchestrator publishes; observers (the CLI `--events` flag, a host
//! app's UI) subscribe before the run and read what it emitted.

use crate::models::FanoutEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Broadcast bus carrying [`FanoutEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FanoutEvent>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

impl EventBus {
    /// Creates a bus that buffers up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event. With no subscribers the event is dropped.
    pub fn publish(&self, event: FanoutEvent) {
        metrics::counter!("event_bus_publish_total", "event_type" => event.event_type())
            .increment(1);
        if self.sender.send(event).is_err() {
            metrics::counter!("event_bus_publish_failed_total").increment(1);
        }
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FanoutEvent> {
        metrics::counter!("event_bus_subscriptions_total").increment(1);
        self.sender.subscribe()
    }
}

/// Takes every event already buffered in `receiver` without waiting.
///
/// Events overwritten because the subscriber fell behind are counted in
/// `event_bus_lagged_total` and skipped.
pub fn drain_pending(receiver: &mut broadcast::Receiver<FanoutEvent>) -> Vec<FanoutEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                metrics::counter!("event_bus_lagged_total").increment(skipped);
            },
            Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
        }
    }
}
