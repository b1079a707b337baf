//! Chaos testing for fan-out under store failures and concurrency.
//!
//! Wraps the in-memory store with fault injection to check:
//! - One failing target does not affect its siblings
//! - Each delivery stage reports its own failure
//! - Discovery failures abort before any write
//! - Profile failures fall back to the default sender name
//! - Concurrent double triggers never duplicate a conversation
//! - Abandoning the call does not cut a target's sequence short

// Chaos tests use expect/unwrap/panic for simplicity - panics are acceptable in tests
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::significant_drop_tightening
)]

use lifeline::location::StaticLocationResolver;
use lifeline::models::{
    Conversation, ConversationUpsert, DeliveryStage, FanoutOutcome, Message,
};
use lifeline::{
    ContactStore, ConversationKey, ConversationStore, EmergencyContact, Error, FanoutConfig,
    FanoutOrchestrator, Identity, InMemoryStore, ProfileStore, Result,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const ALERT: &str = "Help Needed, I am in danger. Here is My Current Location";

fn id(s: &str) -> Identity {
    Identity::new(s).expect("identity")
}

fn key(a: &str, b: &str) -> ConversationKey {
    ConversationKey::for_pair(a, b).expect("key")
}

/// In-memory store with injectable faults.
#[derive(Default)]
struct FaultyStore {
    inner: InMemoryStore,
    fail_alert_for: Option<ConversationKey>,
    fail_location_for: Option<ConversationKey>,
    fail_metadata_for: Option<ConversationKey>,
    fail_create_for: Option<ConversationKey>,
    fail_listing: bool,
    fail_profile: bool,
    append_delay: Option<Duration>,
    append_started: Option<mpsc::UnboundedSender<ConversationKey>>,
    appends: AtomicUsize,
}

fn injected(operation: &str) -> Error {
    Error::store(operation, "injected fault")
}

impl ConversationStore for FaultyStore {
    fn list_conversations(&self, participant: &Identity) -> Result<Vec<Conversation>> {
        if self.fail_listing {
            return Err(injected("list_conversations"));
        }
        self.inner.list_conversations(participant)
    }

    fn get_conversation(&self, key: &ConversationKey) -> Result<Option<Conversation>> {
        self.inner.get_conversation(key)
    }

    fn list_contacts(&self, owner: &Identity) -> Result<Vec<EmergencyContact>> {
        self.inner.list_contacts(owner)
    }

    fn append_message(&self, message: &Message) -> Result<()> {
        if let Some(tx) = &self.append_started {
            let _ = tx.send(message.conversation_key.clone());
        }
        if let Some(delay) = self.append_delay {
            std::thread::sleep(delay);
        }
        let key = Some(&message.conversation_key);
        if message.text == ALERT && self.fail_alert_for.as_ref() == key {
            return Err(injected("append_message"));
        }
        if message.text != ALERT && self.fail_location_for.as_ref() == key {
            return Err(injected("append_message"));
        }
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.inner.append_message(message)
    }

    fn upsert_conversation(&self, upsert: &ConversationUpsert) -> Result<()> {
        let key = Some(&upsert.key);
        if upsert.last_message.is_some() && self.fail_metadata_for.as_ref() == key {
            return Err(injected("upsert_conversation"));
        }
        if upsert.last_message.is_none() && self.fail_create_for.as_ref() == key {
            return Err(injected("upsert_conversation"));
        }
        self.inner.upsert_conversation(upsert)
    }

    fn list_messages(&self, key: &ConversationKey) -> Result<Vec<Message>> {
        self.inner.list_messages(key)
    }
}

impl ProfileStore for FaultyStore {
    fn get_display_name(&self, identity: &Identity) -> Result<String> {
        if self.fail_profile {
            return Err(injected("get_display_name"));
        }
        self.inner.get_display_name(identity)
    }

    fn set_display_name(&self, identity: &Identity, name: &str) -> Result<()> {
        self.inner.set_display_name(identity, name)
    }
}

/// U1 has conversations with C1 and C2 and an uncontacted contact C3.
fn seeded(store: FaultyStore) -> Arc<FaultyStore> {
    for counterpart in ["C1", "C2"] {
        store
            .inner
            .upsert_conversation(&ConversationUpsert::ensure(key("U1", counterpart)))
            .expect("seed");
    }
    store
        .inner
        .add_contact(&EmergencyContact::new(id("U1"), "C3"))
        .expect("seed");
    store
        .inner
        .set_display_name(&id("U1"), "Ayesha")
        .expect("seed");
    Arc::new(store)
}

fn orchestrator(store: &Arc<FaultyStore>) -> FanoutOrchestrator {
    FanoutOrchestrator::new(
        store.clone(),
        store.clone(),
        Arc::new(StaticLocationResolver::at(31.5, 74.3)),
    )
}

fn assert_ordered_pair(store: &FaultyStore, key: &ConversationKey) {
    let messages = store.list_messages(key).expect("messages");
    assert_eq!(messages.len(), 2, "conversation {key}");
    assert_eq!(messages[0].text, ALERT);
    assert!(messages[1].text.ends_with("?q=31.5,74.3"));
    assert!(messages[0].created_at < messages[1].created_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_failed_append_is_isolated() {
    let store = seeded(FaultyStore {
        fail_alert_for: Some(key("U1", "C2")),
        ..FaultyStore::default()
    });

    let result = orchestrator(&store)
        .send_emergency_alert("U1")
        .await
        .expect("fanout");

    assert_eq!(result.targets_attempted, 3);
    assert_eq!(result.targets_succeeded, 2);
    assert_eq!(result.outcome(), FanoutOutcome::Partial);
    assert_eq!(result.summary(), "sent to 2 of 3");
    assert_eq!(result.per_target_errors.len(), 1);
    assert_eq!(
        result.per_target_errors[&key("U1", "C2")].stage,
        DeliveryStage::AppendAlert
    );

    assert!(store.list_messages(&key("U1", "C2")).expect("messages").is_empty());
    assert_ordered_pair(&store, &key("U1", "C1"));
    assert_ordered_pair(&store, &key("U1", "C3"));
}

#[tokio::test]
async fn test_location_append_failure_keeps_alert() {
    let store = seeded(FaultyStore {
        fail_location_for: Some(key("U1", "C1")),
        ..FaultyStore::default()
    });

    let result = orchestrator(&store)
        .send_emergency_alert("U1")
        .await
        .expect("fanout");

    let report = result.target(&key("U1", "C1")).expect("report");
    assert!(!report.succeeded);
    assert_eq!(report.messages_appended, 1);
    assert_eq!(
        result.per_target_errors[&key("U1", "C1")].stage,
        DeliveryStage::AppendLocation
    );

    let conversation = store
        .get_conversation(&key("U1", "C1"))
        .expect("get")
        .expect("exists");
    assert!(conversation.last_message_text.is_none());
}

#[tokio::test]
async fn test_metadata_failure_is_reported() {
    let store = seeded(FaultyStore {
        fail_metadata_for: Some(key("U1", "C3")),
        ..FaultyStore::default()
    });

    let result = orchestrator(&store)
        .send_emergency_alert("U1")
        .await
        .expect("fanout");

    assert_eq!(result.targets_succeeded, 2);
    let report = result.target(&key("U1", "C3")).expect("report");
    assert_eq!(report.messages_appended, 2);
    assert_eq!(
        result.per_target_errors[&key("U1", "C3")].stage,
        DeliveryStage::UpdateMetadata
    );
}

#[tokio::test]
async fn test_create_failure_appends_nothing() {
    let store = seeded(FaultyStore {
        fail_create_for: Some(key("U1", "C3")),
        ..FaultyStore::default()
    });

    let result = orchestrator(&store)
        .send_emergency_alert("U1")
        .await
        .expect("fanout");

    assert_eq!(
        result.per_target_errors[&key("U1", "C3")].stage,
        DeliveryStage::CreateConversation
    );
    assert!(store.get_conversation(&key("U1", "C3")).expect("get").is_none());
    assert_eq!(store.appends.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_every_target_failing_is_total_failure() {
    let store = Arc::new(FaultyStore {
        fail_alert_for: Some(key("U1", "C1")),
        ..FaultyStore::default()
    });
    store
        .inner
        .upsert_conversation(&ConversationUpsert::ensure(key("U1", "C1")))
        .expect("seed");

    let result = orchestrator(&store)
        .send_emergency_alert("U1")
        .await
        .expect("fanout");

    assert_eq!(result.outcome(), FanoutOutcome::TotalFailure);
    assert_eq!(result.summary(), "failed");
}

#[tokio::test]
async fn test_listing_failure_aborts_before_writes() {
    let store = seeded(FaultyStore {
        fail_listing: true,
        ..FaultyStore::default()
    });

    let err = orchestrator(&store)
        .send_emergency_alert("U1")
        .await
        .expect_err("must abort");

    assert!(matches!(err, Error::Store { .. }));
    assert_eq!(store.appends.load(Ordering::SeqCst), 0);
    assert_eq!(store.inner.conversation_count(), 2);
}

#[tokio::test]
async fn test_profile_failure_falls_back() {
    let store = seeded(FaultyStore {
        fail_profile: true,
        ..FaultyStore::default()
    });

    let result = orchestrator(&store)
        .send_emergency_alert("U1")
        .await
        .expect("fanout");

    assert_eq!(result.outcome(), FanoutOutcome::AllSucceeded);
    let messages = store.list_messages(&key("U1", "C3")).expect("messages");
    assert!(messages.iter().all(|m| m.sender_name == "Unknown"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_double_trigger() {
    let store = seeded(FaultyStore::default());
    let first = orchestrator(&store);
    let second = orchestrator(&store);

    let (a, b) = tokio::join!(
        first.send_emergency_alert("U1"),
        second.send_emergency_alert("U1")
    );
    assert!(a.expect("first").is_complete());
    assert!(b.expect("second").is_complete());

    assert_eq!(store.inner.conversation_count(), 3);
    for counterpart in ["C1", "C2", "C3"] {
        let messages = store
            .list_messages(&key("U1", counterpart))
            .expect("messages");
        assert_eq!(messages.len(), 4, "conversation with {counterpart}");
        assert_eq!(messages.iter().filter(|m| m.text == ALERT).count(), 2);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bounded_concurrency_still_delivers_everything() {
    let store = seeded(FaultyStore::default());
    for n in 0..20 {
        store
            .inner
            .add_contact(&EmergencyContact::new(id("U1"), format!("N{n}")))
            .expect("contact");
    }

    let result = orchestrator(&store)
        .with_fanout_config(FanoutConfig::new().with_max_concurrent(2))
        .send_emergency_alert("U1")
        .await
        .expect("fanout");

    assert_eq!(result.targets_attempted, 23);
    assert_eq!(result.targets_succeeded, 23);
    assert_eq!(store.appends.load(Ordering::SeqCst), 46);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abandoned_call_completes_started_targets() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let store = seeded(FaultyStore {
        append_delay: Some(Duration::from_millis(50)),
        append_started: Some(tx),
        ..FaultyStore::default()
    });

    let orchestrator = orchestrator(&store);
    let call = tokio::spawn(async move { orchestrator.send_emergency_alert("U1").await });

    rx.recv().await.expect("an append started");
    call.abort();

    tokio::time::sleep(Duration::from_millis(600)).await;

    for counterpart in ["C1", "C2", "C3"] {
        assert_ordered_pair(&store, &key("U1", counterpart));
    }
}
