//! Event subscriptions and delivery.
//!
//! Subscriptions live in a map keyed by id. Publishing an event filters
//! each subscription by registry prefix and message key, wraps the message
//! in an `#Event.v1_4_0.Event` envelope with a monotonic per-subscription
//! id, and hands the payload to the subscription's sink. The sink is
//! abstract: HTTP POST, an SSE broadcast, or an in-process channel in
//! tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use redfishd_registries::MessageId;

pub mod sinks;

pub use sinks::{ChannelSink, EventSink, HttpPostSink, SinkFuture, SseBroadcaster, SseSink};

/// Default cap on simultaneous subscriptions.
pub const MAX_SUBSCRIPTIONS: usize = 20;

/// Interval between delivery retries.
const RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// One event subscription.
pub struct Subscription {
    pub id: String,
    pub destination: String,
    /// Delivery protocol, `Redfish` for HTTP POST destinations.
    pub protocol: String,
    pub retry_policy: String,
    /// Client-supplied string echoed into every delivered event.
    pub context: Option<String>,
    /// Registry prefixes the subscriber wants; empty means all.
    pub registry_prefixes: Vec<String>,
    /// Message keys the subscriber wants; empty means all.
    pub message_keys: Vec<String>,
    /// Custom headers sent with HTTP deliveries.
    pub http_headers: Vec<(String, String)>,
    /// `RedfishEvent` for push destinations, `SSE` for streams.
    pub subscription_type: String,
    sink: Arc<dyn EventSink>,
    sequence: AtomicU64,
}

impl Subscription {
    pub fn new(destination: String, sink: Arc<dyn EventSink>) -> Subscription {
        Subscription {
            id: String::new(),
            destination,
            protocol: "Redfish".to_string(),
            retry_policy: "TerminateAfterRetries".to_string(),
            context: None,
            registry_prefixes: Vec::new(),
            message_keys: Vec::new(),
            http_headers: Vec::new(),
            subscription_type: "RedfishEvent".to_string(),
            sink,
            sequence: AtomicU64::new(1),
        }
    }

    /// Prefix/key filter. Empty lists never filter.
    fn wants(&self, prefix: &str, key: &str) -> bool {
        if !self.registry_prefixes.is_empty()
            && !self.registry_prefixes.iter().any(|p| p == prefix)
        {
            return false;
        }
        if !self.message_keys.is_empty() && !self.message_keys.iter().any(|k| k == key) {
            return false;
        }
        true
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedSubscription {
    id: String,
    destination: String,
    protocol: String,
    retry_policy: String,
    context: Option<String>,
    registry_prefixes: Vec<String>,
    message_keys: Vec<String>,
    http_headers: Vec<(String, String)>,
    subscription_type: String,
}

/// The subscription set and delivery fan-out.
pub struct EventService {
    subscriptions: RwLock<HashMap<String, Arc<Subscription>>>,
    max_subscriptions: usize,
    delivery_retries: u32,
    store_path: Option<PathBuf>,
}

impl EventService {
    pub fn new(delivery_retries: u32, store_path: Option<PathBuf>) -> EventService {
        EventService {
            subscriptions: RwLock::new(HashMap::new()),
            max_subscriptions: MAX_SUBSCRIPTIONS,
            delivery_retries,
            store_path,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Subscription>>> {
        self.subscriptions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Subscription>>> {
        self.subscriptions.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a subscription, assigning its id. `None` when the table is at
    /// the limit.
    pub fn add_subscription(&self, mut subscription: Subscription) -> Option<String> {
        let mut map = self.write();
        if map.len() >= self.max_subscriptions {
            return None;
        }
        let id = uuid::Uuid::new_v4().simple().to_string();
        subscription.id = id.clone();
        map.insert(id.clone(), Arc::new(subscription));
        drop(map);
        self.persist();
        Some(id)
    }

    pub fn get_subscription(&self, id: &str) -> Option<Arc<Subscription>> {
        self.read().get(id).cloned()
    }

    pub fn delete_subscription(&self, id: &str) -> bool {
        let removed = self.write().remove(id).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn destination_exists(&self, destination: &str) -> bool {
        self.read().values().any(|s| s.destination == destination)
    }

    /// Publish a message object to every matching subscription.
    ///
    /// `message` is a registry message object (it carries the `MessageId`
    /// the filters run on); `origin` becomes `OriginOfCondition`.
    pub fn send_event(&self, message: Value, origin: &str, resource_type: &str) {
        let Some(id) = message.get("MessageId").and_then(Value::as_str) else {
            warn!("event message without MessageId, dropping");
            return;
        };
        let Some(parsed) = MessageId::parse(id) else {
            warn!(message_id = id, "event MessageId does not parse, dropping");
            return;
        };

        let subscribers: Vec<Arc<Subscription>> = self
            .read()
            .values()
            .filter(|s| s.wants(parsed.prefix, parsed.key))
            .cloned()
            .collect();
        if subscribers.is_empty() {
            debug!(origin, resource_type, "no subscribers for event");
            return;
        }

        let timestamp = Utc::now().to_rfc3339();
        for subscription in subscribers {
            let sequence = subscription.next_sequence();
            let mut record = json!({
                "EventType": "Event",
                "EventId": format!("{sequence}"),
                "Severity": message.get("MessageSeverity").cloned().unwrap_or(Value::Null),
                "Message": message.get("Message").cloned().unwrap_or(Value::Null),
                "MessageId": id,
                "MessageArgs": message.get("MessageArgs").cloned().unwrap_or_else(|| json!([])),
                "OriginOfCondition": origin,
                "EventTimestamp": timestamp,
            });
            if let Some(context) = &subscription.context {
                record["Context"] = Value::String(context.clone());
            }
            let envelope = json!({
                "@odata.type": "#Event.v1_4_0.Event",
                "Id": format!("{sequence}"),
                "Name": "Event Log",
                "Events": [record],
            });
            self.deliver(subscription, envelope.to_string());
        }
    }

    fn deliver(&self, subscription: Arc<Subscription>, payload: String) {
        let retries = self.delivery_retries;
        tokio::spawn(async move {
            let mut attempt = 0;
            loop {
                match subscription.sink.deliver(payload.clone()).await {
                    Ok(()) => return,
                    Err(e) => {
                        attempt += 1;
                        if attempt > retries {
                            warn!(
                                subscription = %subscription.id,
                                destination = %subscription.destination,
                                error = %e,
                                "event delivery failed, giving up"
                            );
                            return;
                        }
                        debug!(
                            subscription = %subscription.id,
                            attempt,
                            error = %e,
                            "event delivery failed, retrying"
                        );
                        tokio::time::sleep(RETRY_INTERVAL).await;
                    }
                }
            }
        });
    }

    /// Load persisted subscriptions. Only HTTP push destinations persist;
    /// records that fail to parse are discarded with a warning.
    pub fn load(&self) {
        let Some(path) = &self.store_path else {
            return;
        };
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read subscription store");
                return;
            }
        };
        let records: Vec<Value> = match serde_json::from_slice(&data) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "subscription store is corrupt, discarding");
                return;
            }
        };
        let mut map = self.write();
        for record in records {
            match serde_json::from_value::<PersistedSubscription>(record) {
                Ok(record) => {
                    let sink = Arc::new(HttpPostSink::new(
                        record.destination.clone(),
                        record.http_headers.clone(),
                    ));
                    let subscription = Subscription {
                        id: record.id.clone(),
                        destination: record.destination,
                        protocol: record.protocol,
                        retry_policy: record.retry_policy,
                        context: record.context,
                        registry_prefixes: record.registry_prefixes,
                        message_keys: record.message_keys,
                        http_headers: record.http_headers,
                        subscription_type: record.subscription_type,
                        sink,
                        sequence: AtomicU64::new(1),
                    };
                    map.insert(record.id, Arc::new(subscription));
                }
                Err(e) => warn!(error = %e, "discarding unparseable subscription record"),
            }
        }
    }

    fn persist(&self) {
        let Some(path) = &self.store_path else {
            return;
        };
        let records: Vec<PersistedSubscription> = self
            .read()
            .values()
            .filter(|s| s.subscription_type == "RedfishEvent")
            .map(|s| PersistedSubscription {
                id: s.id.clone(),
                destination: s.destination.clone(),
                protocol: s.protocol.clone(),
                retry_policy: s.retry_policy.clone(),
                context: s.context.clone(),
                registry_prefixes: s.registry_prefixes.clone(),
                message_keys: s.message_keys.clone(),
                http_headers: s.http_headers.clone(),
                subscription_type: s.subscription_type.clone(),
            })
            .collect();
        let data = match serde_json::to_vec(&records) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "failed to serialize subscription store");
                return;
            }
        };
        if let Err(e) = std::fs::write(path, data) {
            warn!(path = %path.display(), error = %e, "failed to write subscription store");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redfishd_registries::{log_entry, task_event};
    use tokio::sync::mpsc;

    fn task_started(id: &str) -> Value {
        log_entry(&task_event::REGISTRY, "TaskStarted", &[id]).unwrap()
    }

    fn subscribe(
        service: &EventService,
        prefixes: &[&str],
        keys: &[&str],
    ) -> (String, mpsc::UnboundedReceiver<String>) {
        let (sink, rx) = ChannelSink::new();
        let mut sub = Subscription::new("local".to_string(), Arc::new(sink));
        sub.registry_prefixes = prefixes.iter().map(|s| s.to_string()).collect();
        sub.message_keys = keys.iter().map(|s| s.to_string()).collect();
        sub.context = Some("test-context".to_string());
        let id = service.add_subscription(sub).unwrap();
        (id, rx)
    }

    #[tokio::test]
    async fn events_are_wrapped_and_delivered() {
        let service = EventService::new(0, None);
        let (_, mut rx) = subscribe(&service, &[], &[]);

        service.send_event(
            task_started("3"),
            "/redfish/v1/TaskService/Tasks/3",
            "Task",
        );
        let payload = rx.recv().await.expect("delivery");
        let envelope: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(envelope["@odata.type"], "#Event.v1_4_0.Event");
        assert_eq!(envelope["Id"], "1");
        assert_eq!(envelope["Name"], "Event Log");
        let event = &envelope["Events"][0];
        assert_eq!(event["EventType"], "Event");
        assert_eq!(
            event["OriginOfCondition"],
            "/redfish/v1/TaskService/Tasks/3"
        );
        assert_eq!(event["Context"], "test-context");
        assert!(event["MessageId"].as_str().unwrap().starts_with("TaskEvent."));
    }

    #[tokio::test]
    async fn sequence_is_monotonic_per_subscription() {
        let service = EventService::new(0, None);
        let (_, mut rx) = subscribe(&service, &[], &[]);
        service.send_event(task_started("1"), "/redfish/v1/TaskService/Tasks/1", "Task");
        service.send_event(task_started("2"), "/redfish/v1/TaskService/Tasks/2", "Task");
        let first: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        let second: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["Id"], "1");
        assert_eq!(second["Id"], "2");
    }

    #[tokio::test]
    async fn prefix_and_key_filters_apply() {
        let service = EventService::new(0, None);
        let (_, mut task_rx) = subscribe(&service, &["TaskEvent"], &[]);
        let (_, mut narrow_rx) = subscribe(&service, &[], &["TaskAborted"]);
        let (_, mut other_rx) = subscribe(&service, &["ResourceEvent"], &[]);

        service.send_event(task_started("1"), "/redfish/v1/TaskService/Tasks/1", "Task");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert!(task_rx.try_recv().is_ok(), "prefix matches");
        assert!(narrow_rx.try_recv().is_err(), "key filter rejects");
        assert!(other_rx.try_recv().is_err(), "prefix filter rejects");
    }

    #[tokio::test]
    async fn subscription_limit_is_enforced() {
        let service = EventService::new(0, None);
        for _ in 0..MAX_SUBSCRIPTIONS {
            let (sink, _rx) = ChannelSink::new();
            assert!(service
                .add_subscription(Subscription::new("d".to_string(), Arc::new(sink)))
                .is_some());
        }
        let (sink, _rx) = ChannelSink::new();
        assert!(service
            .add_subscription(Subscription::new("d".to_string(), Arc::new(sink)))
            .is_none());
    }

    #[tokio::test]
    async fn persistence_round_trip_discards_corrupt_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");
        {
            let service = EventService::new(0, Some(path.clone()));
            let (sink, _rx) = ChannelSink::new();
            let mut sub = Subscription::new("https://collector/events".to_string(), Arc::new(sink));
            sub.registry_prefixes = vec!["TaskEvent".to_string()];
            service.add_subscription(sub).unwrap();
        }
        // Corrupt the stored array with a junk record.
        let mut records: Vec<Value> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        records.push(json!({"broken": true}));
        std::fs::write(&path, serde_json::to_vec(&records).unwrap()).unwrap();

        let service = EventService::new(0, Some(path));
        service.load();
        assert_eq!(service.len(), 1);
        let id = &service.ids()[0];
        let sub = service.get_subscription(id).unwrap();
        assert_eq!(sub.destination, "https://collector/events");
        assert_eq!(sub.registry_prefixes, vec!["TaskEvent".to_string()]);
    }
}
