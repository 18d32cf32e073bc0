use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// A change to the ledger, delivered to subscribers after it is durable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LedgerEvent {
    #[serde(rename_all = "camelCase")]
    GenesisCreated { hash: String },
    #[serde(rename_all = "camelCase")]
    CertificateIssued {
        certificate_id: String,
        camera_id: String,
        block_number: u64,
        block_hash: String,
    },
}

impl LedgerEvent {
    /// Camera the event concerns, if any.
    pub fn camera_id(&self) -> Option<&str> {
        match self {
            Self::GenesisCreated { .. } => None,
            Self::CertificateIssued { camera_id, .. } => Some(camera_id),
        }
    }
}

/// Filter for subscribing to a subset of ledger events.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// If set, only events for this camera are delivered. Chain-wide events
    /// such as genesis creation are then skipped.
    pub camera_id: Option<String>,
}

impl EventFilter {
    pub fn camera(camera_id: impl Into<String>) -> Self {
        Self {
            camera_id: Some(camera_id.into()),
        }
    }

    /// Returns `true` if the given event matches this filter.
    pub fn matches(&self, event: &LedgerEvent) -> bool {
        match &self.camera_id {
            Some(wanted) => event.camera_id() == Some(wanted.as_str()),
            None => true,
        }
    }
}

/// A broadcast channel receiver for ledger events.
pub type EventStream = broadcast::Receiver<LedgerEvent>;

struct Subscriber {
    filter: EventFilter,
    sender: broadcast::Sender<LedgerEvent>,
}

/// Fan-out router that delivers events to matching subscribers.
///
/// Each subscriber gets its own bounded channel; a slow reader lags and
/// loses old events instead of blocking issuance.
pub struct EventRouter {
    subscribers: RwLock<Vec<Subscriber>>,
    capacity: usize,
}

impl EventRouter {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a subscriber. Dropping the returned receiver unsubscribes.
    pub fn subscribe(&self, filter: EventFilter) -> EventStream {
        let (sender, receiver) = broadcast::channel(self.capacity);
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { filter, sender });
        receiver
    }

    /// Route an event to all matching subscribers, pruning closed ones.
    pub fn route(&self, event: &LedgerEvent) {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sub| {
            if sub.filter.matches(event) {
                sub.sender.send(event.clone()).is_ok()
            } else {
                sub.sender.receiver_count() > 0
            }
        });
        debug!(subscribers = subscribers.len(), "ledger event routed");
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("subscribers", &self.subscriber_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issued(camera: &str, n: u64) -> LedgerEvent {
        LedgerEvent::CertificateIssued {
            certificate_id: format!("{n:016x}"),
            camera_id: camera.into(),
            block_number: n,
            block_hash: "ab".repeat(32),
        }
    }

    #[test]
    fn camera_filter_skips_other_cameras_and_genesis() {
        let filter = EventFilter::camera("CAM-1");
        assert!(filter.matches(&issued("CAM-1", 1)));
        assert!(!filter.matches(&issued("CAM-2", 2)));
        assert!(!filter.matches(&LedgerEvent::GenesisCreated { hash: "x".into() }));
        assert!(EventFilter::default().matches(&LedgerEvent::GenesisCreated { hash: "x".into() }));
    }

    #[tokio::test]
    async fn routes_to_matching_subscribers_only() {
        let router = EventRouter::new(8);
        let mut all = router.subscribe(EventFilter::default());
        let mut cam2 = router.subscribe(EventFilter::camera("CAM-2"));

        router.route(&issued("CAM-1", 1));
        router.route(&issued("CAM-2", 2));

        assert_eq!(all.recv().await.unwrap(), issued("CAM-1", 1));
        assert_eq!(all.recv().await.unwrap(), issued("CAM-2", 2));
        assert_eq!(cam2.recv().await.unwrap(), issued("CAM-2", 2));
        assert!(cam2.try_recv().is_err());
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let router = EventRouter::new(8);
        let rx = router.subscribe(EventFilter::default());
        let _kept = router.subscribe(EventFilter::camera("CAM-9"));
        assert_eq!(router.subscriber_count(), 2);
        drop(rx);
        router.route(&issued("CAM-1", 1));
        assert_eq!(router.subscriber_count(), 1);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(issued("CAM-1", 3)).unwrap();
        assert_eq!(json["type"], "certificateIssued");
        assert_eq!(json["cameraId"], "CAM-1");
        assert_eq!(json["blockNumber"], 3);
    }
}
