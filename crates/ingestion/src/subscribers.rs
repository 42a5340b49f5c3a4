//! Per-paper progress listener registry
//!
//! Listeners only see events emitted while they are registered; nothing is
//! buffered or replayed. Removing the last listener of a paper removes the
//! paper's entry entirely.

use paperdesk_common::db::models::{PaperId, PaperStatus};
use paperdesk_common::metrics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tracing::debug;

/// Progress event delivered to ingestion listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestProgress {
    pub paper_id: PaperId,
    pub status: PaperStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestProgress {
    pub fn new(paper_id: impl Into<PaperId>, status: PaperStatus, progress: u8) -> Self {
        Self {
            paper_id: paper_id.into(),
            status,
            progress,
            error: None,
        }
    }

    pub fn failed(paper_id: impl Into<PaperId>, progress: u8, error: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            status: PaperStatus::Error,
            progress,
            error: Some(error.into()),
        }
    }
}

pub type IngestListener = Arc<dyn Fn(&IngestProgress) + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    listeners: HashMap<PaperId, Vec<(u64, IngestListener)>>,
    next_id: u64,
    total: usize,
    unobserved: Option<mpsc::UnboundedSender<PaperId>>,
}

fn lock(inner: &Mutex<RegistryInner>) -> MutexGuard<'_, RegistryInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that reports every paper whose last listener leaves
    pub fn with_unobserved_notifier(tx: mpsc::UnboundedSender<PaperId>) -> Self {
        let registry = Self::default();
        lock(&registry.inner).unobserved = Some(tx);
        registry
    }

    /// Register a listener for one paper
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, paper_id: &str, listener: IngestListener) -> IngestSubscription {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .listeners
            .entry(paper_id.to_string())
            .or_default()
            .push((id, listener));
        inner.total += 1;
        metrics::set_ingest_subscribers(inner.total);

        debug!(paper_id, listener_id = id, "Ingest listener registered");

        IngestSubscription {
            registry: self.clone(),
            paper_id: paper_id.to_string(),
            id,
            active: true,
        }
    }

    /// Register a listener that forwards events into a channel
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_channel(
        &self,
        paper_id: &str,
    ) -> (IngestSubscription, mpsc::UnboundedReceiver<IngestProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(
            paper_id,
            Arc::new(move |event: &IngestProgress| {
                // Receiver gone: the consumer stopped listening
                let _ = tx.send(event.clone());
            }),
        );
        (subscription, rx)
    }

    /// Deliver an event to every listener currently registered for its paper
    pub fn emit(&self, event: &IngestProgress) -> usize {
        // Snapshot under the lock, call outside it so listeners may unsubscribe
        let listeners: Vec<IngestListener> = lock(&self.inner)
            .listeners
            .get(&event.paper_id)
            .map(|set| set.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        for listener in &listeners {
            listener(event);
        }

        metrics::record_ingestion_event(event.status.as_str());
        debug!(
            paper_id = %event.paper_id,
            status = %event.status,
            progress = event.progress,
            delivered = listeners.len(),
            "Ingest progress emitted"
        );
        listeners.len()
    }

    /// Handle that does not keep the registry alive
    pub fn downgrade(&self) -> WeakSubscriberRegistry {
        WeakSubscriberRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of listeners registered for a paper
    pub fn listener_count(&self, paper_id: &str) -> usize {
        lock(&self.inner).listeners.get(paper_id).map_or(0, Vec::len)
    }

    /// Whether the registry still holds an entry for the paper
    pub fn is_tracked(&self, paper_id: &str) -> bool {
        lock(&self.inner).listeners.contains_key(paper_id)
    }

    fn remove(&self, paper_id: &str, id: u64) {
        let mut inner = lock(&self.inner);
        let Some(set) = inner.listeners.get_mut(paper_id) else {
            return;
        };
        let before = set.len();
        set.retain(|(listener_id, _)| *listener_id != id);
        let removed = before - set.len();
        let emptied = set.is_empty();

        if emptied {
            inner.listeners.remove(paper_id);
        }
        inner.total -= removed;
        metrics::set_ingest_subscribers(inner.total);

        debug!(paper_id, listener_id = id, "Ingest listener removed");

        if emptied {
            if let Some(tx) = &inner.unobserved {
                let _ = tx.send(paper_id.to_string());
            }
        }
    }
}

/// Non-owning registry handle for background tasks
#[derive(Clone)]
pub struct WeakSubscriberRegistry {
    inner: Weak<Mutex<RegistryInner>>,
}

impl WeakSubscriberRegistry {
    pub fn upgrade(&self) -> Option<SubscriberRegistry> {
        self.inner.upgrade().map(|inner| SubscriberRegistry { inner })
    }
}

/// Registration guard; unsubscribes on `unsubscribe()` or drop
pub struct IngestSubscription {
    registry: SubscriberRegistry,
    paper_id: PaperId,
    id: u64,
    active: bool,
}

impl IngestSubscription {
    pub fn paper_id(&self) -> &str {
        &self.paper_id
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.active {
            self.active = false;
            self.registry.remove(&self.paper_id, self.id);
        }
    }
}

impl Drop for IngestSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for IngestSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestSubscription")
            .field("paper_id", &self.paper_id)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> (IngestListener, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: IngestListener = Arc::new(move |event: &IngestProgress| {
            sink.lock().unwrap().push(event.progress);
        });
        (listener, seen)
    }

    #[test]
    fn test_emit_reaches_only_matching_paper() {
        let registry = SubscriberRegistry::new();
        let (a, seen_a) = collector();
        let (b, seen_b) = collector();
        let _sub_a = registry.subscribe("paper-a", a);
        let _sub_b = registry.subscribe("paper-b", b);

        assert_eq!(registry.emit(&IngestProgress::new("paper-a", PaperStatus::Queued, 0)), 1);

        assert_eq!(*seen_a.lock().unwrap(), vec![0]);
        assert!(seen_b.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_replay_for_late_subscribers() {
        let registry = SubscriberRegistry::new();
        registry.emit(&IngestProgress::new("paper-a", PaperStatus::Queued, 0));

        let (listener, seen) = collector();
        let _sub = registry.subscribe("paper-a", listener);
        assert!(seen.lock().unwrap().is_empty());

        registry.emit(&IngestProgress::new("paper-a", PaperStatus::Processing, 40));
        assert_eq!(*seen.lock().unwrap(), vec![40]);
    }

    #[test]
    fn test_last_unsubscribe_removes_entry() {
        let registry = SubscriberRegistry::new();
        let (first, _) = collector();
        let (second, _) = collector();
        let s1 = registry.subscribe("paper-a", first);
        let s2 = registry.subscribe("paper-a", second);
        assert_eq!(registry.listener_count("paper-a"), 2);

        s1.unsubscribe();
        assert!(registry.is_tracked("paper-a"));
        drop(s2);
        assert!(!registry.is_tracked("paper-a"));
    }

    #[test]
    fn test_unobserved_notification() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let registry = SubscriberRegistry::with_unobserved_notifier(tx);
        let (listener, _) = collector();

        let sub = registry.subscribe("paper-a", listener);
        assert!(rx.try_recv().is_err());
        sub.unsubscribe();
        assert_eq!(rx.try_recv().unwrap(), "paper-a");
    }

    #[test]
    fn test_listener_may_unsubscribe_during_emit() {
        let registry = SubscriberRegistry::new();
        let slot: Arc<Mutex<Option<IngestSubscription>>> = Arc::new(Mutex::new(None));

        let slot_in = Arc::clone(&slot);
        let sub = registry.subscribe(
            "paper-a",
            Arc::new(move |_: &IngestProgress| {
                slot_in.lock().unwrap().take();
            }),
        );
        *slot.lock().unwrap() = Some(sub);

        registry.emit(&IngestProgress::new("paper-a", PaperStatus::Queued, 0));
        assert!(!registry.is_tracked("paper-a"));
    }

    #[test]
    fn test_weak_handle_follows_registry_lifetime() {
        let registry = SubscriberRegistry::new();
        let weak = registry.downgrade();
        let (listener, _) = collector();
        let _sub = weak.upgrade().unwrap().subscribe("paper-a", listener);
        assert_eq!(registry.listener_count("paper-a"), 1);

        drop(_sub);
        drop(registry);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_progress_wire_shape() {
        let event = IngestProgress::failed("paper-9", 40, "ingestion cancelled");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["paperId"], "paper-9");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "ingestion cancelled");

        let ok = serde_json::to_value(IngestProgress::new("paper-9", PaperStatus::Indexed, 100)).unwrap();
        assert!(ok.get("error").is_none());
    }
}
