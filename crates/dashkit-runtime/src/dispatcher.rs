//! Event dispatcher
//!
//! Subscribers are called synchronously, in registration order, over a
//! snapshot of the subscriber list taken when dispatch starts. A panicking
//! subscriber is logged and skipped. Every event is also forwarded to a
//! broadcast channel for async consumers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashkit_model::events::DashboardEvent;
use tokio::sync::broadcast;

pub type EventHandler = Arc<dyn Fn(&DashboardEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, EventHandler)>,
}

#[derive(Clone)]
pub struct EventDispatcher {
    registry: Arc<Mutex<Registry>>,
    stream: broadcast::Sender<DashboardEvent>,
}

impl EventDispatcher {
    pub fn new(buffer: usize) -> Self {
        let (stream, _) = broadcast::channel(buffer.max(1));
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            stream,
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&DashboardEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);
        registry.subscribers.push((id, Arc::new(handler)));
        id
    }

    /// Returns `false` when the subscription was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry();
        let before = registry.subscribers.len();
        registry.subscribers.retain(|(sid, _)| *sid != id);
        registry.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().subscribers.len()
    }

    /// Receiver of every event dispatched after this call
    pub fn event_stream(&self) -> broadcast::Receiver<DashboardEvent> {
        self.stream.subscribe()
    }

    pub fn dispatch(&self, event: &DashboardEvent) {
        // Snapshot so that handlers may (un)subscribe without deadlocking
        let snapshot: Vec<(SubscriptionId, EventHandler)> = self.registry().subscribers.clone();

        for (id, handler) in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(event)));
            if let Err(panic) = outcome {
                tracing::warn!(
                    subscription = ?id,
                    event_type = event.event_type(),
                    panic = %panic_message(panic.as_ref()),
                    "Event handler panicked"
                );
            }
        }

        // No receivers is not an error
        let _ = self.stream.send(event.clone());
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscribers", &self.subscriber_count())
            .field("stream_receivers", &self.stream.receiver_count())
            .finish()
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashkit_model::events::{EventContext, EventPayload};

    fn event(title: &str) -> DashboardEvent {
        DashboardEvent::new(
            EventContext::default(),
            None,
            EventPayload::DashboardRenamed {
                new_title: title.to_string(),
            },
        )
    }

    #[test]
    fn test_subscribers_called_in_registration_order() {
        let dispatcher = EventDispatcher::new(8);
        let seen = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            dispatcher.subscribe(move |_| seen.lock().unwrap().push(name));
        }
        dispatcher.dispatch(&event("x"));

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe() {
        let dispatcher = EventDispatcher::new(8);
        let id = dispatcher.subscribe(|_| {});

        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));
        assert_eq!(dispatcher.subscriber_count(), 0);
    }

    #[test]
    fn test_panicking_subscriber_does_not_stop_the_round() {
        let dispatcher = EventDispatcher::new(8);
        let calls = Arc::new(Mutex::new(0));

        dispatcher.subscribe(|_| panic!("subscriber failure"));
        let counter = Arc::clone(&calls);
        dispatcher.subscribe(move |_| *counter.lock().unwrap() += 1);

        dispatcher.dispatch(&event("x"));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_subscriber_added_during_dispatch_waits_for_next_event() {
        // GIVEN a subscriber that registers another one the first time it runs
        let dispatcher = EventDispatcher::new(8);
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let registered = Arc::new(Mutex::new(false));
        {
            let inner = dispatcher.clone();
            let seen = Arc::clone(&seen);
            let registered = Arc::clone(&registered);
            dispatcher.subscribe(move |_| {
                let mut registered = registered.lock().unwrap();
                if !*registered {
                    *registered = true;
                    let seen = Arc::clone(&seen);
                    inner.subscribe(move |e| {
                        if let EventPayload::DashboardRenamed { new_title } = &e.payload {
                            seen.lock().unwrap().push(new_title.clone());
                        }
                    });
                }
            });
        }

        // WHEN two events are dispatched
        dispatcher.dispatch(&event("first"));
        dispatcher.dispatch(&event("second"));

        // THEN the late subscriber only sees the second one
        assert_eq!(*seen.lock().unwrap(), vec!["second".to_string()]);
        assert_eq!(dispatcher.subscriber_count(), 2);
    }

    #[test]
    fn test_subscriber_removed_during_dispatch_still_runs_that_round() {
        // GIVEN a first subscriber that removes the second one
        let dispatcher = EventDispatcher::new(8);
        let calls = Arc::new(Mutex::new(0));
        let victim: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        {
            let inner = dispatcher.clone();
            let victim = Arc::clone(&victim);
            dispatcher.subscribe(move |_| {
                if let Some(id) = victim.lock().unwrap().take() {
                    inner.unsubscribe(id);
                }
            });
        }
        let counter = Arc::clone(&calls);
        let id = dispatcher.subscribe(move |_| *counter.lock().unwrap() += 1);
        *victim.lock().unwrap() = Some(id);

        // WHEN the first event is dispatched
        dispatcher.dispatch(&event("first"));

        // THEN the removed subscriber still ran in that round
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(dispatcher.subscriber_count(), 1);

        // AND it is gone for the next one
        dispatcher.dispatch(&event("second"));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_events_reach_the_stream() {
        let dispatcher = EventDispatcher::new(8);
        let mut stream = dispatcher.event_stream();

        dispatcher.dispatch(&event("streamed"));

        let received = stream.recv().await.unwrap();
        assert_eq!(
            received.payload,
            EventPayload::DashboardRenamed {
                new_title: "streamed".to_string(),
            }
        );
    }
}
