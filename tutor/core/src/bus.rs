//! Notification Bus
//!
//! The one channel shared between the chat widget and the teacher dashboard.
//! It carries a bare signal ("feedback changed"), never data, so neither side
//! needs to know anything about the other's state.
//!
//! # Design Philosophy
//!
//! The bus is a capability handed to both controllers at construction rather
//! than ambient global state. Production code shares one [`EventBus`] for the
//! application's lifetime; tests can inject their own [`NotificationBus`] and
//! assert on what was published.
//!
//! # Delivery Rules
//!
//! - `publish` runs listeners synchronously, in registration order, once each
//! - a panicking listener is logged and skipped; the rest still run
//! - no queuing and no replay: publishing with no listeners does nothing
//!
//! # Usage
//!
//! ```ignore
//! use tutor_core::bus::{BusEvent, EventBus, NotificationBus};
//! use std::sync::Arc;
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe(BusEvent::FeedbackSubmitted, Arc::new(|| {
//!     println!("refresh analytics");
//! }));
//! bus.publish(BusEvent::FeedbackSubmitted);
//! subscription.unsubscribe();
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Events that can travel over the bus
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusEvent {
    /// A feedback verdict was submitted in the chat widget
    FeedbackSubmitted,
}

impl BusEvent {
    /// Wire name of the event
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FeedbackSubmitted => "feedbackSubmitted",
        }
    }
}

impl std::fmt::Display for BusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A bus listener
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Publish/subscribe capability shared by the controllers
pub trait NotificationBus: Send + Sync {
    /// Invoke every listener registered for `event`
    fn publish(&self, event: BusEvent);

    /// Register `listener` for `event`
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    fn subscribe(&self, event: BusEvent, listener: Listener) -> Subscription;
}

/// Identifier of a registration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Guard for a registered listener
///
/// Dropping the guard unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener immediately"]
pub struct Subscription {
    id: SubscriptionId,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Create a guard that runs `release` when unsubscribed
    pub fn new(id: SubscriptionId, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            release: Some(Box::new(release)),
        }
    }

    /// The registration this guard controls
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the listener now
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.release.is_some())
            .finish()
    }
}

struct Registration {
    id: SubscriptionId,
    event: BusEvent,
    listener: Listener,
}

#[derive(Default)]
struct BusInner {
    registrations: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn remove(&self, id: SubscriptionId) {
        self.registrations.write().retain(|r| r.id != id);
    }
}

/// In-process notification bus
///
/// Cheap to clone; clones share the same registrations.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listeners currently registered for `event`
    #[must_use]
    pub fn listener_count(&self, event: BusEvent) -> usize {
        self.inner
            .registrations
            .read()
            .iter()
            .filter(|r| r.event == event)
            .count()
    }
}

impl NotificationBus for EventBus {
    fn publish(&self, event: BusEvent) {
        // Snapshot so listeners may (un)subscribe while being called
        let listeners: Vec<(SubscriptionId, Listener)> = self
            .inner
            .registrations
            .read()
            .iter()
            .filter(|r| r.event == event)
            .map(|r| (r.id, Arc::clone(&r.listener)))
            .collect();

        if listeners.is_empty() {
            tracing::trace!(event = %event, "Published with no listeners");
            return;
        }

        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                tracing::warn!(event = %event, subscription = %id, "Bus listener panicked");
            }
        }
    }

    fn subscribe(&self, event: BusEvent, listener: Listener) -> Subscription {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        self.inner.registrations.write().push(Registration {
            id,
            event,
            listener,
        });
        tracing::debug!(event = %event, subscription = %id, "Bus listener registered");

        let weak: Weak<BusInner> = Arc::downgrade(&self.inner);
        Subscription::new(id, move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(id);
            }
        })
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.inner.registrations.read().len())
            .finish()
    }
}
