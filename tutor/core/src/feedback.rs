//! Feedback Coordinator
//!
//! Records a helpful / not helpful verdict against a bot turn.
//!
//! # Flow
//!
//! ```text
//! begin(index, helpful)
//!   ├─ precondition fails ──► None (nothing changes)
//!   └─ mark turn feedback_given + helpful   (optimistic, irreversible)
//!        │
//!        ▼
//! PendingFeedback::deliver()
//!   ├─ POST /feedback {message_id, helpful: 0|1}
//!   └─ publish FeedbackSubmitted on the bus   (success or failure)
//! ```
//!
//! The local verdict stands whatever the service says. Remote failures are
//! logged and otherwise invisible.

use std::sync::Arc;

use crate::bus::{BusEvent, NotificationBus};
use crate::messages::{FeedbackPatch, FeedbackRecord};
use crate::service::TutorService;
use crate::store::ConversationHandle;

/// Result of a feedback submission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// The turn does not exist, is not a bot turn, or was already rated
    Ignored,
    /// Recorded locally and accepted by the service
    Delivered,
    /// Recorded locally; the service call failed
    DeliveryFailed,
}

impl FeedbackOutcome {
    /// Whether the verdict was recorded locally
    #[must_use]
    pub fn is_recorded(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Applies verdicts to the conversation and reports them
pub struct FeedbackCoordinator<S: TutorService> {
    service: Arc<S>,
    bus: Arc<dyn NotificationBus>,
    conversation: ConversationHandle,
}

impl<S: TutorService> Clone for FeedbackCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            bus: Arc::clone(&self.bus),
            conversation: self.conversation.clone(),
        }
    }
}

impl<S: TutorService> FeedbackCoordinator<S> {
    /// Create a coordinator over `conversation`
    pub fn new(
        service: Arc<S>,
        bus: Arc<dyn NotificationBus>,
        conversation: ConversationHandle,
    ) -> Self {
        Self {
            service,
            bus,
            conversation,
        }
    }

    /// Record the verdict locally and return the remote half of the work
    ///
    /// Returns `None` (and changes nothing) unless the turn at `index` is a
    /// bot turn without feedback.
    pub fn begin(&self, index: usize, helpful: bool) -> Option<PendingFeedback<S>> {
        let message_id = self.conversation.with(|store| {
            let message = store.get(index)?;
            if !message.accepts_feedback() {
                return None;
            }
            let id = message.id.clone();
            store.update_at(index, &FeedbackPatch::verdict(helpful));
            Some(id)
        })??;

        tracing::debug!(
            index,
            helpful,
            message_id = ?message_id,
            "Feedback recorded locally"
        );

        Some(PendingFeedback {
            service: Arc::clone(&self.service),
            bus: Arc::clone(&self.bus),
            index,
            record: FeedbackRecord::new(message_id, helpful),
        })
    }

    /// Record the verdict and wait for the remote submission
    pub async fn submit_feedback(&self, index: usize, helpful: bool) -> FeedbackOutcome {
        match self.begin(index, helpful) {
            Some(pending) => pending.deliver().await,
            None => {
                tracing::debug!(index, "Feedback ignored");
                FeedbackOutcome::Ignored
            }
        }
    }
}

/// A verdict recorded locally but not yet sent
pub struct PendingFeedback<S: TutorService> {
    service: Arc<S>,
    bus: Arc<dyn NotificationBus>,
    index: usize,
    record: FeedbackRecord,
}

impl<S: TutorService> PendingFeedback<S> {
    /// Wire record that will be sent
    #[must_use]
    pub fn record(&self) -> &FeedbackRecord {
        &self.record
    }

    /// Send the verdict, then publish exactly one notification
    pub async fn deliver(self) -> FeedbackOutcome {
        let outcome = match self.service.submit_feedback(&self.record).await {
            Ok(()) => FeedbackOutcome::Delivered,
            Err(e) => {
                tracing::warn!(
                    index = self.index,
                    message_id = ?self.record.message_id,
                    error = %e,
                    "Feedback submission failed"
                );
                FeedbackOutcome::DeliveryFailed
            }
        };
        self.bus.publish(BusEvent::FeedbackSubmitted);
        outcome
    }
}

impl<S: TutorService> std::fmt::Debug for PendingFeedback<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFeedback")
            .field("index", &self.index)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}
