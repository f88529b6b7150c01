//! Message Store
//!
//! The ordered list of turns that the chat widget renders. Append is the only
//! way history grows; the only in-place edits are attaching a persisted id and
//! recording a feedback verdict. Nothing is ever reordered or removed.
//!
//! Surfaces use [`ChangeTracker`] to tell "a turn was added" (scroll to the
//! bottom) apart from "an existing turn changed" (leave the scroll position
//! alone).

use std::sync::Arc;

use parking_lot::Mutex;

use crate::messages::{ChatMessage, FeedbackPatch, MessageId};

/// Ordered, append-only conversation
#[derive(Clone, Debug, Default)]
pub struct MessageStore {
    /// Turns in display order
    messages: Vec<ChatMessage>,
    /// Bumped on every mutation
    revision: u64,
    /// Number of turns appended locally (hydration does not count)
    local_appends: usize,
}

impl MessageStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn at the end and return its index
    pub fn append(&mut self, message: ChatMessage) -> usize {
        self.messages.push(message);
        self.local_appends += 1;
        self.revision += 1;
        self.messages.len() - 1
    }

    /// Merge a feedback patch into the turn at `index`
    ///
    /// Out-of-range indices are ignored.
    pub fn update_at(&mut self, index: usize, patch: &FeedbackPatch) {
        if let Some(msg) = self.messages.get_mut(index) {
            msg.apply(patch);
            self.revision += 1;
        } else {
            tracing::debug!(index, len = self.messages.len(), "Feedback patch out of range");
        }
    }

    /// Record the persisted id of the turn at `index`
    ///
    /// Out-of-range indices are ignored.
    pub fn attach_id(&mut self, index: usize, id: MessageId) {
        if let Some(msg) = self.messages.get_mut(index) {
            msg.id = Some(id);
            self.revision += 1;
        }
    }

    /// Replace the whole store with previously persisted history
    ///
    /// Only honoured before any local append; returns whether the history was
    /// applied.
    pub fn hydrate(&mut self, history: Vec<ChatMessage>) -> bool {
        if self.local_appends > 0 {
            tracing::warn!(
                local_appends = self.local_appends,
                history_len = history.len(),
                "Ignoring history: conversation already has local turns"
            );
            return false;
        }
        self.messages = history;
        self.revision += 1;
        true
    }

    /// Turn at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    /// All turns in display order
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Mutation counter
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

// ============================================================================
// Change Classification
// ============================================================================

/// How the store changed since the last observation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreChange {
    /// New turns were added
    Grew,
    /// Existing turns were edited in place
    Mutated,
    /// Nothing changed
    Unchanged,
}

impl StoreChange {
    /// Whether a surface should scroll to the newest turn
    #[must_use]
    pub fn should_scroll(self) -> bool {
        matches!(self, Self::Grew)
    }
}

/// Remembers the last observed length and revision of a store
#[derive(Clone, Copy, Debug, Default)]
pub struct ChangeTracker {
    last_len: usize,
    last_revision: u64,
}

impl ChangeTracker {
    /// Create a tracker that has seen an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify the change since the previous call and remember the new state
    pub fn observe(&mut self, store: &MessageStore) -> StoreChange {
        let change = if store.len() > self.last_len {
            StoreChange::Grew
        } else if store.revision() != self.last_revision {
            StoreChange::Mutated
        } else {
            StoreChange::Unchanged
        };
        self.last_len = store.len();
        self.last_revision = store.revision();
        change
    }
}

// ============================================================================
// Shared Handle
// ============================================================================

/// Shared, disposable handle to the chat widget's store
///
/// The session and the feedback coordinator hold clones of this handle. Once
/// [`dispose`](Self::dispose) is called every operation becomes a no-op, so
/// completions of requests still in flight cannot touch a torn-down widget.
#[derive(Clone, Debug)]
pub struct ConversationHandle {
    inner: Arc<Mutex<Option<MessageStore>>>,
}

impl Default for ConversationHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationHandle {
    /// Create a handle around an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(MessageStore::new()))),
        }
    }

    /// Run `f` against the store; `None` once disposed
    pub fn with<R>(&self, f: impl FnOnce(&mut MessageStore) -> R) -> Option<R> {
        self.inner.lock().as_mut().map(f)
    }

    /// Append a turn; `None` once disposed
    pub fn append(&self, message: ChatMessage) -> Option<usize> {
        self.with(|store| store.append(message))
    }

    /// Attach a persisted id to a turn
    pub fn attach_id(&self, index: usize, id: MessageId) {
        self.with(|store| store.attach_id(index, id));
    }

    /// Copy of the turns in display order (empty once disposed)
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.with(|store| store.messages().to_vec())
            .unwrap_or_default()
    }

    /// Number of turns (zero once disposed)
    #[must_use]
    pub fn len(&self) -> usize {
        self.with(|store| store.len()).unwrap_or(0)
    }

    /// Whether there are no turns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the store; later operations are ignored
    pub fn dispose(&self) {
        self.inner.lock().take();
    }

    /// Whether [`dispose`](Self::dispose) has been called
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.lock().is_none()
    }
}
