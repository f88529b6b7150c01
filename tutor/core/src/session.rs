//! Chat Session Controller
//!
//! Drives the chat widget: history hydration, the submit flow, the typing
//! indicator, and feedback on bot turns. Surfaces forward user actions here
//! and read state back; they never talk to the service themselves.
//!
//! # Submit Flow
//!
//! ```text
//! submit(raw)
//!   ├─ blank ──────────────► Rejected (nothing changes)
//!   ├─ clear input draft
//!   ├─ wait for earlier submits (FIFO)
//!   ├─ gibberish ──────────► append user + canned bot, persist both ► Canned
//!   └─ typing on
//!        append user, persist, POST /ask
//!        ├─ usable answer ─► append bot(answer, sources), persist ► Answered
//!        └─ anything else ─► append canned bot, persist ───────────► Fallback
//!      typing off (every path)
//! ```
//!
//! Turns are appended before they are persisted, so they show up at once and
//! pick up their remote id when the save completes. Persistence failures only
//! leave the id empty.
//!
//! # Concurrency
//!
//! Submits are serialized through a fair async mutex: the draft is cleared as
//! soon as `submit` is called, but each question's user/bot pair lands next to
//! each other and in the order the questions were asked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::bus::NotificationBus;
use crate::config::ChatConfig;
use crate::feedback::{FeedbackCoordinator, FeedbackOutcome};
use crate::gibberish::is_gibberish;
use crate::messages::{ChatMessage, NewMessageRecord};
use crate::service::TutorService;
use crate::store::{ChangeTracker, ConversationHandle, StoreChange};
use crate::typing::TypingIndicator;

/// Whether a submit is in progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SendPhase {
    /// Ready for input
    #[default]
    Idle,
    /// A question is being handled
    Sending,
}

/// How a submit ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, or the session was disposed; nothing was appended
    Rejected,
    /// Gibberish input answered locally with the canned reply
    Canned,
    /// The service returned a usable answer
    Answered,
    /// The service failed or had no answer; the canned reply was appended
    Fallback,
}

/// Resets the send phase when a submit finishes
struct PhaseGuard<'a> {
    phase: &'a RwLock<SendPhase>,
}

impl<'a> PhaseGuard<'a> {
    fn enter(phase: &'a RwLock<SendPhase>) -> Self {
        *phase.write() = SendPhase::Sending;
        Self { phase }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        *self.phase.write() = SendPhase::Idle;
    }
}

/// Chat widget controller
pub struct ChatSession<S: TutorService> {
    service: Arc<S>,
    conversation: ConversationHandle,
    feedback: FeedbackCoordinator<S>,
    typing: TypingIndicator,
    config: ChatConfig,
    input: Mutex<String>,
    loading: AtomicBool,
    phase: RwLock<SendPhase>,
    send_gate: tokio::sync::Mutex<()>,
}

impl<S: TutorService + 'static> ChatSession<S> {
    /// Create a session with an empty conversation
    ///
    /// The session reports [`is_loading`](Self::is_loading) until
    /// [`load_history`](Self::load_history) resolves.
    pub fn new(service: Arc<S>, bus: Arc<dyn NotificationBus>, config: ChatConfig) -> Self {
        let conversation = ConversationHandle::new();
        let feedback = FeedbackCoordinator::new(Arc::clone(&service), bus, conversation.clone());
        Self {
            service,
            conversation,
            feedback,
            typing: TypingIndicator::new(config.typing_tick),
            config,
            input: Mutex::new(String::new()),
            loading: AtomicBool::new(true),
            phase: RwLock::new(SendPhase::Idle),
            send_gate: tokio::sync::Mutex::new(()),
        }
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Fetch persisted history and hydrate the conversation
    ///
    /// Failures are logged and leave the conversation empty. Returns whether
    /// history was applied.
    pub async fn load_history(&self) -> bool {
        let applied = match self.service.load_history().await {
            Ok(history) => {
                let count = history.len();
                let applied = self
                    .conversation
                    .with(|store| store.hydrate(history))
                    .unwrap_or(false);
                tracing::info!(count, applied, "Chat history loaded");
                applied
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load chat history");
                false
            }
        };
        self.loading.store(false, Ordering::SeqCst);
        applied
    }

    /// Whether the initial history load is still pending
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Input & Submit
    // ========================================================================

    /// Replace the input draft
    pub fn set_input(&self, text: impl Into<String>) {
        *self.input.lock() = text.into();
    }

    /// Current input draft
    #[must_use]
    pub fn input(&self) -> String {
        self.input.lock().clone()
    }

    /// Submit the current draft
    pub async fn send(&self) -> SubmitOutcome {
        let draft = self.input();
        self.submit(&draft).await
    }

    /// Submit a question
    pub async fn submit(&self, raw: &str) -> SubmitOutcome {
        if raw.trim().is_empty() {
            return SubmitOutcome::Rejected;
        }
        self.input.lock().clear();

        let _turn = self.send_gate.lock().await;
        if self.conversation.is_disposed() {
            tracing::debug!("Submit after dispose ignored");
            return SubmitOutcome::Rejected;
        }
        let _phase = PhaseGuard::enter(&self.phase);

        if is_gibberish(raw) {
            self.answer_locally(raw).await;
            return SubmitOutcome::Canned;
        }

        let _typing = self.typing.guard();

        let user = ChatMessage::user(raw);
        let record = user.to_new_record();
        let index = self.conversation.append(user);
        self.persist(index, &record).await;

        if self.conversation.is_disposed() {
            return SubmitOutcome::Rejected;
        }

        let reply = match self.service.ask(raw).await {
            Ok(response) => response.into_usable(),
            Err(e) => {
                tracing::warn!(error = %e, "Question failed, using fallback reply");
                None
            }
        };

        let (message, outcome) = match reply {
            Some((answer, sources)) => (ChatMessage::bot(answer, sources), SubmitOutcome::Answered),
            None => (self.fallback_message(), SubmitOutcome::Fallback),
        };
        let record = message.to_new_record();
        let index = self.conversation.append(message);
        self.persist(index, &record).await;

        tracing::debug!(?outcome, "Submit finished");
        outcome
    }

    async fn answer_locally(&self, raw: &str) {
        tracing::debug!("Gibberish input, replying locally");
        let user = ChatMessage::user(raw);
        let bot = self.fallback_message();
        let user_record = user.to_new_record();
        let bot_record = bot.to_new_record();

        let user_index = self.conversation.append(user);
        let bot_index = self.conversation.append(bot);

        self.persist(user_index, &user_record).await;
        self.persist(bot_index, &bot_record).await;
    }

    /// Save a turn and attach its id; `index` is `None` once disposed
    async fn persist(&self, index: Option<usize>, record: &NewMessageRecord) {
        let Some(index) = index else {
            return;
        };
        match self.service.save_message(record).await {
            Ok(id) => self.conversation.attach_id(index, id),
            Err(e) => {
                tracing::warn!(index, from_bot = record.from_bot, error = %e, "Failed to persist message");
            }
        }
    }

    fn fallback_message(&self) -> ChatMessage {
        ChatMessage::fallback(self.config.fallback_text.as_str())
    }

    /// Whether a submit is in progress
    #[must_use]
    pub fn phase(&self) -> SendPhase {
        *self.phase.read()
    }

    // ========================================================================
    // Typing
    // ========================================================================

    /// Whether an answer is being awaited
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.typing.is_typing()
    }

    /// Current ellipsis frame
    #[must_use]
    pub fn typing_dots(&self) -> &'static str {
        self.typing.dots()
    }

    /// Typing label for surfaces (`None` when idle)
    #[must_use]
    pub fn typing_label(&self) -> Option<String> {
        self.typing.label()
    }

    // ========================================================================
    // Conversation & Feedback
    // ========================================================================

    /// Copy of the conversation in display order
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.conversation.snapshot()
    }

    /// Shared handle to the conversation
    #[must_use]
    pub fn conversation(&self) -> &ConversationHandle {
        &self.conversation
    }

    /// Classify what changed since `tracker` last looked
    pub fn observe(&self, tracker: &mut ChangeTracker) -> StoreChange {
        self.conversation
            .with(|store| tracker.observe(store))
            .unwrap_or(StoreChange::Unchanged)
    }

    /// The feedback coordinator bound to this conversation
    #[must_use]
    pub fn feedback(&self) -> &FeedbackCoordinator<S> {
        &self.feedback
    }

    /// Rate a bot turn and wait for the service
    pub async fn submit_feedback(&self, index: usize, helpful: bool) -> FeedbackOutcome {
        self.feedback.submit_feedback(index, helpful).await
    }

    /// Rate a bot turn without waiting
    ///
    /// The verdict is recorded immediately; the service call and bus
    /// notification run on a spawned task. Returns whether the verdict was
    /// accepted. Must be called from within a Tokio runtime.
    pub fn give_feedback(&self, index: usize, helpful: bool) -> bool {
        match self.feedback.begin(index, helpful) {
            Some(pending) => {
                tokio::spawn(pending.deliver());
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Tear down the widget
    ///
    /// Stops the typing ticker and releases the conversation; completions of
    /// requests still in flight no longer change anything.
    pub fn dispose(&self) {
        self.typing.stop();
        self.conversation.dispose();
        tracing::debug!("Chat session disposed");
    }
}

impl<S: TutorService> std::fmt::Debug for ChatSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("messages", &self.conversation.len())
            .field("loading", &self.loading.load(Ordering::SeqCst))
            .field("phase", &*self.phase.read())
            .field("typing", &self.typing.is_typing())
            .finish_non_exhaustive()
    }
}
