//! Shared test doubles for the integration tests
//!
//! In-memory implementations of both service contracts. Calls can be held
//! open with semaphore gates so tests can observe in-flight state (typing
//! indicator, optimistic feedback) before the "network" answers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use tutor_core::dashboard::{FeedbackAnalytics, FeedbackTally, ProgressRecord, Resource};
use tutor_core::messages::{AskResponse, FeedbackRecord, NewMessageRecord};
use tutor_core::{ChatMessage, ClassroomService, MessageId, ServiceError, TutorService};

// =============================================================================
// QA / Feedback Service
// =============================================================================

/// How the mock answers `POST /ask`
#[derive(Clone, Debug)]
pub enum AskScript {
    /// Fixed answer and sources
    Answer(String, Vec<String>),
    /// Answer is "Answer: <question>"
    Echo,
    /// Blank answer
    Blank,
    /// Non-2xx status
    Status(u16),
}

/// In-memory QA/feedback service
pub struct MockTutor {
    history: Mutex<Option<Vec<ChatMessage>>>,
    script: Mutex<AskScript>,
    ask_gate: Option<Semaphore>,
    feedback_gate: Option<Semaphore>,
    save_gate: Option<Semaphore>,
    ask_started: Notify,
    save_started: Notify,
    fail_saves: AtomicBool,
    fail_feedback: AtomicBool,
    next_id: AtomicI64,
    /// Every record passed to `save_message`
    pub saved: Mutex<Vec<NewMessageRecord>>,
    /// Every question passed to `ask`
    pub asked: Mutex<Vec<String>>,
    /// Every record passed to `submit_feedback`
    pub feedback: Mutex<Vec<FeedbackRecord>>,
}

impl MockTutor {
    pub fn new(script: AskScript) -> Self {
        Self {
            history: Mutex::new(Some(Vec::new())),
            script: Mutex::new(script),
            ask_gate: None,
            feedback_gate: None,
            save_gate: None,
            ask_started: Notify::new(),
            save_started: Notify::new(),
            fail_saves: AtomicBool::new(false),
            fail_feedback: AtomicBool::new(false),
            next_id: AtomicI64::new(100),
            saved: Mutex::new(Vec::new()),
            asked: Mutex::new(Vec::new()),
            feedback: Mutex::new(Vec::new()),
        }
    }

    /// Hold every `ask` until [`release_asks`](Self::release_asks)
    pub fn with_gated_asks(mut self) -> Self {
        self.ask_gate = Some(Semaphore::new(0));
        self
    }

    /// Hold every `submit_feedback` until [`release_feedback`](Self::release_feedback)
    pub fn with_gated_feedback(mut self) -> Self {
        self.feedback_gate = Some(Semaphore::new(0));
        self
    }

    /// Hold every `save_message` until [`release_saves`](Self::release_saves)
    pub fn with_gated_saves(mut self) -> Self {
        self.save_gate = Some(Semaphore::new(0));
        self
    }

    pub fn with_history(self, history: Vec<ChatMessage>) -> Self {
        *self.history.lock() = Some(history);
        self
    }

    pub fn with_failing_history(self) -> Self {
        *self.history.lock() = None;
        self
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_feedback(&self, fail: bool) {
        self.fail_feedback.store(fail, Ordering::SeqCst);
    }

    pub fn release_asks(&self, n: usize) {
        if let Some(gate) = &self.ask_gate {
            gate.add_permits(n);
        }
    }

    pub fn release_feedback(&self, n: usize) {
        if let Some(gate) = &self.feedback_gate {
            gate.add_permits(n);
        }
    }

    pub fn release_saves(&self, n: usize) {
        if let Some(gate) = &self.save_gate {
            gate.add_permits(n);
        }
    }

    /// Wait until a `save_message` call has started
    pub async fn save_started(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.save_started.notified())
            .await
            .expect("save_message was never called");
    }

    /// Wait until an `ask` call has started
    pub async fn ask_started(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.ask_started.notified())
            .await
            .expect("ask was never called");
    }

    pub fn ask_count(&self) -> usize {
        self.asked.lock().len()
    }
}

#[async_trait]
impl TutorService for MockTutor {
    async fn load_history(&self) -> Result<Vec<ChatMessage>, ServiceError> {
        self.history
            .lock()
            .clone()
            .ok_or_else(|| ServiceError::status("/chat/history", 500))
    }

    async fn save_message(&self, record: &NewMessageRecord) -> Result<MessageId, ServiceError> {
        self.saved.lock().push(record.clone());
        self.save_started.notify_one();
        if let Some(gate) = &self.save_gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ServiceError::status("/chat/message", 503));
        }
        Ok(MessageId::Numeric(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn ask(&self, question: &str) -> Result<AskResponse, ServiceError> {
        self.asked.lock().push(question.to_string());
        self.ask_started.notify_one();
        if let Some(gate) = &self.ask_gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        let script = self.script.lock().clone();
        match script {
            AskScript::Answer(answer, sources) => Ok(AskResponse::answered(answer, sources)),
            AskScript::Echo => Ok(AskResponse::answered(format!("Answer: {question}"), Vec::new())),
            AskScript::Blank => Ok(AskResponse::answered("   ", Vec::new())),
            AskScript::Status(status) => Err(ServiceError::status("/ask", status)),
        }
    }

    async fn submit_feedback(&self, record: &FeedbackRecord) -> Result<(), ServiceError> {
        if let Some(gate) = &self.feedback_gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.feedback.lock().push(record.clone());
        if self.fail_feedback.load(Ordering::SeqCst) {
            return Err(ServiceError::status("/feedback", 500));
        }
        Ok(())
    }
}

// =============================================================================
// Classroom Service
// =============================================================================

/// In-memory resources / progress / analytics service
#[derive(Default)]
pub struct MockClassroom {
    fail_resources: AtomicBool,
    fail_progress: AtomicBool,
    fail_analytics: AtomicBool,
    resources_gate: Mutex<Option<Arc<Semaphore>>>,
    analytics_gate: Mutex<Option<Arc<Semaphore>>>,
    analytics_calls: AtomicUsize,
}

impl MockClassroom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_resources(&self, fail: bool) {
        self.fail_resources.store(fail, Ordering::SeqCst);
    }

    pub fn fail_progress(&self, fail: bool) {
        self.fail_progress.store(fail, Ordering::SeqCst);
    }

    pub fn fail_analytics(&self, fail: bool) {
        self.fail_analytics.store(fail, Ordering::SeqCst);
    }

    /// Hold `resources` calls until the returned semaphore gets permits
    pub fn gate_resources(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.resources_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Hold `feedback_analytics` calls until the returned semaphore gets permits
    pub fn gate_analytics(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.analytics_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Completed analytics fetches (gated calls count once released)
    pub fn analytics_calls(&self) -> usize {
        self.analytics_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassroomService for MockClassroom {
    async fn resources(&self) -> Result<Vec<Resource>, ServiceError> {
        let gate = self.resources_gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.fail_resources.load(Ordering::SeqCst) {
            return Err(ServiceError::status("/resources", 500));
        }
        Ok(vec![
            Resource {
                name: "Lesson 1: Climate Change".to_string(),
                file: "lesson1.pdf".to_string(),
            },
            Resource {
                name: "Lesson 2: Seasons".to_string(),
                file: "lesson2.pdf".to_string(),
            },
        ])
    }

    async fn progress(&self) -> Result<Vec<ProgressRecord>, ServiceError> {
        if self.fail_progress.load(Ordering::SeqCst) {
            return Err(ServiceError::status("/progress", 500));
        }
        Ok(vec![
            ProgressRecord {
                student: "Alice".to_string(),
                completed: 3,
                total: 5,
            },
            ProgressRecord {
                student: "Bob".to_string(),
                completed: 4,
                total: 5,
            },
        ])
    }

    /// Each successful fetch reports the call number as the total
    async fn feedback_analytics(&self) -> Result<FeedbackAnalytics, ServiceError> {
        let gate = self.analytics_gate.lock().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        let call = self.analytics_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_analytics.load(Ordering::SeqCst) {
            return Err(ServiceError::status("/feedback/analytics", 502));
        }
        let total = call as u64;
        Ok(FeedbackAnalytics {
            total_feedback: FeedbackTally {
                helpful: total,
                not_helpful: 0,
                total,
            },
            lesson_feedback: [("Lesson 1".to_string(), FeedbackTally::default())]
                .into_iter()
                .collect(),
        })
    }
}

/// Let spawned tasks run without moving a paused clock meaningfully
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
