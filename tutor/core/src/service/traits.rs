//! Service Contracts
//!
//! The two remote collaborators the controllers depend on. Controllers only
//! see these traits, so tests drive them with in-memory fakes and the real
//! client lives in [`super::HttpService`].
//!
//! # Design Philosophy
//!
//! Every call is an independent future. Implementations report failures as
//! [`ServiceError`]; deciding what a failure means for the user (fallback
//! text, logged-and-ignored, error panel) is the controller's job.

use async_trait::async_trait;

use crate::dashboard::{FeedbackAnalytics, ProgressRecord, Resource};
use crate::error::ServiceError;
use crate::messages::{AskResponse, ChatMessage, FeedbackRecord, MessageId, NewMessageRecord};

/// QA and feedback service used by the chat widget
#[async_trait]
pub trait TutorService: Send + Sync {
    /// Persisted conversation, oldest first (`GET /chat/history`)
    async fn load_history(&self) -> Result<Vec<ChatMessage>, ServiceError>;

    /// Persist one turn and return its id (`POST /chat/message`)
    async fn save_message(&self, record: &NewMessageRecord) -> Result<MessageId, ServiceError>;

    /// Ask a question (`POST /ask`)
    ///
    /// A decoded response may still carry no usable answer; see
    /// [`AskResponse::into_usable`].
    async fn ask(&self, question: &str) -> Result<AskResponse, ServiceError>;

    /// Record a helpful/unhelpful verdict (`POST /feedback`)
    async fn submit_feedback(&self, record: &FeedbackRecord) -> Result<(), ServiceError>;
}

/// Read-only classroom data used by the teacher dashboard
#[async_trait]
pub trait ClassroomService: Send + Sync {
    /// Lesson resources (`GET /resources`)
    async fn resources(&self) -> Result<Vec<Resource>, ServiceError>;

    /// Per-student progress (`GET /progress`)
    async fn progress(&self) -> Result<Vec<ProgressRecord>, ServiceError>;

    /// Feedback analytics (`GET /feedback/analytics`)
    async fn feedback_analytics(&self) -> Result<FeedbackAnalytics, ServiceError>;
}
