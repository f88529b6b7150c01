//! Tutor Core - Headless Session & Sync Logic for the Tutoring Client
//!
//! This crate holds everything the tutoring client does that is not drawing:
//! the chat widget's conversation, optimistic sends and typing indicator,
//! feedback capture, and the teacher dashboard's load and analytics sync. Any
//! surface (terminal, web, native) drives it through the same controllers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Surfaces                                │
//! │        ┌──────────────┐                ┌────────────────┐        │
//! │        │ Chat widget  │                │ Teacher panel  │        │
//! │        └──────┬───────┘                └───────┬────────┘        │
//! └───────────────┼────────────────────────────────┼─────────────────┘
//!                 │ user actions / state reads     │
//! ┌───────────────┼────────────────────────────────┼─────────────────┐
//! │               ▼           TUTOR CORE           ▼                 │
//! │  ┌─────────────────────────┐          ┌──────────────────────┐   │
//! │  │ ChatSession             │          │ DashboardSync        │   │
//! │  │  ├ MessageStore         │          │  ├ poll timer        │   │
//! │  │  ├ TypingIndicator      │          │  └ bus subscription ◄┼─┐ │
//! │  │  └ FeedbackCoordinator ─┼─publish─►│ NotificationBus ─────┘ │ │
//! │  └───────────┬─────────────┘          └──────────┬───────────┘   │
//! │              │ TutorService                      │ ClassroomService
//! └──────────────┼───────────────────────────────────┼───────────────┘
//!                ▼                                   ▼
//!          QA / feedback service          resources / progress service
//! ```
//!
//! # Key Types
//!
//! - [`ChatSession`]: submit flow, history hydration, typing state, disposal
//! - [`FeedbackCoordinator`]: optimistic verdicts, remote submit, bus signal
//! - [`DashboardSync`]: dashboard load/retry and analytics refresh
//! - [`EventBus`]: the shared [`NotificationBus`]
//! - [`HttpService`]: reqwest client implementing both service contracts
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tutor_core::{load_config, ChatSession, DashboardSync, EventBus, HttpService};
//!
//! let config = load_config()?;
//! let service = Arc::new(HttpService::from_config(&config.api));
//! let bus = Arc::new(EventBus::new());
//!
//! let chat = ChatSession::new(service.clone(), bus.clone(), config.chat.clone());
//! let dashboard = DashboardSync::new(service, bus, &config.dashboard);
//!
//! chat.load_history().await;
//! dashboard.mount().await;
//!
//! chat.submit("What is photosynthesis?").await;
//! chat.give_feedback(1, true); // dashboard refreshes its analytics
//! ```
//!
//! # Module Overview
//!
//! - [`bus`]: notification bus shared by the chat widget and the dashboard
//! - [`config`]: TOML / environment / CLI configuration
//! - [`dashboard`]: dashboard data and sync controller
//! - [`error`]: service errors
//! - [`feedback`]: feedback coordinator
//! - [`gibberish`]: low-information input filter
//! - [`messages`]: chat turns and wire records
//! - [`service`]: service contracts and the HTTP client
//! - [`session`]: chat session controller
//! - [`store`]: append-only conversation store
//! - [`typing`]: typing indicator ticker

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bus;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod feedback;
pub mod gibberish;
pub mod messages;
pub mod service;
pub mod session;
pub mod store;
pub mod typing;

// Re-exports for convenience
pub use bus::{BusEvent, EventBus, Listener, NotificationBus, Subscription};
pub use config::{
    load_config, load_config_from_path, ClientConfig, ConfigError, ConfigOverrides, ConfigSource,
};
pub use dashboard::{
    DashboardPhase, DashboardSnapshot, DashboardSync, FeedbackAnalytics, FeedbackTally,
    ProgressRecord, Resource,
};
pub use error::ServiceError;
pub use feedback::{FeedbackCoordinator, FeedbackOutcome, PendingFeedback};
pub use gibberish::is_gibberish;
pub use messages::{ChatMessage, FeedbackPatch, MessageId, FALLBACK_ANSWER};
pub use service::{ClassroomService, HttpService, TutorService};
pub use session::{ChatSession, SendPhase, SubmitOutcome};
pub use store::{ChangeTracker, ConversationHandle, MessageStore, StoreChange};
pub use typing::TypingIndicator;
