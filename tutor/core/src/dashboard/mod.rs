//! Teacher Dashboard
//!
//! Resources, class progress and feedback analytics, plus the controller that
//! loads them and keeps the analytics in sync with feedback given in the chat
//! widget.
//!
//! # Usage
//!
//! ```ignore
//! use tutor_core::dashboard::DashboardSync;
//!
//! let dashboard = DashboardSync::new(service, bus, &config.dashboard);
//! if !dashboard.mount().await {
//!     dashboard.retry().await;
//! }
//! let snapshot = dashboard.snapshot();
//! ```

mod model;
mod sync;

pub use model::{
    FeedbackAnalytics, FeedbackTally, ProgressRecord, ProgressResponse, Resource,
    ResourcesResponse,
};
pub use sync::{DashboardPhase, DashboardSnapshot, DashboardSync};
