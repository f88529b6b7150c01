//! Remote Services
//!
//! Contracts for the QA/feedback service and the classroom service, plus the
//! HTTP client that implements both.
//!
//! # Usage
//!
//! ```ignore
//! use tutor_core::service::{HttpService, TutorService};
//!
//! let config = tutor_core::load_config()?;
//! let service = HttpService::from_config(&config.api);
//! let history = service.load_history().await?;
//! ```

mod http;
mod traits;

pub use http::HttpService;
pub use traits::{ClassroomService, TutorService};
