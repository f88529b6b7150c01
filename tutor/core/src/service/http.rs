//! HTTP Service Client
//!
//! reqwest-based implementation of both service contracts against a single
//! base URL.
//!
//! # Endpoints
//!
//! - `GET  /chat/history`       - persisted conversation
//! - `POST /chat/message`       - persist one turn
//! - `POST /ask`                - question answering
//! - `POST /feedback`           - helpful / not helpful verdict
//! - `GET  /resources`          - lesson resources
//! - `GET  /progress`           - class progress
//! - `GET  /feedback/analytics` - feedback totals
//!
//! Non-2xx responses and transport failures are both errors; bodies that do
//! not match the expected shape are [`ServiceError::Decode`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::traits::{ClassroomService, TutorService};
use crate::config::ApiConfig;
use crate::dashboard::{
    FeedbackAnalytics, ProgressRecord, ProgressResponse, Resource, ResourcesResponse,
};
use crate::error::ServiceError;
use crate::messages::{
    AskRequest, AskResponse, ChatMessage, FeedbackRecord, HistoryResponse, MessageId,
    NewMessageRecord, SavedMessage,
};

const HISTORY_PATH: &str = "/chat/history";
const MESSAGE_PATH: &str = "/chat/message";
const ASK_PATH: &str = "/ask";
const FEEDBACK_PATH: &str = "/feedback";
const RESOURCES_PATH: &str = "/resources";
const PROGRESS_PATH: &str = "/progress";
const ANALYTICS_PATH: &str = "/feedback/analytics";

/// HTTP client for the tutoring service
#[derive(Clone, Debug)]
pub struct HttpService {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpService {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client settings");
                reqwest::Client::new()
            });
        Self {
            base_url,
            http_client,
        }
    }

    /// Create from [`ApiConfig`]
    #[must_use]
    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.base_url.clone(), config.request_timeout)
    }

    /// The base URL every endpoint is appended to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<String, ServiceError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ServiceError::InvalidUrl {
                url: self.base_url.clone(),
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }
        Ok(format!("{}{path}", self.base_url))
    }

    async fn read_body(
        path: &str,
        response: reqwest::Response,
    ) -> Result<String, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        response.text().await.map_err(|e| ServiceError::Transport {
            endpoint: path.to_string(),
            source: e,
        })
    }

    fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ServiceError> {
        serde_json::from_str(body).map_err(|e| ServiceError::Decode {
            endpoint: path.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let url = self.url(path)?;
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::Transport {
                endpoint: path.to_string(),
                source: e,
            })?;
        let body = Self::read_body(path, response).await?;
        Self::decode(path, &body)
    }

    async fn post_body<B: Serialize + Sync>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<String, ServiceError> {
        let url = self.url(path)?;
        let response = self
            .http_client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ServiceError::Transport {
                endpoint: path.to_string(),
                source: e,
            })?;
        Self::read_body(path, response).await
    }
}

impl Default for HttpService {
    fn default() -> Self {
        Self::from_config(&ApiConfig::default())
    }
}

#[async_trait]
impl TutorService for HttpService {
    async fn load_history(&self) -> Result<Vec<ChatMessage>, ServiceError> {
        let response: HistoryResponse = self.get_json(HISTORY_PATH).await?;
        tracing::debug!(count = response.messages.len(), "Fetched chat history");
        Ok(response.messages.into_iter().map(ChatMessage::from).collect())
    }

    async fn save_message(&self, record: &NewMessageRecord) -> Result<MessageId, ServiceError> {
        let body = self.post_body(MESSAGE_PATH, record).await?;
        let saved: SavedMessage = Self::decode(MESSAGE_PATH, &body)?;
        Ok(saved.id)
    }

    async fn ask(&self, question: &str) -> Result<AskResponse, ServiceError> {
        let body = self.post_body(ASK_PATH, &AskRequest { question }).await?;
        Self::decode(ASK_PATH, &body)
    }

    async fn submit_feedback(&self, record: &FeedbackRecord) -> Result<(), ServiceError> {
        self.post_body(FEEDBACK_PATH, record).await.map(|_| ())
    }
}

#[async_trait]
impl ClassroomService for HttpService {
    async fn resources(&self) -> Result<Vec<Resource>, ServiceError> {
        let response: ResourcesResponse = self.get_json(RESOURCES_PATH).await?;
        Ok(response.resources)
    }

    async fn progress(&self) -> Result<Vec<ProgressRecord>, ServiceError> {
        let response: ProgressResponse = self.get_json(PROGRESS_PATH).await?;
        Ok(response.progress)
    }

    async fn feedback_analytics(&self) -> Result<FeedbackAnalytics, ServiceError> {
        self.get_json(ANALYTICS_PATH).await
    }
}
