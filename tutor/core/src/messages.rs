//! Chat Messages
//!
//! The turn model shared by the chat session, the message store, and the
//! feedback coordinator, plus the wire records exchanged with the QA/feedback
//! service.
//!
//! # Design Philosophy
//!
//! A turn is fully usable the moment it is created locally. The remote id
//! arrives later (or never, if persistence fails), so it is optional
//! everywhere and nothing in the client depends on it except the feedback
//! call, which forwards whatever it has.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Canned reply used whenever no usable answer is available
pub const FALLBACK_ANSWER: &str = "Sorry, I don't have enough information to answer that question.";

/// Identifier assigned by the remote service once a turn is persisted
///
/// The service is free to use numeric or string ids; the original JSON form
/// is kept so it can be echoed back unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    /// Numeric id (e.g. a database row id)
    Numeric(i64),
    /// Textual id
    Text(String),
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// One turn in the conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Remote id; `None` until persistence completes, or forever if it failed
    pub id: Option<MessageId>,
    /// Client-side key, stable for the lifetime of the turn
    pub local_key: Uuid,
    /// Display text
    pub text: String,
    /// Whether the bot authored this turn
    pub from_bot: bool,
    /// Citations, in the order the service returned them
    pub sources: Vec<String>,
    /// Whether the user already rated this turn
    pub feedback_given: bool,
    /// The verdict, present once `feedback_given` is true
    pub helpful: Option<bool>,
}

impl ChatMessage {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text.into(), false, Vec::new())
    }

    /// Create a bot turn with citations
    pub fn bot(text: impl Into<String>, sources: Vec<String>) -> Self {
        Self::new(text.into(), true, sources)
    }

    /// Create a canned fallback bot turn (no sources)
    pub fn fallback(text: impl Into<String>) -> Self {
        Self::new(text.into(), true, Vec::new())
    }

    fn new(text: String, from_bot: bool, sources: Vec<String>) -> Self {
        Self {
            id: None,
            local_key: Uuid::new_v4(),
            text,
            from_bot,
            sources,
            feedback_given: false,
            helpful: None,
        }
    }

    /// Whether the feedback prompt should be offered for this turn
    #[must_use]
    pub fn accepts_feedback(&self) -> bool {
        self.from_bot && !self.feedback_given
    }

    /// Merge a feedback patch into this turn
    pub fn apply(&mut self, patch: &FeedbackPatch) {
        self.feedback_given = patch.feedback_given;
        self.helpful = patch.helpful;
    }

    /// Record to send when persisting this turn
    #[must_use]
    pub fn to_new_record(&self) -> NewMessageRecord {
        NewMessageRecord {
            text: self.text.clone(),
            from_bot: u8::from(self.from_bot),
            sources: self.sources.clone(),
        }
    }
}

/// Point update for a turn's feedback fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedbackPatch {
    /// New value of `feedback_given`
    pub feedback_given: bool,
    /// New value of `helpful`
    pub helpful: Option<bool>,
}

impl FeedbackPatch {
    /// Patch recording a helpful/unhelpful verdict
    #[must_use]
    pub fn verdict(helpful: bool) -> Self {
        Self {
            feedback_given: true,
            helpful: Some(helpful),
        }
    }
}

// ============================================================================
// Wire Records
// ============================================================================

/// A persisted turn as returned by `GET /chat/history`
///
/// Flags may arrive as booleans or as 0/1 integers, and optional fields may be
/// missing or null.
#[derive(Clone, Debug, Deserialize)]
pub struct HistoryRecord {
    /// Remote id
    #[serde(default)]
    pub id: Option<MessageId>,
    /// Display text
    pub text: String,
    /// Bot-authored flag
    #[serde(rename = "fromBot", default, deserialize_with = "flag")]
    pub from_bot: bool,
    /// Citations
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sources: Vec<String>,
    /// Feedback already given
    #[serde(rename = "feedbackGiven", default, deserialize_with = "flag")]
    pub feedback_given: bool,
    /// Verdict
    #[serde(default, deserialize_with = "optional_flag")]
    pub helpful: Option<bool>,
}

impl From<HistoryRecord> for ChatMessage {
    fn from(record: HistoryRecord) -> Self {
        Self {
            id: record.id,
            local_key: Uuid::new_v4(),
            text: record.text,
            from_bot: record.from_bot,
            sources: record.sources,
            feedback_given: record.feedback_given,
            helpful: if record.feedback_given {
                record.helpful
            } else {
                None
            },
        }
    }
}

/// Body of `GET /chat/history`
#[derive(Clone, Debug, Deserialize)]
pub struct HistoryResponse {
    /// Persisted turns in chronological order
    pub messages: Vec<HistoryRecord>,
}

/// Body of `POST /chat/message`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewMessageRecord {
    /// Display text
    pub text: String,
    /// 1 for bot turns, 0 for user turns
    pub from_bot: u8,
    /// Citations
    pub sources: Vec<String>,
}

/// Response of `POST /chat/message`
#[derive(Clone, Debug, Deserialize)]
pub struct SavedMessage {
    /// Id assigned to the new turn
    pub id: MessageId,
}

/// Body of `POST /ask`
#[derive(Clone, Debug, Serialize)]
pub struct AskRequest<'a> {
    /// The user's question, as typed
    pub question: &'a str,
}

/// Response of `POST /ask`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AskResponse {
    /// Answer text; missing, null or blank means "no answer"
    #[serde(default)]
    pub answer: Option<String>,
    /// Citations for the answer
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

impl AskResponse {
    /// Build a response carrying an answer
    pub fn answered(answer: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            sources: Some(sources),
        }
    }

    /// The answer and its sources, if the answer has visible content
    #[must_use]
    pub fn into_usable(self) -> Option<(String, Vec<String>)> {
        let answer = self.answer?;
        if answer.trim().is_empty() {
            return None;
        }
        Some((answer, self.sources.unwrap_or_default()))
    }
}

/// Body of `POST /feedback`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeedbackRecord {
    /// Persisted id of the rated turn; `null` when persistence never completed
    pub message_id: Option<MessageId>,
    /// 1 for helpful, 0 for not helpful
    pub helpful: u8,
}

impl FeedbackRecord {
    /// Build the record for a verdict
    #[must_use]
    pub fn new(message_id: Option<MessageId>, helpful: bool) -> Self {
        Self {
            message_id,
            helpful: u8::from(helpful),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn into_bool(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(n) => n != 0,
        }
    }
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(optional_flag(deserializer)?.unwrap_or(false))
}

fn optional_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<Flag>::deserialize(deserializer)?.map(Flag::into_bool))
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_turns_are_unpersisted() {
        let user = ChatMessage::user("hello there");
        assert!(user.id.is_none());
        assert!(!user.from_bot);
        assert!(user.sources.is_empty());
        assert!(!user.accepts_feedback());

        let bot = ChatMessage::bot("Plants make sugar", vec!["L1".to_string()]);
        assert!(bot.accepts_feedback());
        assert_ne!(user.local_key, bot.local_key);
    }

    #[test]
    fn test_fallback_turn() {
        let msg = ChatMessage::fallback(FALLBACK_ANSWER);
        assert!(msg.from_bot);
        assert_eq!(msg.text, FALLBACK_ANSWER);
        assert!(msg.sources.is_empty());
    }

    #[test]
    fn test_apply_verdict_closes_feedback() {
        let mut msg = ChatMessage::bot("answer", Vec::new());
        msg.apply(&FeedbackPatch::verdict(false));
        assert!(msg.feedback_given);
        assert_eq!(msg.helpful, Some(false));
        assert!(!msg.accepts_feedback());
    }

    #[test]
    fn test_history_record_accepts_integer_flags() {
        let json = r#"{"messages": [
            {"id": 7, "text": "hi there", "fromBot": 0, "sources": null},
            {"id": 8, "text": "Hello!", "fromBot": 1, "sources": ["L2"], "feedbackGiven": 1, "helpful": 0},
            {"id": "abc", "text": "More", "fromBot": true}
        ]}"#;
        let response: HistoryResponse = serde_json::from_str(json).unwrap();
        let messages: Vec<ChatMessage> = response.messages.into_iter().map(Into::into).collect();

        assert_eq!(messages[0].id, Some(MessageId::Numeric(7)));
        assert!(!messages[0].from_bot);
        assert!(messages[0].sources.is_empty());

        assert!(messages[1].from_bot);
        assert!(messages[1].feedback_given);
        assert_eq!(messages[1].helpful, Some(false));
        assert_eq!(messages[1].sources, vec!["L2".to_string()]);

        assert_eq!(messages[2].id, Some(MessageId::Text("abc".to_string())));
        assert!(!messages[2].feedback_given);
        assert_eq!(messages[2].helpful, None);
    }

    #[test]
    fn test_ask_response_usable_answer() {
        let blank: AskResponse = serde_json::from_str(r#"{"answer": "   "}"#).unwrap();
        assert!(blank.into_usable().is_none());

        let missing: AskResponse = serde_json::from_str("{}").unwrap();
        assert!(missing.into_usable().is_none());

        let good: AskResponse =
            serde_json::from_str(r#"{"answer": "Light to sugar.", "sources": ["L1"]}"#).unwrap();
        assert_eq!(
            good.into_usable(),
            Some(("Light to sugar.".to_string(), vec!["L1".to_string()]))
        );

        let no_sources: AskResponse = serde_json::from_str(r#"{"answer": "Yes."}"#).unwrap();
        assert_eq!(no_sources.into_usable(), Some(("Yes.".to_string(), Vec::new())));
    }

    #[test]
    fn test_wire_bodies() {
        let record = ChatMessage::bot("A", vec!["L1".to_string()]).to_new_record();
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({"text": "A", "from_bot": 1, "sources": ["L1"]})
        );

        let feedback = FeedbackRecord::new(None, true);
        assert_eq!(
            serde_json::to_value(&feedback).unwrap(),
            serde_json::json!({"message_id": null, "helpful": 1})
        );

        let feedback = FeedbackRecord::new(Some(MessageId::Numeric(12)), false);
        assert_eq!(
            serde_json::to_value(&feedback).unwrap(),
            serde_json::json!({"message_id": 12, "helpful": 0})
        );
    }
}
