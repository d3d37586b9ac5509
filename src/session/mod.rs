use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod history;
pub mod saved;
pub mod store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One chat bubble. Messages are immutable once created; `error` can only be
/// set on bot messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    sender: Sender,
    text: String,
    #[serde(default, with = "lenient_time")]
    time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    error: bool,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text.into(), false)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text.into(), false)
    }

    pub fn bot_error(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text.into(), true)
    }

    fn new(sender: Sender, text: String, error: bool) -> Self {
        Self {
            sender,
            text,
            time: Some(Utc::now()),
            error,
        }
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    /// Drops an `error` flag that persisted data attached to a user message.
    pub(crate) fn sanitized(mut self) -> Self {
        if self.sender == Sender::User {
            self.error = false;
        }
        self
    }
}

pub type SessionId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    #[serde(default = "Uuid::new_v4")]
    pub id: SessionId,
    pub title: String,
    #[serde(default, with = "lenient_time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
    pub message_count: usize,
}

/// Timestamps are stored as RFC 3339 text. Anything that does not parse back
/// into a timestamp restores as `None` instead of failing the whole record.
mod lenient_time {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(time: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(time) => serializer.serialize_str(&time.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(text) => DateTime::parse_from_rfc3339(&text)
                .ok()
                .map(|time| time.with_timezone(&Utc)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Message, SavedSession, Sender};

    #[test]
    fn message_serializes_sender_lowercase_and_omits_false_error() {
        let message = Message::user("hi");
        let value = serde_json::to_value(&message).expect("message should serialize");
        assert_eq!(value["sender"], "user");
        assert_eq!(value["text"], "hi");
        assert!(value.get("error").is_none());
        assert!(value["time"].is_string());
    }

    #[test]
    fn bot_error_round_trips_flag() {
        let json = serde_json::to_string(&Message::bot_error("Error: boom"))
            .expect("message should serialize");
        let restored: Message = serde_json::from_str(&json).expect("message should parse");
        assert_eq!(restored.sender(), Sender::Bot);
        assert!(restored.is_error());
    }

    #[test]
    fn malformed_timestamp_restores_as_absent() {
        let data = r#"{"sender":"bot","text":"hello","time":"not a date"}"#;
        let message: Message = serde_json::from_str(data).expect("message should parse");
        assert_eq!(message.text(), "hello");
        assert!(message.time().is_none());
    }

    #[test]
    fn missing_or_numeric_timestamp_restores_as_absent() {
        let missing: Message =
            serde_json::from_str(r#"{"sender":"user","text":"a"}"#).expect("should parse");
        let numeric: Message =
            serde_json::from_str(r#"{"sender":"user","text":"a","time":1700000000}"#)
                .expect("should parse");
        assert!(missing.time().is_none());
        assert!(numeric.time().is_none());
    }

    #[test]
    fn javascript_iso_timestamp_is_accepted() {
        let data = r#"{"sender":"user","text":"a","time":"2024-05-01T12:30:00.000Z"}"#;
        let message: Message = serde_json::from_str(data).expect("message should parse");
        let time = message.time().expect("timestamp should parse");
        assert_eq!(time.to_rfc3339(), "2024-05-01T12:30:00+00:00");
    }

    #[test]
    fn sanitized_clears_error_on_user_messages() {
        let data = r#"{"sender":"user","text":"a","error":true}"#;
        let message: Message = serde_json::from_str(data).expect("message should parse");
        assert!(!message.sanitized().is_error());
    }

    #[test]
    fn legacy_saved_session_without_id_gets_one() {
        let data = r#"{"title":"Old chat","messages":[{"sender":"user","text":"a"}]}"#;
        let first: SavedSession = serde_json::from_str(data).expect("session should parse");
        let second: SavedSession = serde_json::from_str(data).expect("session should parse");
        assert_eq!(first.title, "Old chat");
        assert_eq!(first.messages.len(), 1);
        assert_ne!(first.id, second.id);
    }
}
