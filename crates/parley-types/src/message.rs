//! Messages exchanged inside a practice session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Author of a message. Also used for chat-model turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::User => "Người dùng",
            MessageRole::Assistant => "Phụ huynh (AI)",
            MessageRole::System => "Hệ thống",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// Medium of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Voice,
    Image,
}

impl MessageType {
    pub fn label(&self) -> &'static str {
        match self {
            MessageType::Text => "Văn bản",
            MessageType::Voice => "Giọng nói",
            MessageType::Image => "Hình ảnh",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Text => write!(f, "text"),
            MessageType::Voice => write!(f, "voice"),
            MessageType::Image => write!(f, "image"),
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageType::Text),
            "voice" => Ok(MessageType::Voice),
            "image" => Ok(MessageType::Image),
            other => Err(format!("invalid message type: '{other}'")),
        }
    }
}

impl Default for MessageType {
    fn default() -> Self {
        MessageType::Text
    }
}

/// A stored message. `order` is 1-based and dense within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub message_type: MessageType,
    pub audio_url: String,
    pub audio_duration_seconds: Option<f64>,
    pub tokens_used: i64,
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

/// A validated message about to be appended to a session.
///
/// The repository assigns `id`, `order` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub message_type: MessageType,
    pub audio_url: String,
    pub audio_duration_seconds: Option<f64>,
    pub tokens_used: i64,
}

/// API representation of a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: Uuid,
    pub role: MessageRole,
    pub role_display: String,
    pub content: String,
    pub message_type: MessageType,
    pub message_type_display: String,
    pub audio_url: String,
    pub audio_duration_seconds: Option<f64>,
    pub tokens_used: i64,
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessageView {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            role: m.role,
            role_display: m.role.label().to_string(),
            content: m.content.clone(),
            message_type: m.message_type,
            message_type_display: m.message_type.label().to_string(),
            audio_url: m.audio_url.clone(),
            audio_duration_seconds: m.audio_duration_seconds,
            tokens_used: m.tokens_used,
            order: m.order,
            created_at: m.created_at,
        }
    }
}

/// Body of `add_message`. `role` is absent on `reply`, which always writes a user turn.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageInput {
    pub role: Option<String>,
    pub content: Option<String>,
    pub message_type: Option<String>,
    pub audio_url: Option<String>,
    pub audio_duration_seconds: Option<f64>,
}
