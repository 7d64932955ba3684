//! Chat-model request/response types and the AI error taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use std::fmt;

use crate::message::MessageRole;

/// One turn of conversation history sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Character sheet the model is asked to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaContext {
    pub name: String,
    pub personality_type: String,
    pub description: String,
    pub background: String,
    pub communication_style: String,
    pub common_concerns: String,
    pub child_name: String,
    pub child_age: Option<i64>,
    pub child_grade: String,
    pub system_prompt: String,
}

impl Default for PersonaContext {
    fn default() -> Self {
        Self {
            name: "Phụ huynh".to_string(),
            personality_type: "friendly".to_string(),
            description: String::new(),
            background: String::new(),
            communication_style: String::new(),
            common_concerns: String::new(),
            child_name: String::new(),
            child_age: None,
            child_grade: String::new(),
            system_prompt: String::new(),
        }
    }
}

impl PersonaContext {
    /// The system instruction for this persona.
    ///
    /// An explicit `system_prompt` wins; otherwise one is assembled from the
    /// character fields.
    pub fn build_system_message(&self) -> String {
        if !self.system_prompt.is_empty() {
            return self.system_prompt.clone();
        }

        let mut lines = vec![
            format!("Bạn đang đóng vai một phụ huynh tên là {}.", self.name),
            format!("Tính cách: {}.", self.personality_type),
            format!("Mô tả: {}.", self.description),
        ];
        if !self.background.is_empty() {
            lines.push(format!("Hoàn cảnh: {}.", self.background));
        }
        if !self.communication_style.is_empty() {
            lines.push(format!("Phong cách giao tiếp: {}.", self.communication_style));
        }
        if !self.common_concerns.is_empty() {
            lines.push(format!("Các mối quan tâm: {}.", self.common_concerns));
        }
        if !self.child_name.is_empty() {
            let mut child = format!("Con của bạn tên là {}", self.child_name);
            if let Some(age) = self.child_age.filter(|a| *a != 0) {
                child.push_str(&format!(", {age} tuổi"));
            }
            if !self.child_grade.is_empty() {
                child.push_str(&format!(", học lớp {}", self.child_grade));
            }
            child.push('.');
            lines.push(child);
        }
        lines.push(String::new());
        lines.push(
            "Hãy trả lời như một phụ huynh thực sự, với ngôn ngữ tự nhiên và phù hợp với tính cách đã được gán."
                .to_string(),
        );
        lines.push("Luôn duy trì vai diễn và không phá vỡ nhân vật.".to_string());
        lines.join("\n")
    }
}

/// Sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            stop_sequences: Vec::new(),
        }
    }
}

/// A fully-validated generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub history: Vec<ChatTurn>,
    pub persona: Option<PersonaContext>,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
            persona: None,
            params: GenerationParams::default(),
        }
    }

    /// `[system(persona)]? ++ history ++ [user(prompt)]`.
    pub fn full_history(&self) -> Vec<ChatTurn> {
        let mut turns = Vec::with_capacity(self.history.len() + 2);
        if let Some(persona) = &self.persona {
            turns.push(ChatTurn::new(MessageRole::System, persona.build_system_message()));
        }
        turns.extend(self.history.iter().cloned());
        turns.push(ChatTurn::new(MessageRole::User, self.prompt.clone()));
        turns
    }
}

/// Result of a non-streaming generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub content: String,
    pub finish_reason: String,
    pub tokens_used: i64,
    pub model: String,
    pub latency_ms: f64,
    pub cached: bool,
}

/// One streamed piece of a reply. The last chunk has `is_final` set and empty content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content: String,
    pub is_final: bool,
    pub tokens_used: i64,
}

/// Body of `POST /api/ai/chat/` before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub prompt: Option<String>,
    pub history: Vec<ChatTurnInput>,
    pub persona: Option<PersonaContext>,
    pub params: Option<GenerationParamsInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatTurnInput {
    pub role: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerationParamsInput {
    pub max_tokens: Option<i64>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<i64>,
}

/// Machine-readable AI failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiErrorCode {
    ApiKey,
    RateLimit,
    QuotaExceeded,
    Model,
    ContentFiltered,
    Timeout,
    Network,
    InvalidRequest,
    Generation,
    Other,
}

impl AiErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiErrorCode::ApiKey => "API_KEY_ERROR",
            AiErrorCode::RateLimit => "RATE_LIMIT_ERROR",
            AiErrorCode::QuotaExceeded => "QUOTA_EXCEEDED",
            AiErrorCode::Model => "MODEL_ERROR",
            AiErrorCode::ContentFiltered => "CONTENT_FILTERED",
            AiErrorCode::Timeout => "TIMEOUT_ERROR",
            AiErrorCode::Network => "NETWORK_ERROR",
            AiErrorCode::InvalidRequest => "INVALID_REQUEST",
            AiErrorCode::Generation => "GENERATION_ERROR",
            AiErrorCode::Other => "AI_ERROR",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            AiErrorCode::ApiKey => "API key không hợp lệ hoặc chưa được cấu hình.",
            AiErrorCode::RateLimit => "Đã vượt quá giới hạn request. Vui lòng thử lại sau.",
            AiErrorCode::QuotaExceeded => "Đã hết quota API. Vui lòng liên hệ admin.",
            AiErrorCode::Model => "Lỗi model AI. Vui lòng thử lại sau.",
            AiErrorCode::ContentFiltered => "Nội dung bị chặn bởi bộ lọc an toàn.",
            AiErrorCode::Timeout => "Request đã hết thời gian chờ. Vui lòng thử lại.",
            AiErrorCode::Network => "Lỗi kết nối mạng. Vui lòng kiểm tra kết nối.",
            AiErrorCode::InvalidRequest => "Request không hợp lệ.",
            AiErrorCode::Generation => "Lỗi trong quá trình tạo nội dung.",
            AiErrorCode::Other => "Lỗi dịch vụ AI.",
        }
    }
}

impl fmt::Display for AiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure from the chat provider, already translated into the
/// user-facing taxonomy.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct AiError {
    pub code: AiErrorCode,
    pub message: String,
    pub details: Map<String, Value>,
}

impl AiError {
    pub fn new(code: AiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Map::new(),
        }
    }

    /// Error carrying the default message for `code`.
    pub fn from_code(code: AiErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = details;
        self
    }

    /// `{"error": {"code", "message", "details"}}`
    pub fn to_body(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "details": self.details,
            }
        })
    }
}
