//! Chat-model port and request validation.

pub mod box_provider;
pub mod provider;

use parley_types::ai::{ChatRequest, ChatTurn, GenerationParams, GenerationRequest};
use parley_types::error::ValidationErrors;
use parley_types::message::MessageRole;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::validation::{self, BLANK, REQUIRED};
use provider::ChatProvider;

pub const PROMPT_EMPTY: &str = "Prompt không được để trống.";
pub const PROMPT_TOO_LONG: &str = "Prompt không được quá 10000 ký tự.";
pub const PROMPT_MAX: usize = 10_000;

/// `GET /api/ai/health/` body.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AiHealth {
    pub status: &'static str,
    pub provider: String,
    pub model: String,
    pub configured: bool,
}

impl AiHealth {
    pub fn of<C: ChatProvider>(provider: &C) -> Self {
        let configured = provider.is_configured();
        Self {
            status: if configured { "ok" } else { "not_configured" },
            provider: provider.name().to_string(),
            model: provider.model().to_string(),
            configured,
        }
    }
}

/// Rejections of a chat request, shaped like the request itself.
///
/// Serializes as `{"prompt": [..], "history": [{}, {"content": [..]}],
/// "params": {"temperature": [..]}}`. `history` holds one entry per turn
/// and appears only when some turn failed; `params` only when non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequestErrors {
    pub fields: ValidationErrors,
    pub history: Vec<ValidationErrors>,
    pub params: ValidationErrors,
}

impl ChatRequestErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
            && self.params.is_empty()
            && self.history.iter().all(ValidationErrors::is_empty)
    }

    /// Errors of the `i`-th history turn, if it had any.
    pub fn turn(&self, i: usize) -> Option<&ValidationErrors> {
        self.history.get(i).filter(|e| !e.is_empty())
    }
}

impl Serialize for ChatRequestErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (field, messages) in self.fields.iter() {
            map.serialize_entry(field, messages)?;
        }
        if !self.history.iter().all(ValidationErrors::is_empty) {
            map.serialize_entry("history", &self.history)?;
        }
        if !self.params.is_empty() {
            map.serialize_entry("params", &self.params)?;
        }
        map.end()
    }
}

/// Validate a chat request body into a `GenerationRequest`.
///
/// Parameters that are absent take their value from `defaults`.
pub fn validate_chat_request(
    request: ChatRequest,
    defaults: &GenerationParams,
) -> Result<GenerationRequest, ChatRequestErrors> {
    let mut errors = ChatRequestErrors::default();

    let prompt = match request.prompt.as_deref() {
        None => {
            errors.fields.add("prompt", REQUIRED);
            String::new()
        }
        Some(raw) => {
            let prompt = raw.trim();
            if prompt.is_empty() {
                errors.fields.add("prompt", PROMPT_EMPTY);
            } else if validation::char_len(prompt) > PROMPT_MAX {
                errors.fields.add("prompt", PROMPT_TOO_LONG);
            }
            prompt.to_string()
        }
    };

    let mut history = Vec::with_capacity(request.history.len());
    for turn in request.history {
        let mut turn_errors = ValidationErrors::new();
        let role = match turn.role.as_deref() {
            None => {
                turn_errors.add("role", REQUIRED);
                None
            }
            Some(raw) => validation::parse_choice::<MessageRole>(&mut turn_errors, "role", raw),
        };
        let content = match turn.content {
            None => {
                turn_errors.add("content", REQUIRED);
                None
            }
            Some(c) if c.trim().is_empty() => {
                turn_errors.add("content", BLANK);
                None
            }
            Some(c) => Some(c),
        };
        if let (Some(role), Some(content)) = (role, content) {
            if turn_errors.is_empty() {
                history.push(ChatTurn::new(role, content));
            }
        }
        errors.history.push(turn_errors);
    }

    let mut params = defaults.clone();
    if let Some(input) = request.params {
        let param_errors = &mut errors.params;
        if let Some(v) = input.max_tokens {
            if let Some(v) = in_range(param_errors, "max_tokens", v, 1, 8192) {
                params.max_tokens = v as u32;
            }
        }
        if let Some(v) = input.temperature {
            if let Some(v) = in_range(param_errors, "temperature", v, 0.0, 2.0) {
                params.temperature = v;
            }
        }
        if let Some(v) = input.top_p {
            if let Some(v) = in_range(param_errors, "top_p", v, 0.0, 1.0) {
                params.top_p = v;
            }
        }
        if let Some(v) = input.top_k {
            if let Some(v) = in_range(param_errors, "top_k", v, 1, 100) {
                params.top_k = v as u32;
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(GenerationRequest {
        prompt,
        history,
        persona: request.persona,
        params,
    })
}

fn in_range<T: PartialOrd + std::fmt::Display + Copy>(
    errors: &mut ValidationErrors,
    field: &str,
    value: T,
    min: T,
    max: T,
) -> Option<T> {
    if value < min {
        errors.add(field, validation::min_value(min));
        None
    } else if value > max {
        errors.add(field, validation::max_value(max));
        None
    } else {
        Some(value)
    }
}
