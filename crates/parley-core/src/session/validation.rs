//! Session and message form rules.

use parley_types::error::ValidationErrors;
use parley_types::message::{MessageInput, MessageRole, MessageType, NewMessage};
use parley_types::session::{Session, SessionEndInput, SessionStatus, SessionUpdateInput};
use uuid::Uuid;

use crate::validation::{self, REQUIRED};

pub const PERSONA_UNAVAILABLE: &str = "Persona này không khả dụng.";
pub const TITLE_TOO_LONG: &str = "Tiêu đề không được quá 255 ký tự.";
pub const RATING_RANGE: &str = "Đánh giá phải từ 1 đến 5 sao.";
pub const FEEDBACK_TOO_LONG: &str = "Phản hồi không được quá 2000 ký tự.";
pub const ROLE_NOT_ALLOWED: &str =
    "Chỉ có thể tạo tin nhắn với vai trò 'user' hoặc 'assistant'.";
pub const CONTENT_EMPTY: &str = "Nội dung tin nhắn không được để trống.";
pub const CONTENT_TOO_LONG: &str = "Nội dung tin nhắn không được quá 10000 ký tự.";
pub const VOICE_NEEDS_AUDIO: &str = "Tin nhắn voice cần có URL audio.";

const TITLE_MAX: usize = 255;
const FEEDBACK_MAX: usize = 2000;
const CONTENT_MAX: usize = 10_000;

pub fn persona_not_found(raw: &str) -> String {
    format!("Khóa chính không hợp lệ \"{raw}\" - đối tượng không tồn tại.")
}

/// Trim a title and check its length.
pub fn check_title(errors: &mut ValidationErrors, raw: Option<&str>) -> String {
    let title = raw.unwrap_or_default().trim();
    if validation::char_len(title) > TITLE_MAX {
        errors.add("title", TITLE_TOO_LONG);
    }
    title.to_string()
}

/// Apply status, rating and feedback edits to `session`.
///
/// Moving to a non-active status stamps `ended_at` (if unset) and
/// recomputes the duration.
pub fn apply_update(session: &mut Session, input: &SessionUpdateInput) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let status = input
        .status
        .as_deref()
        .and_then(|raw| validation::parse_choice::<SessionStatus>(&mut errors, "status", raw));
    if let Some(rating) = input.rating {
        if (1..=5).contains(&rating) {
            session.rating = Some(rating);
        } else {
            errors.add("rating", RATING_RANGE);
        }
    }
    if let Some(feedback) = &input.feedback {
        let feedback = feedback.trim();
        if validation::char_len(feedback) > FEEDBACK_MAX {
            errors.add("feedback", FEEDBACK_TOO_LONG);
        } else {
            session.feedback = feedback.to_string();
        }
    }

    if errors.is_empty() {
        match status {
            Some(SessionStatus::Active) => session.status = SessionStatus::Active,
            Some(done) => session.finish(done, chrono::Utc::now()),
            None => {}
        }
    }
    errors
}

/// Rating and feedback supplied when ending a session.
pub fn validate_end(input: &SessionEndInput) -> Result<(Option<i64>, Option<String>), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Some(rating) = input.rating {
        if rating > 5 {
            errors.add("rating", validation::max_value(5));
        } else if rating < 1 {
            errors.add("rating", validation::min_value(1));
        }
    }
    let feedback = input.feedback.as_deref().map(str::trim);
    if let Some(feedback) = feedback {
        if validation::char_len(feedback) > FEEDBACK_MAX {
            errors.add("feedback", validation::max_length(FEEDBACK_MAX));
        }
    }
    errors.into_result()?;
    Ok((input.rating, feedback.map(str::to_string)))
}

/// Validate a message for `session_id`.
///
/// Field rules run first; the voice/audio_url rule only when they pass.
pub fn validate_message(session_id: Uuid, input: &MessageInput) -> Result<NewMessage, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let role = match input.role.as_deref() {
        None => {
            errors.add("role", REQUIRED);
            None
        }
        Some(raw) => match validation::parse_choice::<MessageRole>(&mut errors, "role", raw) {
            Some(MessageRole::System) => {
                errors.add("role", ROLE_NOT_ALLOWED);
                None
            }
            other => other,
        },
    };

    let content = match input.content.as_deref() {
        None => {
            errors.add("content", REQUIRED);
            String::new()
        }
        Some(raw) => {
            let content = raw.trim();
            if content.is_empty() {
                errors.add("content", CONTENT_EMPTY);
            } else if validation::char_len(content) > CONTENT_MAX {
                errors.add("content", CONTENT_TOO_LONG);
            }
            content.to_string()
        }
    };

    let message_type = match input.message_type.as_deref() {
        None => Some(MessageType::default()),
        Some(raw) => validation::parse_choice::<MessageType>(&mut errors, "message_type", raw),
    };
    let audio_url = input.audio_url.as_deref().unwrap_or_default().trim().to_string();

    errors.into_result()?;
    let (Some(role), Some(message_type)) = (role, message_type) else {
        return Err(ValidationErrors::single("role", REQUIRED));
    };
    if message_type == MessageType::Voice && audio_url.is_empty() {
        return Err(ValidationErrors::single("audio_url", VOICE_NEEDS_AUDIO));
    }

    Ok(NewMessage {
        session_id,
        role,
        content,
        message_type,
        audio_url,
        audio_duration_seconds: input.audio_duration_seconds,
        tokens_used: 0,
    })
}
