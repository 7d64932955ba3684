//! Practice sessions and their messages.

pub mod service;
pub mod validation;

use parley_types::error::ValidationErrors;
use parley_types::message::{MessageRole, MessageType};
use parley_types::session::SessionStatus;
use serde::Deserialize;
use uuid::Uuid;

use crate::repository::message::MessageFilter;
use crate::repository::parse_ordering;
use crate::repository::session::SessionFilter;
use crate::validation as rules;

pub const ORDERING_FIELDS: [&str; 3] = ["started_at", "rating", "total_messages"];

/// Raw `GET /api/sessions/` query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionQuery {
    pub status: Option<String>,
    pub persona: Option<String>,
    pub persona_name: Option<String>,
    pub rating_min: Option<String>,
    pub rating_max: Option<String>,
    pub has_feedback: Option<String>,
    pub started_after: Option<String>,
    pub started_before: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl SessionQuery {
    pub fn into_filter(self) -> Result<SessionFilter, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut filter = SessionFilter {
            persona_name: rules::non_empty(self.persona_name),
            limit: rules::parse_page_param(self.limit.as_deref()),
            offset: rules::parse_page_param(self.offset.as_deref()),
            ..Default::default()
        };

        if let Some(raw) = rules::non_empty(self.status) {
            filter.status = rules::parse_choice::<SessionStatus>(&mut errors, "status", &raw);
        }
        if let Some(raw) = rules::non_empty(self.persona) {
            filter.persona = rules::parse_uuid(&mut errors, "persona", &raw);
        }
        if let Some(raw) = rules::non_empty(self.rating_min) {
            filter.rating_min = rules::parse_int(&mut errors, "rating_min", &raw);
        }
        if let Some(raw) = rules::non_empty(self.rating_max) {
            filter.rating_max = rules::parse_int(&mut errors, "rating_max", &raw);
        }
        if let Some(raw) = rules::non_empty(self.has_feedback) {
            filter.has_feedback = rules::parse_bool(&mut errors, "has_feedback", &raw);
        }
        if let Some(raw) = rules::non_empty(self.started_after) {
            filter.started_after = rules::parse_datetime(&mut errors, "started_after", &raw);
        }
        if let Some(raw) = rules::non_empty(self.started_before) {
            filter.started_before = rules::parse_datetime(&mut errors, "started_before", &raw);
        }
        if let Some((field, order)) = self
            .ordering
            .as_deref()
            .and_then(|raw| parse_ordering(raw.trim(), &ORDERING_FIELDS))
        {
            filter.sort_by = Some(field.to_string());
            filter.sort_order = Some(order);
        }

        errors.into_result()?;
        Ok(filter)
    }
}

/// Raw `GET /api/messages/` query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageQuery {
    pub session: Option<String>,
    pub role: Option<String>,
    pub message_type: Option<String>,
}

impl MessageQuery {
    /// The session to list (if any) and the per-message filter.
    pub fn into_filter(self) -> Result<(Option<Uuid>, MessageFilter), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let session = rules::non_empty(self.session)
            .and_then(|raw| rules::parse_uuid(&mut errors, "session", &raw));
        let mut filter = MessageFilter::default();
        if let Some(raw) = rules::non_empty(self.role) {
            filter.role = rules::parse_choice::<MessageRole>(&mut errors, "role", &raw);
        }
        if let Some(raw) = rules::non_empty(self.message_type) {
            filter.message_type = rules::parse_choice::<MessageType>(&mut errors, "message_type", &raw);
        }
        errors.into_result()?;
        Ok((session, filter))
    }
}
