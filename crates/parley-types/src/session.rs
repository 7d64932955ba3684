//! Practice sessions: one conversation between a user and a persona.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::message::MessageView;
use crate::persona::PersonaSummary;

/// Lifecycle status of a practice session.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (status IN ('active', 'completed', 'abandoned'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Active => "Đang diễn ra",
            SessionStatus::Completed => "Hoàn thành",
            SessionStatus::Abandoned => "Bỏ dở",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "abandoned" => Ok(SessionStatus::Abandoned),
            other => Err(format!("invalid session status: '{other}'")),
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Active
    }
}

/// A practice session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub persona_id: Uuid,
    pub title: String,
    pub scenario: String,
    pub status: SessionStatus,
    pub total_messages: i64,
    pub total_duration_seconds: i64,
    pub rating: Option<i64>,
    pub feedback: String,
    pub ai_feedback: String,
    pub score: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(user_id: Uuid, persona_id: Uuid, title: String, scenario: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            persona_id,
            title,
            scenario,
            status: SessionStatus::Active,
            total_messages: 0,
            total_duration_seconds: 0,
            rating: None,
            feedback: String::new(),
            ai_feedback: String::new(),
            score: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Move to a terminal status, stamping `ended_at` if unset and
    /// recomputing the duration from it.
    pub fn finish(&mut self, status: SessionStatus, now: DateTime<Utc>) {
        self.status = status;
        if self.ended_at.is_none() {
            self.ended_at = Some(now);
        }
        self.recompute_duration();
    }

    /// `total_duration_seconds = ended_at - started_at`, when ended.
    pub fn recompute_duration(&mut self) {
        if let Some(ended) = self.ended_at {
            self.total_duration_seconds = (ended - self.started_at).num_seconds().max(0);
        }
    }

    pub fn duration_formatted(&self) -> String {
        format_duration(self.total_duration_seconds)
    }
}

/// `MM:SS` below one hour, `HH:MM:SS` from one hour up.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 3600 {
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    } else {
        format!(
            "{:02}:{:02}:{:02}",
            seconds / 3600,
            (seconds % 3600) / 60,
            seconds % 60
        )
    }
}

/// A session plus the joined persona and user columns.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session: Session,
    pub persona_name: String,
    pub persona_avatar: Option<String>,
    pub user_email: String,
}

/// List representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub persona: Uuid,
    pub persona_name: String,
    pub persona_avatar: Option<String>,
    pub title: String,
    pub status: SessionStatus,
    pub status_display: String,
    pub total_messages: i64,
    pub total_duration_seconds: i64,
    pub duration_formatted: String,
    pub rating: Option<i64>,
    pub score: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<&SessionRecord> for SessionSummary {
    fn from(record: &SessionRecord) -> Self {
        let s = &record.session;
        Self {
            id: s.id,
            persona: s.persona_id,
            persona_name: record.persona_name.clone(),
            persona_avatar: record.persona_avatar.clone(),
            title: s.title.clone(),
            status: s.status,
            status_display: s.status.label().to_string(),
            total_messages: s.total_messages,
            total_duration_seconds: s.total_duration_seconds,
            duration_formatted: s.duration_formatted(),
            rating: s.rating,
            score: s.score,
            started_at: s.started_at,
            ended_at: s.ended_at,
        }
    }
}

/// Detail representation, with the persona and the full message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    pub id: Uuid,
    pub user: Uuid,
    pub user_email: String,
    pub persona: PersonaSummary,
    pub title: String,
    pub scenario: String,
    pub status: SessionStatus,
    pub status_display: String,
    pub total_messages: i64,
    pub total_duration_seconds: i64,
    pub duration_formatted: String,
    pub rating: Option<i64>,
    pub feedback: String,
    pub ai_feedback: String,
    pub score: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub messages: Vec<MessageView>,
}

impl SessionDetail {
    pub fn new(record: &SessionRecord, persona: PersonaSummary, messages: Vec<MessageView>) -> Self {
        let s = &record.session;
        Self {
            id: s.id,
            user: s.user_id,
            user_email: record.user_email.clone(),
            persona,
            title: s.title.clone(),
            scenario: s.scenario.clone(),
            status: s.status,
            status_display: s.status.label().to_string(),
            total_messages: s.total_messages,
            total_duration_seconds: s.total_duration_seconds,
            duration_formatted: s.duration_formatted(),
            rating: s.rating,
            feedback: s.feedback.clone(),
            ai_feedback: s.ai_feedback.clone(),
            score: s.score,
            started_at: s.started_at,
            ended_at: s.ended_at,
            messages,
        }
    }
}

/// Body of `POST /api/sessions/`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionCreateInput {
    pub persona: Option<String>,
    pub title: Option<String>,
    pub scenario: Option<String>,
}

/// Body of `PUT/PATCH /api/sessions/{id}/`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionUpdateInput {
    pub status: Option<String>,
    pub rating: Option<i64>,
    pub feedback: Option<String>,
}

/// Body of `POST /api/sessions/{id}/end/`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionEndInput {
    pub rating: Option<i64>,
    pub feedback: Option<String>,
}
