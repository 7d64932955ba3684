//! Parent personas that users practise conversations with.
//!
//! A persona carries the character sheet (personality, difficulty, family
//! background, child details) and the system prompt handed to the chat model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::user::Viewer;

/// Personality archetype of a persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonalityType {
    Friendly,
    Strict,
    Anxious,
    Demanding,
    Supportive,
    Skeptical,
    Busy,
}

impl PersonalityType {
    pub const ALL: [PersonalityType; 7] = [
        PersonalityType::Friendly,
        PersonalityType::Strict,
        PersonalityType::Anxious,
        PersonalityType::Demanding,
        PersonalityType::Supportive,
        PersonalityType::Skeptical,
        PersonalityType::Busy,
    ];

    /// Human-readable Vietnamese label.
    pub fn label(&self) -> &'static str {
        match self {
            PersonalityType::Friendly => "Thân thiện",
            PersonalityType::Strict => "Nghiêm khắc",
            PersonalityType::Anxious => "Lo lắng",
            PersonalityType::Demanding => "Đòi hỏi cao",
            PersonalityType::Supportive => "Hỗ trợ",
            PersonalityType::Skeptical => "Hoài nghi",
            PersonalityType::Busy => "Bận rộn",
        }
    }
}

impl fmt::Display for PersonalityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonalityType::Friendly => write!(f, "friendly"),
            PersonalityType::Strict => write!(f, "strict"),
            PersonalityType::Anxious => write!(f, "anxious"),
            PersonalityType::Demanding => write!(f, "demanding"),
            PersonalityType::Supportive => write!(f, "supportive"),
            PersonalityType::Skeptical => write!(f, "skeptical"),
            PersonalityType::Busy => write!(f, "busy"),
        }
    }
}

impl FromStr for PersonalityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "friendly" => Ok(PersonalityType::Friendly),
            "strict" => Ok(PersonalityType::Strict),
            "anxious" => Ok(PersonalityType::Anxious),
            "demanding" => Ok(PersonalityType::Demanding),
            "supportive" => Ok(PersonalityType::Supportive),
            "skeptical" => Ok(PersonalityType::Skeptical),
            "busy" => Ok(PersonalityType::Busy),
            other => Err(format!("invalid personality type: '{other}'")),
        }
    }
}

impl Default for PersonalityType {
    fn default() -> Self {
        PersonalityType::Friendly
    }
}

/// How hard the persona is to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl DifficultyLevel {
    pub fn label(&self) -> &'static str {
        match self {
            DifficultyLevel::Easy => "Dễ",
            DifficultyLevel::Medium => "Trung bình",
            DifficultyLevel::Hard => "Khó",
            DifficultyLevel::Expert => "Chuyên gia",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyLevel::Easy => write!(f, "easy"),
            DifficultyLevel::Medium => write!(f, "medium"),
            DifficultyLevel::Hard => write!(f, "hard"),
            DifficultyLevel::Expert => write!(f, "expert"),
        }
    }
}

impl FromStr for DifficultyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(DifficultyLevel::Easy),
            "medium" => Ok(DifficultyLevel::Medium),
            "hard" => Ok(DifficultyLevel::Hard),
            "expert" => Ok(DifficultyLevel::Expert),
            other => Err(format!("invalid difficulty level: '{other}'")),
        }
    }
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        DifficultyLevel::Medium
    }
}

/// A persona row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub description: String,
    pub personality_type: PersonalityType,
    pub difficulty_level: DifficultyLevel,
    pub background: String,
    pub child_name: String,
    pub child_age: Option<i64>,
    pub child_grade: String,
    pub communication_style: String,
    pub common_concerns: String,
    pub system_prompt: String,
    pub is_active: bool,
    /// Creator; `None` for built-in personas or after the creator is deleted.
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persona together with the values joined in by the repository.
#[derive(Debug, Clone)]
pub struct PersonaRecord {
    pub persona: Persona,
    /// Number of sessions (any status) that use this persona.
    pub session_count: i64,
    pub created_by_email: Option<String>,
}

/// List representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub description: String,
    pub personality_type: PersonalityType,
    pub personality_type_display: String,
    pub difficulty_level: DifficultyLevel,
    pub difficulty_level_display: String,
    pub is_active: bool,
    pub session_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&PersonaRecord> for PersonaSummary {
    fn from(record: &PersonaRecord) -> Self {
        let p = &record.persona;
        Self {
            id: p.id,
            name: p.name.clone(),
            avatar: p.avatar.clone(),
            description: p.description.clone(),
            personality_type: p.personality_type,
            personality_type_display: p.personality_type.label().to_string(),
            difficulty_level: p.difficulty_level,
            difficulty_level_display: p.difficulty_level.label().to_string(),
            is_active: p.is_active,
            session_count: record.session_count,
            created_at: p.created_at,
        }
    }
}

/// Detail representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaDetail {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub description: String,
    pub personality_type: PersonalityType,
    pub personality_type_display: String,
    pub difficulty_level: DifficultyLevel,
    pub difficulty_level_display: String,
    pub background: String,
    pub child_name: String,
    pub child_age: Option<i64>,
    pub child_grade: String,
    pub communication_style: String,
    pub common_concerns: String,
    pub system_prompt: String,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_by_email: Option<String>,
    pub session_count: i64,
    pub is_owner: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersonaDetail {
    pub fn new(record: &PersonaRecord, viewer: &Viewer) -> Self {
        let p = &record.persona;
        let is_owner = match (viewer.user(), p.created_by) {
            (Some(user), Some(owner)) => user.id == owner,
            _ => false,
        };
        Self {
            id: p.id,
            name: p.name.clone(),
            avatar: p.avatar.clone(),
            description: p.description.clone(),
            personality_type: p.personality_type,
            personality_type_display: p.personality_type.label().to_string(),
            difficulty_level: p.difficulty_level,
            difficulty_level_display: p.difficulty_level.label().to_string(),
            background: p.background.clone(),
            child_name: p.child_name.clone(),
            child_age: p.child_age,
            child_grade: p.child_grade.clone(),
            communication_style: p.communication_style.clone(),
            common_concerns: p.common_concerns.clone(),
            system_prompt: p.system_prompt.clone(),
            is_active: p.is_active,
            created_by: p.created_by,
            created_by_email: record.created_by_email.clone(),
            session_count: record.session_count,
            is_owner,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Writable persona fields.
///
/// Every field is optional so the same shape serves create (PUT-like, required
/// fields enforced by validation) and partial update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersonaInput {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub description: Option<String>,
    pub personality_type: Option<String>,
    pub difficulty_level: Option<String>,
    pub background: Option<String>,
    pub child_name: Option<String>,
    pub child_age: Option<i64>,
    pub child_grade: Option<String>,
    pub communication_style: Option<String>,
    pub common_concerns: Option<String>,
    pub system_prompt: Option<String>,
    pub is_active: Option<bool>,
}

/// Aggregates over the sessions that used a persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaStats {
    pub total_sessions: i64,
    pub completed_sessions: i64,
    /// Mean rating over rated sessions, rounded to two decimals.
    pub average_rating: Option<f64>,
    pub average_duration_seconds: i64,
}
