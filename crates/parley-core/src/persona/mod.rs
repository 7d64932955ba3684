//! Persona catalogue: listing with visibility rules, ownership-checked
//! edits, per-persona statistics and the built-in seed set.

pub mod service;
pub mod validation;

use parley_types::error::ValidationErrors;
use parley_types::persona::{DifficultyLevel, PersonalityType};
use serde::Deserialize;

use crate::repository::parse_ordering;
use crate::repository::persona::PersonaFilter;
use crate::validation as rules;

/// Fields a persona listing may be ordered by.
pub const ORDERING_FIELDS: [&str; 3] = ["name", "created_at", "difficulty_level"];

/// Raw `GET /api/personas/` query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersonaQuery {
    pub search: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub personality: Option<String>,
    pub difficulty: Option<String>,
    pub is_active: Option<String>,
    pub created_by: Option<String>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PersonaQuery {
    /// Parse into a repository filter. Visibility is left at its default;
    /// the service sets it from the viewer.
    pub fn into_filter(self) -> Result<PersonaFilter, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut filter = PersonaFilter {
            search: rules::non_empty(self.search),
            name: rules::non_empty(self.name),
            description: rules::non_empty(self.description),
            limit: rules::parse_page_param(self.limit.as_deref()),
            offset: rules::parse_page_param(self.offset.as_deref()),
            ..Default::default()
        };

        if let Some(raw) = rules::non_empty(self.personality) {
            filter.personality =
                rules::parse_choice::<PersonalityType>(&mut errors, "personality", &raw);
        }
        if let Some(raw) = rules::non_empty(self.difficulty) {
            filter.difficulty =
                rules::parse_choice::<DifficultyLevel>(&mut errors, "difficulty", &raw);
        }
        if let Some(raw) = rules::non_empty(self.is_active) {
            filter.is_active = rules::parse_bool(&mut errors, "is_active", &raw);
        }
        if let Some(raw) = rules::non_empty(self.created_by) {
            filter.created_by = rules::parse_uuid(&mut errors, "created_by", &raw);
        }
        if let Some(raw) = rules::non_empty(self.created_after) {
            filter.created_after = rules::parse_datetime(&mut errors, "created_after", &raw);
        }
        if let Some(raw) = rules::non_empty(self.created_before) {
            filter.created_before = rules::parse_datetime(&mut errors, "created_before", &raw);
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
