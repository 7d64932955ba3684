//! Persona repository trait definition.

use chrono::{DateTime, Utc};
use parley_types::error::RepositoryError;
use parley_types::persona::{DifficultyLevel, Persona, PersonaRecord, PersonaStats, PersonalityType};
use uuid::Uuid;

use super::SortOrder;

/// Which personas a caller may see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PersonaVisibility {
    /// Staff: everything.
    All,
    /// Anonymous callers.
    #[default]
    ActiveOnly,
    /// Signed-in users: active personas plus their own.
    ActiveOrOwnedBy(Uuid),
}

/// Filter criteria for listing personas.
#[derive(Debug, Clone, Default)]
pub struct PersonaFilter {
    pub visibility: PersonaVisibility,
    /// Case-insensitive substring over name, description, background and child_name.
    pub search: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub personality: Option<PersonalityType>,
    pub difficulty: Option<DifficultyLevel>,
    pub is_active: Option<bool>,
    pub created_by: Option<Uuid>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    /// Field to sort by ("name", "created_at", "difficulty_level").
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Repository trait for persona persistence.
///
/// Implementations live in parley-infra (e.g., `SqlitePersonaRepository`).
pub trait PersonaRepository: Send + Sync {
    fn create(
        &self,
        persona: &Persona,
    ) -> impl std::future::Future<Output = Result<PersonaRecord, RepositoryError>> + Send;

    /// Fetch one persona with its joined counters, honouring `visibility`.
    fn get(
        &self,
        id: &Uuid,
        visibility: &PersonaVisibility,
    ) -> impl std::future::Future<Output = Result<Option<PersonaRecord>, RepositoryError>> + Send;

    fn list(
        &self,
        filter: &PersonaFilter,
    ) -> impl std::future::Future<Output = Result<Vec<PersonaRecord>, RepositoryError>> + Send;

    fn update(
        &self,
        persona: &Persona,
    ) -> impl std::future::Future<Output = Result<PersonaRecord, RepositoryError>> + Send;

    /// Delete a persona; its sessions and their messages cascade.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Whether another persona already uses `name` (case-insensitive).
    fn name_exists(
        &self,
        name: &str,
        exclude: Option<&Uuid>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    fn count_active_sessions(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    fn stats(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<PersonaStats, RepositoryError>> + Send;

    /// Remove all personas without a creator. Returns how many were deleted.
    fn delete_unowned(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
