//! Session repository trait definition.

use chrono::{DateTime, Utc};
use parley_types::error::RepositoryError;
use parley_types::session::{Session, SessionRecord, SessionStatus};
use uuid::Uuid;

use super::SortOrder;

/// Filter criteria for listing a user's sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub status: Option<SessionStatus>,
    pub persona: Option<Uuid>,
    /// Case-insensitive substring of the persona name.
    pub persona_name: Option<String>,
    pub rating_min: Option<i64>,
    pub rating_max: Option<i64>,
    /// `true`: non-empty feedback only; `false`: empty feedback only.
    pub has_feedback: Option<bool>,
    pub started_after: Option<DateTime<Utc>>,
    pub started_before: Option<DateTime<Utc>>,
    /// Field to sort by ("started_at", "rating", "total_messages").
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Repository trait for practice sessions.
///
/// All reads are scoped to an owning user; a session belonging to someone
/// else is indistinguishable from a missing one.
pub trait SessionRepository: Send + Sync {
    fn create(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<SessionRecord, RepositoryError>> + Send;

    fn get_for_user(
        &self,
        id: &Uuid,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<SessionRecord>, RepositoryError>> + Send;

    fn list_for_user(
        &self,
        user_id: &Uuid,
        filter: &SessionFilter,
    ) -> impl std::future::Future<Output = Result<Vec<SessionRecord>, RepositoryError>> + Send;

    /// Persist status, rating, feedback, end time and duration.
    fn update(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a session; its messages cascade.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
