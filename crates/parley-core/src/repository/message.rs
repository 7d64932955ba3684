//! Message repository trait definition.

use parley_types::error::RepositoryError;
use parley_types::message::{Message, MessageRole, MessageType, NewMessage};
use uuid::Uuid;

/// Filter for the cross-session message listing.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub role: Option<MessageRole>,
    pub message_type: Option<MessageType>,
}

/// Repository trait for session messages.
pub trait MessageRepository: Send + Sync {
    /// Append a message to its session.
    ///
    /// Assigns `order = last + 1` and refreshes `sessions.total_messages`
    /// in the same write transaction.
    fn append(
        &self,
        message: &NewMessage,
    ) -> impl std::future::Future<Output = Result<Message, RepositoryError>> + Send;

    /// Messages of a session ordered by `order`, then `created_at`.
    fn list_for_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Messages of `session_id` only if that session belongs to `user_id`.
    fn list_for_user_session(
        &self,
        session_id: &Uuid,
        user_id: &Uuid,
        filter: &MessageFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;
}
