//! Message listing across the caller's sessions.

use axum::Json;
use axum::extract::{Query, State};

use parley_core::session::MessageQuery;
use parley_types::message::MessageView;

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::state::AppState;

/// GET /api/messages/?session=<uuid>&role=&message_type=
pub async fn list_messages(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Vec<MessageView>>, AppError> {
    let (session, filter) = query.into_filter()?;
    let messages = state
        .session_service
        .list_messages(&caller, session, filter)
        .await?;
    Ok(Json(messages))
}
