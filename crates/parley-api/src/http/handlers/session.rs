//! Practice session handlers. Every route is scoped to the caller's own sessions.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;

use parley_core::session::SessionQuery;
use parley_core::session::service::ReplyOutcome;
use parley_types::message::{MessageInput, MessageView};
use parley_types::session::{
    SessionCreateInput, SessionDetail, SessionEndInput, SessionSummary, SessionUpdateInput,
};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::http::extractors::json::JsonBody;
use crate::http::extractors::path::ResourceId;
use crate::state::AppState;

/// GET /api/sessions/
pub async fn list_sessions(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    let filter = query.into_filter()?;
    Ok(Json(state.session_service.list(&caller, filter).await?))
}

/// POST /api/sessions/ - Start a session with a persona.
pub async fn create_session(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    JsonBody(body): JsonBody<SessionCreateInput>,
) -> Result<(StatusCode, Json<SessionDetail>), AppError> {
    let session = state.session_service.create(&caller, body).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/sessions/{id}/
pub async fn get_session(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ResourceId(id): ResourceId,
) -> Result<Json<SessionDetail>, AppError> {
    Ok(Json(state.session_service.retrieve(&caller, &id).await?))
}

/// PUT/PATCH /api/sessions/{id}/ - Every field is optional, so both verbs share a handler.
pub async fn update_session(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ResourceId(id): ResourceId,
    JsonBody(body): JsonBody<SessionUpdateInput>,
) -> Result<Json<SessionDetail>, AppError> {
    Ok(Json(state.session_service.update(&caller, &id, body).await?))
}

/// DELETE /api/sessions/{id}/
pub async fn delete_session(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ResourceId(id): ResourceId,
) -> Result<StatusCode, AppError> {
    state.session_service.destroy(&caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/{id}/end/
pub async fn end_session(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ResourceId(id): ResourceId,
    JsonBody(body): JsonBody<SessionEndInput>,
) -> Result<Json<SessionDetail>, AppError> {
    Ok(Json(state.session_service.end(&caller, &id, body).await?))
}

/// POST /api/sessions/{id}/abandon/
pub async fn abandon_session(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ResourceId(id): ResourceId,
) -> Result<Json<SessionDetail>, AppError> {
    Ok(Json(state.session_service.abandon(&caller, &id).await?))
}

/// POST /api/sessions/{id}/add_message/
pub async fn add_message(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ResourceId(id): ResourceId,
    JsonBody(body): JsonBody<MessageInput>,
) -> Result<(StatusCode, Json<MessageView>), AppError> {
    let message = state.session_service.add_message(&caller, &id, body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/sessions/{id}/messages/
pub async fn session_messages(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ResourceId(id): ResourceId,
) -> Result<Json<Vec<MessageView>>, AppError> {
    Ok(Json(state.session_service.messages(&caller, &id).await?))
}

/// POST /api/sessions/{id}/reply/ - Store the user's turn and the persona's answer.
pub async fn reply(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ResourceId(id): ResourceId,
    JsonBody(body): JsonBody<MessageInput>,
) -> Result<(StatusCode, Json<ReplyOutcome>), AppError> {
    let outcome = state
        .session_service
        .reply(
            &caller,
            &id,
            body,
            state.chat_provider.as_ref(),
            &state.chat_defaults,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
