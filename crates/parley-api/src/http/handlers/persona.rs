//! Persona catalogue handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;

use parley_core::persona::PersonaQuery;
use parley_types::persona::{PersonaDetail, PersonaInput, PersonaStats, PersonaSummary};

use crate::http::error::AppError;
use crate::http::extractors::auth::{CurrentUser, MaybeUser};
use crate::http::extractors::json::JsonBody;
use crate::http::extractors::path::ResourceId;
use crate::state::AppState;

/// GET /api/personas/ - Visible personas, filtered and ordered.
pub async fn list_personas(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<PersonaQuery>,
) -> Result<Json<Vec<PersonaSummary>>, AppError> {
    let filter = query.into_filter()?;
    let personas = state.persona_service.list(&viewer, filter).await?;
    Ok(Json(personas))
}

/// POST /api/personas/
pub async fn create_persona(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    JsonBody(body): JsonBody<PersonaInput>,
) -> Result<(StatusCode, Json<PersonaDetail>), AppError> {
    let persona = state.persona_service.create(&caller, body).await?;
    Ok((StatusCode::CREATED, Json(persona)))
}

/// GET /api/personas/my_personas/
pub async fn my_personas(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<PersonaSummary>>, AppError> {
    Ok(Json(state.persona_service.my_personas(&caller).await?))
}

/// GET /api/personas/{id}/
pub async fn get_persona(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    ResourceId(id): ResourceId,
) -> Result<Json<PersonaDetail>, AppError> {
    Ok(Json(state.persona_service.retrieve(&viewer, &id).await?))
}

/// PUT /api/personas/{id}/
pub async fn replace_persona(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ResourceId(id): ResourceId,
    JsonBody(body): JsonBody<PersonaInput>,
) -> Result<Json<PersonaDetail>, AppError> {
    let persona = state.persona_service.update(&caller, &id, body, false).await?;
    Ok(Json(persona))
}

/// PATCH /api/personas/{id}/
pub async fn patch_persona(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ResourceId(id): ResourceId,
    JsonBody(body): JsonBody<PersonaInput>,
) -> Result<Json<PersonaDetail>, AppError> {
    let persona = state.persona_service.update(&caller, &id, body, true).await?;
    Ok(Json(persona))
}

/// DELETE /api/personas/{id}/
pub async fn delete_persona(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ResourceId(id): ResourceId,
) -> Result<StatusCode, AppError> {
    state.persona_service.destroy(&caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/personas/{id}/stats/
pub async fn persona_stats(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    ResourceId(id): ResourceId,
) -> Result<Json<PersonaStats>, AppError> {
    Ok(Json(state.persona_service.stats(&viewer, &id).await?))
}
