//! Account handlers: registration, tokens, profile.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use parley_types::user::{
    ChangePasswordInput, LoginInput, ProfileUpdate, PublicUser, RegisterInput,
};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::http::extractors::json::JsonBody;
use crate::state::AppState;

/// Body of the refresh and logout endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshBody {
    pub refresh: Option<String>,
}

/// POST /api/auth/register/
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (user, tokens) = state.auth_service.register(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Đăng ký thành công!",
            "user": PublicUser::from(&user),
            "tokens": tokens,
        })),
    ))
}

/// POST /api/auth/login/
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginInput>,
) -> Result<Json<Value>, AppError> {
    let (user, tokens) = state.auth_service.login(body).await?;
    Ok(Json(json!({
        "access": tokens.access,
        "refresh": tokens.refresh,
        "user": PublicUser::from(&user),
    })))
}

/// POST /api/auth/refresh/
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RefreshBody>,
) -> Result<Json<Value>, AppError> {
    let access = state.auth_service.refresh(body.refresh.as_deref()).await?;
    Ok(Json(json!({ "access": access })))
}

/// POST /api/auth/logout/ - Blacklist the given refresh token.
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    JsonBody(body): JsonBody<RefreshBody>,
) -> Result<Json<Value>, AppError> {
    state
        .auth_service
        .logout(&caller, body.refresh.as_deref())
        .await?;
    Ok(Json(json!({ "message": "Đăng xuất thành công!" })))
}

/// GET /api/auth/profile/
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.auth_service.profile(&caller.id).await?;
    Ok(Json(PublicUser::from(&user)))
}

/// PUT /api/auth/profile/
pub async fn replace_profile(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    JsonBody(body): JsonBody<ProfileUpdate>,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .auth_service
        .update_profile(&caller.id, body, false)
        .await?;
    Ok(Json(PublicUser::from(&user)))
}

/// PATCH /api/auth/profile/
pub async fn patch_profile(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    JsonBody(body): JsonBody<ProfileUpdate>,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .auth_service
        .update_profile(&caller.id, body, true)
        .await?;
    Ok(Json(PublicUser::from(&user)))
}

/// POST /api/auth/change-password/
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    JsonBody(body): JsonBody<ChangePasswordInput>,
) -> Result<Json<Value>, AppError> {
    state.auth_service.change_password(&caller.id, body).await?;
    Ok(Json(json!({ "message": "Đổi mật khẩu thành công!" })))
}
