//! Bearer-token authentication extractors.
//!
//! Access tokens are read from `Authorization: Bearer <token>` and resolved
//! through `AuthService::authenticate`.

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;

use parley_types::user::{AuthUser, Viewer};

use crate::http::error::AppError;
use crate::state::AppState;

/// An authenticated caller. Extraction fails with 401 without a valid token.
pub struct CurrentUser(pub AuthUser);

/// The caller on public endpoints: anonymous when no token is sent.
/// A token that is sent but invalid is still rejected.
pub struct MaybeUser(pub Viewer);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AppError::Status(StatusCode::UNAUTHORIZED))?;
        let user = state.auth_service.authenticate(&token).await?;
        Ok(CurrentUser(user))
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => {
                let user = state.auth_service.authenticate(&token).await?;
                Ok(MaybeUser(Viewer::User(user)))
            }
            None => Ok(MaybeUser(Viewer::Anonymous)),
        }
    }
}

/// Extract the bearer token, if an Authorization header is present.
fn bearer_token(parts: &Parts) -> Result<Option<String>, AppError> {
    let Some(auth) = parts.headers.get("authorization") else {
        return Ok(None);
    };
    let auth_str = auth
        .to_str()
        .map_err(|_| AppError::Status(StatusCode::UNAUTHORIZED))?;
    match auth_str.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim().to_string()))
        }
        _ => Err(AppError::Status(StatusCode::UNAUTHORIZED)),
    }
}
