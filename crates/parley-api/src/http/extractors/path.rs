//! Resource id path segment.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use parley_types::error::ServiceError;
use uuid::Uuid;

use crate::http::error::AppError;

/// The `{id}` segment of a resource route. Anything that is not a UUID
/// cannot name a resource, so it is reported as not found.
pub struct ResourceId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for ResourceId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Service(ServiceError::NotFound))?;
        Uuid::parse_str(&raw)
            .map(ResourceId)
            .map_err(|_| AppError::Service(ServiceError::NotFound))
    }
}
