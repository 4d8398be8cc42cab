use axum::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::SchedulerError;

/// Caller's project identity, taken from the X-Project-ID header. Every
/// scoped endpoint requires it; a missing or malformed header is an
/// invalid request, reported through the shared error type.
pub struct ProjectId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ProjectId
where
    S: Send + Sync,
{
    type Rejection = SchedulerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("X-Project-ID")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                SchedulerError::InvalidModel("Missing X-Project-ID header".to_string())
            })?;

        let project_id = Uuid::parse_str(header).map_err(|_| {
            SchedulerError::InvalidModel(format!("Malformed X-Project-ID header '{}'", header))
        })?;

        Ok(ProjectId(project_id))
    }
}

/// Standard error response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// HTTP status code
    pub status: u16,
}
