// Error kinds shared by the stores, the service layer and the API
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<reqwest::Error> for SchedulerError {
    fn from(err: reqwest::Error) -> Self {
        SchedulerError::Transport(err.to_string())
    }
}

impl IntoResponse for SchedulerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            SchedulerError::InvalidModel(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            SchedulerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            SchedulerError::Duplicate(msg) => (StatusCode::CONFLICT, msg.clone()),
            SchedulerError::Transport(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            SchedulerError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            SchedulerError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
