use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Participant not found.")]
    ParticipantNotFound,
    #[error("User is already confirmed.")]
    AlreadyConfirmed,
    #[error("Failed to create trip. Try again later.")]
    TripCreation,
    #[error("Something went wrong. Try again.")]
    Internal,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
    #[error("not implemented")]
    NotImplemented,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::ParticipantNotFound
            | AppError::AlreadyConfirmed
            | AppError::TripCreation
            | AppError::Internal => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NotImplemented => {
                (StatusCode::NOT_IMPLEMENTED, "Not implemented.".to_string())
            }
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Database(_)
            | AppError::Other(_) => {
                error!("internal error: {self:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Try again.".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}
