use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::patch,
    Router,
};
use tracing::error;
use uuid::Uuid;

use crate::{error::AppError, state::AppState, store::ConfirmOutcome};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/participants/:participant_id/confirm",
        patch(confirm_participant),
    )
}

/// Guarded false→true transition. The lookup gives precise error attribution
/// (not found vs already confirmed); the store's conditional update closes
/// the window between the two calls.
async fn confirm_participant(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = Uuid::parse_str(&participant_id)
        .map_err(|_| AppError::InvalidInput("Invalid UUID.".into()))?;

    let participant = match state.store.get_participant(id).await {
        Ok(Some(participant)) => participant,
        Ok(None) => return Err(AppError::ParticipantNotFound),
        Err(err) => {
            error!(participant_id = %id, error = %err, "failed to get participant during confirmation");
            return Err(AppError::Internal);
        }
    };

    if participant.is_confirmed {
        return Err(AppError::AlreadyConfirmed);
    }

    match state.store.confirm_participant(id).await {
        Ok(ConfirmOutcome::Confirmed) => Ok(StatusCode::NO_CONTENT),
        Ok(ConfirmOutcome::AlreadyConfirmed) => Err(AppError::AlreadyConfirmed),
        Err(err) => {
            error!(participant_id = %id, error = %err, "failed to confirm participant");
            Err(AppError::Internal)
        }
    }
}
