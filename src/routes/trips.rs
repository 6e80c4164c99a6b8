use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use lettre::Address;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::{error::AppError, state::AppState, store::NewTrip};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", post(create_trip))
        .route("/trips/:trip_id", get(trip_details).put(update_trip))
        .route(
            "/trips/:trip_id/activities",
            get(list_activities).post(create_activity),
        )
        .route("/trips/:trip_id/confirm", get(confirm_trip))
        .route("/trips/:trip_id/invites", post(create_invite))
        .route("/trips/:trip_id/links", get(list_links).post(create_link))
        .route("/trips/:trip_id/participants", get(list_participants))
}

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub destination: String,
    pub owner_name: String,
    pub owner_email: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub emails_to_invite: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTripResponse {
    #[serde(rename = "tripId")]
    pub trip_id: Uuid,
}

async fn create_trip(
    State(state): State<AppState>,
    payload: Result<Json<CreateTripRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateTripResponse>), AppError> {
    let Json(body) = payload.map_err(|_| AppError::InvalidInput("Invalid JSON.".into()))?;
    validate_create_trip(&body)?;

    let trip_id = match state.store.create_trip(body.into()).await {
        Ok(trip_id) => trip_id,
        Err(err) => {
            error!(error = %err, "failed to create trip");
            return Err(AppError::TripCreation);
        }
    };

    // Fire-and-forget: the confirmation email is dispatched outside the
    // request's cancellation scope and never blocks the response.
    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(err) = mailer.send_trip_confirmation(trip_id).await {
            error!(trip_id = %trip_id, error = %err, "failed to submit email to trip owner");
        }
    });

    Ok((StatusCode::CREATED, Json(CreateTripResponse { trip_id })))
}

fn validate_create_trip(body: &CreateTripRequest) -> Result<(), AppError> {
    let mut problems = Vec::new();

    if body.destination.trim().is_empty() {
        problems.push("destination must not be empty");
    }
    if body.owner_name.trim().is_empty() {
        problems.push("owner_name must not be empty");
    }
    if body.owner_email.parse::<Address>().is_err() {
        problems.push("owner_email is not a valid email address");
    }
    if body
        .emails_to_invite
        .iter()
        .any(|email| email.parse::<Address>().is_err())
    {
        problems.push("emails_to_invite contains an invalid email address");
    }
    if body.ends_at < body.starts_at {
        problems.push("ends_at must not be before starts_at");
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Invalid fields: {}",
            problems.join(", ")
        )))
    }
}

impl From<CreateTripRequest> for NewTrip {
    fn from(body: CreateTripRequest) -> Self {
        Self {
            destination: body.destination,
            owner_name: body.owner_name,
            owner_email: body.owner_email,
            starts_at: body.starts_at,
            ends_at: body.ends_at,
            emails_to_invite: body.emails_to_invite,
        }
    }
}

async fn trip_details(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

async fn update_trip(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

async fn list_activities(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

async fn create_activity(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

async fn confirm_trip(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

async fn create_invite(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

async fn list_links(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

async fn create_link(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

async fn list_participants(Path(_trip_id): Path<String>) -> Result<StatusCode, AppError> {
    Err(AppError::NotImplemented)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn valid_request() -> CreateTripRequest {
        let starts_at = Utc::now();
        CreateTripRequest {
            destination: "Paris".into(),
            owner_name: "Ana".into(),
            owner_email: "ana@x.com".into(),
            starts_at,
            ends_at: starts_at + Duration::days(3),
            emails_to_invite: vec!["bob@x.com".into()],
        }
    }

    #[test]
    fn accepts_a_well_formed_request() {
        assert!(validate_create_trip(&valid_request()).is_ok());
    }

    #[test]
    fn rejects_empty_destination() {
        let mut body = valid_request();
        body.destination = "  ".into();
        assert!(validate_create_trip(&body).is_err());
    }

    #[test]
    fn rejects_malformed_owner_email() {
        let mut body = valid_request();
        body.owner_email = "not-an-email".into();
        let err = validate_create_trip(&body).expect_err("must reject");
        assert!(err.to_string().starts_with("Invalid fields:"));
    }

    #[test]
    fn rejects_end_before_start() {
        let mut body = valid_request();
        body.ends_at = body.starts_at - Duration::days(1);
        assert!(validate_create_trip(&body).is_err());
    }

    #[test]
    fn rejects_malformed_invitee_email() {
        let mut body = valid_request();
        body.emails_to_invite.push("nope".into());
        assert!(validate_create_trip(&body).is_err());
    }
}
