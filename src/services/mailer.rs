use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    models::trip::Trip,
    store::{Store, StoreError},
};

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("trip {0} not found")]
    TripNotFound(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("failed to deliver message: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Sends the post-creation confirmation prompt to the trip owner. Callers
/// only log a failure; it never affects trip or participant state.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_trip_confirmation(&self, trip_id: Uuid) -> Result<(), MailerError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    store: Arc<dyn Store>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &AppConfig, store: Arc<dyn Store>) -> Self {
        // Plain transport: the default target is a local mailpit instance.
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            .port(config.smtp_port)
            .build();
        Self {
            store,
            transport,
            from: config.smtp_from.clone(),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_trip_confirmation(&self, trip_id: Uuid) -> Result<(), MailerError> {
        let trip = self
            .store
            .get_trip(trip_id)
            .await?
            .ok_or(MailerError::TripNotFound(trip_id))?;

        let message = Message::builder()
            .from(self.from.parse()?)
            .to(trip.owner_email.parse()?)
            .subject("Confirm Your Trip")
            .header(ContentType::TEXT_HTML)
            .body(confirmation_body(&trip))?;

        self.transport.send(message).await?;

        Ok(())
    }
}

fn confirmation_body(trip: &Trip) -> String {
    format!(
        "<h2>Hello, {},</h2>\n\
         <p>Your trip to {} on {} must be confirmed.</p>\n\
         <a href=\"#\">Confirm Trip</a>",
        trip.owner_name,
        trip.destination,
        trip.starts_at.format("%Y-%m-%d"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn confirmation_body_names_owner_destination_and_start_date() {
        let starts_at = Utc.with_ymd_and_hms(2024, 7, 15, 9, 0, 0).single().unwrap();
        let trip = Trip {
            id: Uuid::new_v4().to_string(),
            destination: "Paris".into(),
            owner_name: "Ana".into(),
            owner_email: "ana@x.com".into(),
            starts_at,
            ends_at: starts_at,
        };

        let body = confirmation_body(&trip);
        assert!(body.contains("Hello, Ana"));
        assert!(body.contains("trip to Paris"));
        assert!(body.contains("2024-07-15"));
    }
}
