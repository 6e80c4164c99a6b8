use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db::DbPool,
    models::{participant::Participant, trip::Trip},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] sqlx::Error),
    #[error("failed to insert trip: {0}")]
    InsertTrip(#[source] sqlx::Error),
    #[error("failed to insert participants: {0}")]
    InsertParticipants(#[source] sqlx::Error),
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] sqlx::Error),
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewTrip {
    pub destination: String,
    pub owner_name: String,
    pub owner_email: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub emails_to_invite: Vec<String>,
}

/// Outcome of the guarded confirmation update. `AlreadyConfirmed` covers both
/// a participant that was confirmed before the call and one confirmed by a
/// concurrent request between lookup and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    AlreadyConfirmed,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_trip(&self, trip: NewTrip) -> Result<Uuid, StoreError>;
    async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>, StoreError>;
    async fn get_participant(
        &self,
        participant_id: Uuid,
    ) -> Result<Option<Participant>, StoreError>;
    async fn confirm_participant(&self, participant_id: Uuid)
        -> Result<ConfirmOutcome, StoreError>;
}

/// The only component that writes to the database.
#[derive(Clone)]
pub struct SqlStore {
    pool: DbPool,
}

impl SqlStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for SqlStore {
    /// Inserts the trip and its invited participants in one transaction.
    /// Any failure after `begin` drops the transaction, rolling back every
    /// row written so far.
    async fn create_trip(&self, trip: NewTrip) -> Result<Uuid, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::Begin)?;

        let trip_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO trips (id, destination, owner_name, owner_email, starts_at, ends_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(trip_id.to_string())
        .bind(&trip.destination)
        .bind(&trip.owner_name)
        .bind(&trip.owner_email)
        .bind(trip.starts_at)
        .bind(trip.ends_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::InsertTrip)?;

        for email in &trip.emails_to_invite {
            sqlx::query(
                "INSERT INTO participants (id, trip_id, email, is_confirmed) VALUES (?, ?, ?, 0)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(trip_id.to_string())
            .bind(email)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::InsertParticipants)?;
        }

        tx.commit().await.map_err(StoreError::Commit)?;

        Ok(trip_id)
    }

    async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>, StoreError> {
        let trip = sqlx::query_as::<_, Trip>(
            "SELECT id, destination, owner_name, owner_email, starts_at, ends_at \
             FROM trips WHERE id = ?",
        )
        .bind(trip_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(trip)
    }

    async fn get_participant(
        &self,
        participant_id: Uuid,
    ) -> Result<Option<Participant>, StoreError> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT id, trip_id, email, is_confirmed FROM participants WHERE id = ?",
        )
        .bind(participant_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(participant)
    }

    /// Conditional update: the WHERE clause only matches an unconfirmed row,
    /// so concurrent confirmations serialize on the storage engine and the
    /// loser sees zero rows affected.
    async fn confirm_participant(
        &self,
        participant_id: Uuid,
    ) -> Result<ConfirmOutcome, StoreError> {
        let result =
            sqlx::query("UPDATE participants SET is_confirmed = 1 WHERE id = ? AND is_confirmed = 0")
                .bind(participant_id.to_string())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            Ok(ConfirmOutcome::AlreadyConfirmed)
        } else {
            Ok(ConfirmOutcome::Confirmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqlStore {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("connect to in-memory database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("run migrations");
        SqlStore::new(pool)
    }

    fn new_trip(invitees: &[&str]) -> NewTrip {
        let starts_at = Utc::now();
        NewTrip {
            destination: "Paris".into(),
            owner_name: "Ana".into(),
            owner_email: "ana@x.com".into(),
            starts_at,
            ends_at: starts_at + Duration::days(7),
            emails_to_invite: invitees.iter().map(|email| email.to_string()).collect(),
        }
    }

    async fn invited_participant_id(store: &SqlStore, trip_id: Uuid, email: &str) -> Uuid {
        let id: String =
            sqlx::query_scalar("SELECT id FROM participants WHERE trip_id = ? AND email = ?")
                .bind(trip_id.to_string())
                .bind(email)
                .fetch_one(&store.pool)
                .await
                .expect("participant row");
        Uuid::parse_str(&id).expect("stored participant id is a uuid")
    }

    #[tokio::test]
    async fn create_trip_persists_trip_and_participants() {
        let store = store().await;

        let trip_id = store
            .create_trip(new_trip(&["bob@x.com", "carol@x.com"]))
            .await
            .expect("create trip");

        let trip = store
            .get_trip(trip_id)
            .await
            .expect("get trip")
            .expect("trip row exists");
        assert_eq!(trip.destination, "Paris");
        assert_eq!(trip.owner_email, "ana@x.com");

        let unconfirmed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM participants WHERE trip_id = ? AND is_confirmed = 0",
        )
        .bind(trip_id.to_string())
        .fetch_one(&store.pool)
        .await
        .expect("count participants");
        assert_eq!(unconfirmed, 2);
    }

    #[tokio::test]
    async fn failed_participant_insert_rolls_back_the_trip() {
        let store = store().await;

        // The duplicate invitee violates UNIQUE(trip_id, email) after the
        // trip row is already written inside the transaction.
        let err = store
            .create_trip(new_trip(&["bob@x.com", "bob@x.com"]))
            .await
            .expect_err("duplicate invitee must fail");
        assert!(matches!(err, StoreError::InsertParticipants(_)));

        let trips: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trips")
            .fetch_one(&store.pool)
            .await
            .expect("count trips");
        assert_eq!(trips, 0);

        let participants: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants")
            .fetch_one(&store.pool)
            .await
            .expect("count participants");
        assert_eq!(participants, 0);
    }

    #[tokio::test]
    async fn confirm_participant_transitions_exactly_once() {
        let store = store().await;
        let trip_id = store
            .create_trip(new_trip(&["bob@x.com"]))
            .await
            .expect("create trip");
        let participant_id = invited_participant_id(&store, trip_id, "bob@x.com").await;

        let first = store
            .confirm_participant(participant_id)
            .await
            .expect("first confirm");
        assert_eq!(first, ConfirmOutcome::Confirmed);

        let participant = store
            .get_participant(participant_id)
            .await
            .expect("get participant")
            .expect("participant row exists");
        assert!(participant.is_confirmed);

        let second = store
            .confirm_participant(participant_id)
            .await
            .expect("second confirm");
        assert_eq!(second, ConfirmOutcome::AlreadyConfirmed);
    }

    #[tokio::test]
    async fn get_participant_returns_none_for_unknown_id() {
        let store = store().await;
        let missing = store
            .get_participant(Uuid::new_v4())
            .await
            .expect("lookup succeeds");
        assert!(missing.is_none());
    }
}
