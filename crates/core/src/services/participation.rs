//! Participation service.
//!
//! Each (event, member) pair is in one of four states: no row, `going`,
//! `maybe` or `notGoing`. Restating the current status clears it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use eventhub_common::{AppResult, IdGenerator};
use eventhub_db::{
    entities::participation::{self, ParticipationStatus},
    map_db_err,
    repositories::{EventRepository, ParticipationRepository, UserRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::parse_wire_enum;

/// Input for stating attendance intent.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetParticipationInput {
    #[validate(length(min = 1))]
    pub user_id: String,

    /// `going`, `maybe` or `notGoing`.
    pub status: String,
}

/// Number of members per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationCounts {
    pub going: u64,
    pub maybe: u64,
    pub not_going: u64,
}

impl From<HashMap<ParticipationStatus, u64>> for ParticipationCounts {
    fn from(counts: HashMap<ParticipationStatus, u64>) -> Self {
        let get = |status| counts.get(&status).copied().unwrap_or(0);
        Self {
            going: get(ParticipationStatus::Going),
            maybe: get(ParticipationStatus::Maybe),
            not_going: get(ParticipationStatus::NotGoing),
        }
    }
}

/// The member's state after a transition, with the event's tallies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationOutcome {
    pub participating: bool,
    pub status: Option<ParticipationStatus>,
    pub counts: ParticipationCounts,
}

/// Participation service for business logic.
#[derive(Clone)]
pub struct ParticipationService {
    db: Arc<DatabaseConnection>,
    participation_repo: ParticipationRepository,
    event_repo: EventRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl ParticipationService {
    /// Create a new participation service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            participation_repo: ParticipationRepository::new(),
            event_repo: EventRepository::new(),
            user_repo: UserRepository::new(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Apply a status to the member's participation in an event.
    ///
    /// No row: insert. Same status: delete. Different status: update in place.
    pub async fn set_status(
        &self,
        event_id: &str,
        input: SetParticipationInput,
    ) -> AppResult<ParticipationOutcome> {
        input.validate()?;
        let status: ParticipationStatus = parse_wire_enum("status", &input.status)?;

        let txn = self.db.begin().await.map_err(map_db_err)?;

        self.event_repo.get_by_id(&txn, event_id).await?;
        self.user_repo.get_by_id(&txn, &input.user_id).await?;

        let existing = self
            .participation_repo
            .find(&txn, event_id, &input.user_id)
            .await?;

        let state = match existing {
            None => {
                self.participation_repo
                    .create(
                        &txn,
                        participation::ActiveModel {
                            id: Set(self.id_gen.generate()),
                            event_id: Set(event_id.to_string()),
                            user_id: Set(input.user_id.clone()),
                            status: Set(status),
                            created_at: Set(Utc::now().into()),
                        },
                    )
                    .await?;
                Some(status)
            }
            Some(row) if row.status == status => {
                self.participation_repo.delete(&txn, &row.id).await?;
                None
            }
            Some(row) => {
                let mut active: participation::ActiveModel = row.into();
                active.status = Set(status);
                self.participation_repo.update(&txn, active).await?;
                Some(status)
            }
        };

        let counts = self
            .participation_repo
            .status_counts(&txn, event_id)
            .await?
            .into();

        txn.commit().await.map_err(map_db_err)?;

        tracing::debug!(
            event_id = %event_id,
            user_id = %input.user_id,
            status = ?state,
            "Participation updated"
        );

        Ok(ParticipationOutcome {
            participating: state.is_some(),
            status: state,
            counts,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use eventhub_common::AppError;
    use eventhub_db::entities::{
        event::{self, EventCategory, EventKind, EventStatus},
        user,
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    fn test_event() -> event::Model {
        event::Model {
            id: "event1".to_string(),
            title: "Five-a-side".to_string(),
            description: None,
            kind: EventKind::Announcement,
            status: EventStatus::Open,
            category: EventCategory::Sports,
            creator_id: "m1".to_string(),
            created_at: Utc::now().into(),
            finalized_at: None,
            final_date: None,
            final_location: None,
            final_details: None,
        }
    }

    fn test_user() -> user::Model {
        user::Model {
            id: "m1".to_string(),
            name: "Member".to_string(),
            email: "m1@example.com".to_string(),
            avatar_url: None,
            created_at: Utc::now().into(),
        }
    }

    fn test_participation(status: ParticipationStatus) -> participation::Model {
        participation::Model {
            id: "p1".to_string(),
            event_id: "event1".to_string(),
            user_id: "m1".to_string(),
            status,
            created_at: Utc::now().into(),
        }
    }

    fn key_count(key: &str, n: i64) -> BTreeMap<&'static str, Value> {
        maplit::btreemap! { "key" => Value::from(key), "count" => Value::BigInt(Some(n)) }
    }

    fn input(status: &str) -> SetParticipationInput {
        SetParticipationInput {
            user_id: "m1".to_string(),
            status: status.to_string(),
        }
    }

    #[tokio::test]
    async fn test_invalid_status_is_rejected_before_any_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = ParticipationService::new(db);

        let result = service.set_status("event1", input("attending")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_event() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<event::Model>::new()])
                .into_connection(),
        );
        let service = ParticipationService::new(db);

        let result = service.set_status("ghost", input("going")).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_first_status_inserts() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_event()]])
                .append_query_results([[test_user()]])
                .append_query_results([Vec::<participation::Model>::new()])
                .append_query_results([[test_participation(ParticipationStatus::Going)]])
                .append_query_results([[key_count("going", 1)]])
                .into_connection(),
        );
        let service = ParticipationService::new(db);

        let outcome = service.set_status("event1", input("going")).await.unwrap();

        assert!(outcome.participating);
        assert_eq!(outcome.status, Some(ParticipationStatus::Going));
        assert_eq!(
            outcome.counts,
            ParticipationCounts {
                going: 1,
                maybe: 0,
                not_going: 0
            }
        );
    }

    #[tokio::test]
    async fn test_same_status_clears_and_still_reports_counts() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_event()]])
                .append_query_results([[test_user()]])
                .append_query_results([[test_participation(ParticipationStatus::Going)]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[key_count("maybe", 2)]])
                .into_connection(),
        );
        let service = ParticipationService::new(db);

        let outcome = service.set_status("event1", input("going")).await.unwrap();

        assert!(!outcome.participating);
        assert_eq!(outcome.status, None);
        assert_eq!(outcome.counts.going, 0);
        assert_eq!(outcome.counts.maybe, 2);
    }

    #[tokio::test]
    async fn test_different_status_updates_in_place() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_event()]])
                .append_query_results([[test_user()]])
                .append_query_results([[test_participation(ParticipationStatus::Going)]])
                .append_query_results([[test_participation(ParticipationStatus::Maybe)]])
                .append_query_results([[key_count("maybe", 1)]])
                .into_connection(),
        );
        let service = ParticipationService::new(db.clone());

        let outcome = service.set_status("event1", input("maybe")).await.unwrap();

        assert_eq!(outcome.status, Some(ParticipationStatus::Maybe));
        assert_eq!(outcome.counts.maybe, 1);
        assert_eq!(outcome.counts.going, 0);

        // An UPDATE, never a second INSERT.
        drop(service);
        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        let sql = format!("{log:?}").replace("\\\"", "\"");
        assert!(sql.contains(r#"UPDATE "participation" SET"#));
        assert!(!sql.contains(r#"INSERT INTO "participation""#));
    }

    #[test]
    fn test_counts_serialize_not_going_in_camel_case() {
        let json = serde_json::to_value(ParticipationCounts::default()).unwrap();
        assert_eq!(json, serde_json::json!({"going": 0, "maybe": 0, "notGoing": 0}));
    }
}
