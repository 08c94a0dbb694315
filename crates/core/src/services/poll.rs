//! Poll service.
//!
//! A poll hangs off one event and carries an ordered option set. Selections
//! go through the toggle ledger; single-choice polls clear the voter's other
//! selections in the same transaction before recording a new one.

use std::sync::Arc;

use eventhub_common::{AppError, AppResult, IdGenerator};
use eventhub_db::{
    entities::{
        poll::{self, PollKind},
        poll_option,
    },
    map_db_err,
    repositories::{
        EventRepository, PollOptionVotes, PollRepository, UserRepository, counts::count_of,
        vote_ledger,
    },
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::parse_wire_enum;

/// Input for creating a poll.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollInput {
    #[validate(length(min = 1, max = 1024))]
    pub question: String,

    /// `single` or `multiple`.
    #[serde(rename = "type")]
    pub kind: String,

    #[validate(length(min = 2, message = "at least 2 options are required"))]
    pub options: Vec<String>,
}

/// Input for voting in a poll.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PollVoteInput {
    #[validate(length(min = 1))]
    pub user_id: String,

    #[validate(length(min = 1))]
    pub option_id: String,
}

/// One option with its current vote total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCount {
    pub id: String,
    pub text: String,
    pub vote_count: u64,
}

/// A poll with its options and counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetail {
    pub id: String,
    pub event_id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub kind: PollKind,
    pub options: Vec<OptionCount>,
    /// The viewer's selections, when a viewer was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_votes: Option<Vec<String>>,
}

/// Poll state after a vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollVoteResult {
    pub options: Vec<OptionCount>,
    pub user_votes: Vec<String>,
}

/// Options of a poll paired with their vote totals, in supplied order.
pub(crate) async fn option_counts<C: ConnectionTrait>(
    conn: &C,
    poll_repo: &PollRepository,
    poll_id: &str,
) -> AppResult<Vec<OptionCount>> {
    let options = poll_repo.find_options(conn, poll_id).await?;
    let ids: Vec<String> = options.iter().map(|o| o.id.clone()).collect();
    let counts = poll_repo.vote_counts(conn, poll_id, &ids).await?;

    Ok(options
        .into_iter()
        .map(|o| OptionCount {
            vote_count: count_of(&counts, &o.id),
            id: o.id,
            text: o.text,
        })
        .collect())
}

/// Load a poll's detail view.
pub(crate) async fn load_detail<C: ConnectionTrait>(
    conn: &C,
    poll_repo: &PollRepository,
    poll: poll::Model,
    viewer: Option<&str>,
) -> AppResult<PollDetail> {
    let options = option_counts(conn, poll_repo, &poll.id).await?;
    let user_votes = match viewer {
        Some(user_id) => Some(poll_repo.user_selections(conn, &poll.id, user_id).await?),
        None => None,
    };

    Ok(PollDetail {
        id: poll.id,
        event_id: poll.event_id,
        question: poll.question,
        kind: poll.kind,
        options,
        user_votes,
    })
}

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    db: Arc<DatabaseConnection>,
    poll_repo: PollRepository,
    event_repo: EventRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            poll_repo: PollRepository::new(),
            event_repo: EventRepository::new(),
            user_repo: UserRepository::new(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Attach a poll to an event. An event holds at most one poll.
    pub async fn create_poll(
        &self,
        event_id: &str,
        input: CreatePollInput,
    ) -> AppResult<PollDetail> {
        input.validate()?;

        let question = input.question.trim();
        if question.is_empty() {
            return Err(AppError::Validation("question cannot be blank".to_string()));
        }
        let kind: PollKind = parse_wire_enum("type", &input.kind)?;
        let options: Vec<&str> = input.options.iter().map(|o| o.trim()).collect();
        if options.iter().any(|o| o.is_empty()) {
            return Err(AppError::Validation("poll options cannot be blank".to_string()));
        }

        let txn = self.db.begin().await.map_err(map_db_err)?;

        self.event_repo.get_by_id(&txn, event_id).await?;
        if self
            .poll_repo
            .find_by_event_id(&txn, event_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Event {event_id} already has a poll"
            )));
        }

        let poll = self
            .poll_repo
            .create(
                &txn,
                poll::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    event_id: Set(event_id.to_string()),
                    question: Set(question.to_string()),
                    kind: Set(kind),
                },
            )
            .await?;

        let rows: Vec<poll_option::Model> = options
            .iter()
            .zip(0..)
            .map(|(text, position)| poll_option::Model {
                id: self.id_gen.generate(),
                poll_id: poll.id.clone(),
                text: (*text).to_string(),
                position,
            })
            .collect();
        self.poll_repo
            .create_options(
                &txn,
                rows.iter()
                    .map(|o| poll_option::ActiveModel {
                        id: Set(o.id.clone()),
                        poll_id: Set(o.poll_id.clone()),
                        text: Set(o.text.clone()),
                        position: Set(o.position),
                    })
                    .collect(),
            )
            .await?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(
            poll_id = %poll.id,
            event_id = %event_id,
            options = rows.len(),
            "Created poll"
        );

        Ok(PollDetail {
            id: poll.id,
            event_id: poll.event_id,
            question: poll.question,
            kind: poll.kind,
            options: rows
                .into_iter()
                .map(|o| OptionCount {
                    id: o.id,
                    text: o.text,
                    vote_count: 0,
                })
                .collect(),
            user_votes: None,
        })
    }

    /// Get a poll with counts, plus the viewer's selections when given.
    pub async fn get_poll(&self, poll_id: &str, viewer: Option<&str>) -> AppResult<PollDetail> {
        let poll = self.poll_repo.get_by_id(self.db.as_ref(), poll_id).await?;
        load_detail(self.db.as_ref(), &self.poll_repo, poll, viewer).await
    }

    /// Toggle the voter's selection of an option.
    ///
    /// Selecting an already selected option deselects it. Otherwise, on a
    /// single-choice poll the voter's other selections are dropped before the
    /// new one is recorded, so at most one survives.
    pub async fn vote(&self, poll_id: &str, input: PollVoteInput) -> AppResult<PollVoteResult> {
        input.validate()?;

        let txn = self.db.begin().await.map_err(map_db_err)?;

        // Row lock serializes concurrent votes on the same poll.
        let poll = self.poll_repo.get_for_update(&txn, poll_id).await?;
        self.poll_repo
            .get_option(&txn, poll_id, &input.option_id)
            .await?;
        self.user_repo.get_by_id(&txn, &input.user_id).await?;

        let ledger = PollOptionVotes::new(poll_id);

        if poll.kind == PollKind::Single
            && !vote_ledger::has_voted(&ledger, &txn, &input.option_id, &input.user_id).await?
        {
            vote_ledger::retract_all(&ledger, &txn, &input.user_id).await?;
        }

        let toggled = vote_ledger::toggle(
            &ledger,
            &txn,
            &self.id_gen,
            &input.option_id,
            &input.user_id,
        )
        .await?;

        let options = option_counts(&txn, &self.poll_repo, poll_id).await?;
        let user_votes = self
            .poll_repo
            .user_selections(&txn, poll_id, &input.user_id)
            .await?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::debug!(
            poll_id = %poll_id,
            option_id = %input.option_id,
            voted = toggled.voted,
            "Poll vote toggled"
        );

        Ok(PollVoteResult {
            options,
            user_votes,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use eventhub_db::entities::{
        event::{self, EventCategory, EventKind, EventStatus},
        user,
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    fn test_event() -> event::Model {
        event::Model {
            id: "event1".to_string(),
            title: "Friday film".to_string(),
            description: None,
            kind: EventKind::Poll,
            status: EventStatus::Open,
            category: EventCategory::Cinema,
            creator_id: "user1".to_string(),
            created_at: Utc::now().into(),
            finalized_at: None,
            final_date: None,
            final_location: None,
            final_details: None,
        }
    }

    fn test_poll(kind: PollKind) -> poll::Model {
        poll::Model {
            id: "poll1".to_string(),
            event_id: "event1".to_string(),
            question: "Which film?".to_string(),
            kind,
        }
    }

    fn test_option(id: &str, position: i32) -> poll_option::Model {
        poll_option::Model {
            id: id.to_string(),
            poll_id: "poll1".to_string(),
            text: id.to_uppercase(),
            position,
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

    fn num_items(n: i64) -> BTreeMap<&'static str, Value> {
        maplit::btreemap! { "num_items" => Value::BigInt(Some(n)) }
    }

    fn key_count(key: &str, n: i64) -> BTreeMap<&'static str, Value> {
        maplit::btreemap! { "key" => Value::from(key), "count" => Value::BigInt(Some(n)) }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    /// Executed SQL, one entry per statement, with quotes unescaped.
    fn statements(db: Arc<DatabaseConnection>) -> Vec<String> {
        let log = format!("{:?}", Arc::try_unwrap(db).ok().unwrap().into_transaction_log())
            .replace("\\\"", "\"");
        log.split("Statement {").skip(1).map(str::to_string).collect()
    }

    fn vote_input(option_id: &str) -> PollVoteInput {
        PollVoteInput {
            user_id: "m1".to_string(),
            option_id: option_id.to_string(),
        }
    }

    fn create_input(options: &[&str]) -> CreatePollInput {
        CreatePollInput {
            question: "Which film?".to_string(),
            kind: "single".to_string(),
            options: options.iter().map(ToString::to_string).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_poll_requires_two_options() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = PollService::new(db);

        let result = service.create_poll("event1", create_input(&["A"])).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_poll_rejects_unknown_kind() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = PollService::new(db);

        let mut input = create_input(&["A", "B"]);
        input.kind = "ranked".to_string();
        let result = service.create_poll("event1", input).await;

        assert!(
            matches!(result, Err(AppError::Validation(msg)) if msg.contains("single, multiple"))
        );
    }

    #[tokio::test]
    async fn test_create_poll_rejects_blank_option() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = PollService::new(db);

        let result = service.create_poll("event1", create_input(&["A", "  "])).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_poll_unknown_event() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<event::Model>::new()])
                .into_connection(),
        );
        let service = PollService::new(db);

        let result = service.create_poll("ghost", create_input(&["A", "B"])).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_second_poll_is_conflict() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_event()]])
                .append_query_results([[test_poll(PollKind::Single)]])
                .into_connection(),
        );
        let service = PollService::new(db);

        let result = service.create_poll("event1", create_input(&["A", "B"])).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_poll_returns_zero_counts_in_order() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_event()]])
                .append_query_results([Vec::<poll::Model>::new()])
                .append_query_results([[test_poll(PollKind::Single)]])
                .append_exec_results([exec(2)])
                .into_connection(),
        );
        let service = PollService::new(db);

        let detail = service
            .create_poll("event1", create_input(&[" A ", "B"]))
            .await
            .unwrap();

        let texts: Vec<&str> = detail.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, ["A", "B"]);
        assert!(detail.options.iter().all(|o| o.vote_count == 0));
        assert_eq!(detail.kind, PollKind::Single);
    }

    #[tokio::test]
    async fn test_vote_option_from_other_poll_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_poll(PollKind::Single)]])
                .append_query_results([Vec::<poll_option::Model>::new()])
                .into_connection(),
        );
        let service = PollService::new(db);

        let result = service.vote("poll1", vote_input("foreign")).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_single_choice_vote_replaces_previous_selection() {
        // m1 holds a vote on "a" and now picks "b".
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_poll(PollKind::Single)]])
                .append_query_results([[test_option("b", 1)]])
                .append_query_results([[test_user()]])
                // has_voted(b) -> no
                .append_query_results([[num_items(0)]])
                // retract_all removes "a"; toggle finds nothing to delete, then inserts
                .append_exec_results([exec(1), exec(0), exec(1)])
                // toggle's recount of "b"
                .append_query_results([[num_items(1)]])
                .append_query_results([[test_option("a", 0), test_option("b", 1)]])
                .append_query_results([[key_count("b", 1)]])
                .append_query_results([[maplit::btreemap! { "option_id" => Value::from("b") }]])
                .into_connection(),
        );
        let service = PollService::new(db.clone());

        let result = service.vote("poll1", vote_input("b")).await.unwrap();

        let counts: Vec<(&str, u64)> = result
            .options
            .iter()
            .map(|o| (o.id.as_str(), o.vote_count))
            .collect();
        assert_eq!(counts, [("a", 0), ("b", 1)]);
        assert_eq!(result.user_votes, ["b"]);

        // The member's whole selection in this poll is cleared before the insert.
        drop(service);
        let sql = statements(db);
        let retract = sql
            .iter()
            .position(|s| {
                s.contains(r#"DELETE FROM "poll_vote""#)
                    && s.contains(r#""poll_id""#)
                    && s.contains(r#""user_id""#)
                    && !s.contains(r#""option_id""#)
            })
            .unwrap();
        let insert = sql
            .iter()
            .position(|s| s.contains(r#"INSERT INTO "poll_vote""#))
            .unwrap();
        assert!(retract < insert);
    }

    #[tokio::test]
    async fn test_vote_same_option_again_deselects() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_poll(PollKind::Single)]])
                .append_query_results([[test_option("b", 1)]])
                .append_query_results([[test_user()]])
                // has_voted(b) -> yes, so nothing is retracted
                .append_query_results([[num_items(1)]])
                // toggle deletes the existing row
                .append_exec_results([exec(1)])
                .append_query_results([[num_items(0)]])
                .append_query_results([[test_option("a", 0), test_option("b", 1)]])
                .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
                .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
                .into_connection(),
        );
        let service = PollService::new(db);

        let result = service.vote("poll1", vote_input("b")).await.unwrap();

        assert!(result.options.iter().all(|o| o.vote_count == 0));
        assert!(result.user_votes.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_choice_vote_keeps_other_selections() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_poll(PollKind::Multiple)]])
                .append_query_results([[test_option("b", 1)]])
                .append_query_results([[test_user()]])
                // no has_voted / retract for multiple-choice: straight to toggle
                .append_exec_results([exec(0), exec(1)])
                .append_query_results([[num_items(1)]])
                .append_query_results([[test_option("a", 0), test_option("b", 1)]])
                .append_query_results([[key_count("a", 1), key_count("b", 1)]])
                .append_query_results([[
                    maplit::btreemap! { "option_id" => Value::from("a") },
                    maplit::btreemap! { "option_id" => Value::from("b") },
                ]])
                .into_connection(),
        );
        let service = PollService::new(db);

        let result = service.vote("poll1", vote_input("b")).await.unwrap();

        assert_eq!(result.user_votes, ["a", "b"]);
        assert!(result.options.iter().all(|o| o.vote_count == 1));
    }

    #[test]
    fn test_poll_detail_serializes_kind_as_type() {
        let detail = PollDetail {
            id: "poll1".to_string(),
            event_id: "event1".to_string(),
            question: "Which film?".to_string(),
            kind: PollKind::Multiple,
            options: vec![],
            user_votes: None,
        };
        let json = serde_json::to_value(&detail).unwrap();

        assert_eq!(json["type"], "multiple");
        assert!(json.get("userVotes").is_none());
    }
}
