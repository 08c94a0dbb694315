//! Toggle-vote ledger.
//!
//! A vote table holds at most one row per (subject, voter); the row's
//! existence means "voted". Event upvotes, comment upvotes and poll option
//! selections are all ledgers, described by a [`VoteLedger`] and driven by the
//! generic functions in this module.
//!
//! Every function takes the connection explicitly so it runs inside the
//! caller's transaction. The unique index on each table backs the engine:
//! two racing inserts for the same pair cannot both commit.

use std::collections::HashMap;

use chrono::Utc;
use eventhub_common::{AppResult, IdGenerator};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    IntoActiveModel, PaginatorTrait, QueryFilter, QuerySelect, Set,
};

use super::counts::grouped_counts;
use crate::entities::{CommentVote, EventVote, PollVote, comment_vote, event_vote, poll_vote};
use crate::map_db_err;

/// State after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggled {
    /// Whether the voter holds a vote on the subject after the call.
    pub voted: bool,
    /// Total votes on the subject after the call.
    pub count: u64,
}

/// Describes one vote table.
pub trait VoteLedger: Send + Sync {
    /// Table entity.
    type Entity: EntityTrait;
    /// Insertable row.
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + Send;

    /// Column holding the subject id.
    fn subject_column(&self) -> <Self::Entity as EntityTrait>::Column;

    /// Column holding the voter id.
    fn voter_column(&self) -> <Self::Entity as EntityTrait>::Column;

    /// Restricts every query to part of the table.
    fn scope(&self) -> Condition {
        Condition::all()
    }

    /// Build a new vote row.
    fn new_vote(&self, id: String, subject: &str, voter: &str) -> Self::ActiveModel;
}

fn pair<L: VoteLedger>(ledger: &L, subject: &str, voter: &str) -> Condition {
    ledger
        .scope()
        .add(ledger.subject_column().eq(subject))
        .add(ledger.voter_column().eq(voter))
}

/// Flip the voter's vote on a subject.
///
/// Deletes the (subject, voter) row when present, inserts one otherwise, and
/// returns the subject's recomputed total. Subject existence is the caller's
/// responsibility.
pub async fn toggle<L, C>(
    ledger: &L,
    conn: &C,
    id_gen: &IdGenerator,
    subject: &str,
    voter: &str,
) -> AppResult<Toggled>
where
    L: VoteLedger,
    C: ConnectionTrait,
    <L::Entity as EntityTrait>::Model:
        IntoActiveModel<L::ActiveModel> + FromQueryResult + Send + Sync + 'static,
{
    let removed = L::Entity::delete_many()
        .filter(pair(ledger, subject, voter))
        .exec(conn)
        .await
        .map_err(map_db_err)?
        .rows_affected;

    if removed == 0 {
        L::Entity::insert(ledger.new_vote(id_gen.generate(), subject, voter))
            .exec_without_returning(conn)
            .await
            .map_err(map_db_err)?;
    }

    let count = count(ledger, conn, subject).await?;

    Ok(Toggled {
        voted: removed == 0,
        count,
    })
}

/// Number of votes on a subject.
pub async fn count<L, C>(ledger: &L, conn: &C, subject: &str) -> AppResult<u64>
where
    L: VoteLedger,
    C: ConnectionTrait,
    <L::Entity as EntityTrait>::Model: FromQueryResult + Send + Sync + 'static,
{
    L::Entity::find()
        .filter(ledger.scope().add(ledger.subject_column().eq(subject)))
        .count(conn)
        .await
        .map_err(map_db_err)
}

/// Whether the voter currently holds a vote on the subject.
pub async fn has_voted<L, C>(ledger: &L, conn: &C, subject: &str, voter: &str) -> AppResult<bool>
where
    L: VoteLedger,
    C: ConnectionTrait,
    <L::Entity as EntityTrait>::Model: FromQueryResult + Send + Sync + 'static,
{
    let n = L::Entity::find()
        .filter(pair(ledger, subject, voter))
        .count(conn)
        .await
        .map_err(map_db_err)?;
    Ok(n > 0)
}

/// Vote totals for many subjects at once. Subjects without votes are absent.
pub async fn counts<L, C>(
    ledger: &L,
    conn: &C,
    subjects: &[String],
) -> AppResult<HashMap<String, u64>>
where
    L: VoteLedger,
    C: ConnectionTrait,
{
    if subjects.is_empty() {
        return Ok(HashMap::new());
    }

    let column = ledger.subject_column();
    grouped_counts::<L::Entity, C>(
        conn,
        column,
        ledger.scope().add(column.is_in(subjects.iter().cloned())),
    )
    .await
}

/// Remove every vote the voter holds within the ledger's scope.
pub async fn retract_all<L, C>(ledger: &L, conn: &C, voter: &str) -> AppResult<u64>
where
    L: VoteLedger,
    C: ConnectionTrait,
{
    let result = L::Entity::delete_many()
        .filter(ledger.scope().add(ledger.voter_column().eq(voter)))
        .exec(conn)
        .await
        .map_err(map_db_err)?;
    Ok(result.rows_affected)
}

/// Upvotes on events.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventVotes;

impl VoteLedger for EventVotes {
    type Entity = EventVote;
    type ActiveModel = event_vote::ActiveModel;

    fn subject_column(&self) -> event_vote::Column {
        event_vote::Column::EventId
    }

    fn voter_column(&self) -> event_vote::Column {
        event_vote::Column::UserId
    }

    fn new_vote(&self, id: String, subject: &str, voter: &str) -> event_vote::ActiveModel {
        event_vote::ActiveModel {
            id: Set(id),
            event_id: Set(subject.to_string()),
            user_id: Set(voter.to_string()),
            created_at: Set(Utc::now().into()),
        }
    }
}

/// Upvotes on comments.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentVotes;

impl VoteLedger for CommentVotes {
    type Entity = CommentVote;
    type ActiveModel = comment_vote::ActiveModel;

    fn subject_column(&self) -> comment_vote::Column {
        comment_vote::Column::CommentId
    }

    fn voter_column(&self) -> comment_vote::Column {
        comment_vote::Column::UserId
    }

    fn new_vote(&self, id: String, subject: &str, voter: &str) -> comment_vote::ActiveModel {
        comment_vote::ActiveModel {
            id: Set(id),
            comment_id: Set(subject.to_string()),
            user_id: Set(voter.to_string()),
            created_at: Set(Utc::now().into()),
        }
    }
}

/// Selections on the options of one poll. The subject is the option id.
#[derive(Debug, Clone)]
pub struct PollOptionVotes {
    /// Poll whose options are being voted on.
    pub poll_id: String,
}

impl PollOptionVotes {
    /// Ledger for one poll.
    #[must_use]
    pub fn new(poll_id: impl Into<String>) -> Self {
        Self {
            poll_id: poll_id.into(),
        }
    }
}

impl VoteLedger for PollOptionVotes {
    type Entity = PollVote;
    type ActiveModel = poll_vote::ActiveModel;

    fn subject_column(&self) -> poll_vote::Column {
        poll_vote::Column::OptionId
    }

    fn voter_column(&self) -> poll_vote::Column {
        poll_vote::Column::UserId
    }

    fn scope(&self) -> Condition {
        Condition::all().add(poll_vote::Column::PollId.eq(self.poll_id.as_str()))
    }

    fn new_vote(&self, id: String, subject: &str, voter: &str) -> poll_vote::ActiveModel {
        poll_vote::ActiveModel {
            id: Set(id),
            poll_id: Set(self.poll_id.clone()),
            option_id: Set(subject.to_string()),
            user_id: Set(voter.to_string()),
            created_at: Set(Utc::now().into()),
        }
    }
}
