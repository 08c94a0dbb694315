//! Poll repository.
//!
//! Covers the poll row, its ordered option set and the per-option vote
//! counts. Vote rows themselves are written through the toggle ledger.

use std::collections::HashMap;

use crate::entities::{Poll, PollOption, PollVote, poll, poll_option, poll_vote};
use crate::map_db_err;
use crate::repositories::vote_ledger::{self, PollOptionVotes};
use eventhub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Poll repository for database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollRepository;

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a poll by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id).one(conn).await.map_err(map_db_err)
    }

    /// Get a poll by ID, returning an error if not found.
    pub async fn get_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<poll::Model> {
        self.find_by_id(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {id}")))
    }

    /// Get a poll by ID with a row lock held until the transaction ends.
    pub async fn get_for_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<poll::Model> {
        Poll::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {id}")))
    }

    /// Find the poll attached to an event.
    pub async fn find_by_event_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_id: &str,
    ) -> AppResult<Option<poll::Model>> {
        Poll::find()
            .filter(poll::Column::EventId.eq(event_id))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new poll.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: poll::ActiveModel,
    ) -> AppResult<poll::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Insert the options of a poll.
    pub async fn create_options<C: ConnectionTrait>(
        &self,
        conn: &C,
        options: Vec<poll_option::ActiveModel>,
    ) -> AppResult<()> {
        if options.is_empty() {
            return Ok(());
        }

        PollOption::insert_many(options)
            .exec_without_returning(conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Options of a poll in the order they were supplied.
    pub async fn find_options<C: ConnectionTrait>(
        &self,
        conn: &C,
        poll_id: &str,
    ) -> AppResult<Vec<poll_option::Model>> {
        PollOption::find()
            .filter(poll_option::Column::PollId.eq(poll_id))
            .order_by_asc(poll_option::Column::Position)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Get an option, scoped to its poll.
    pub async fn get_option<C: ConnectionTrait>(
        &self,
        conn: &C,
        poll_id: &str,
        option_id: &str,
    ) -> AppResult<poll_option::Model> {
        PollOption::find_by_id(option_id)
            .filter(poll_option::Column::PollId.eq(poll_id))
            .one(conn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| {
                AppError::NotFound(format!("Option {option_id} not found in poll {poll_id}"))
            })
    }

    /// Vote totals per option of a poll. Options without votes are absent.
    pub async fn vote_counts<C: ConnectionTrait>(
        &self,
        conn: &C,
        poll_id: &str,
        option_ids: &[String],
    ) -> AppResult<HashMap<String, u64>> {
        vote_ledger::counts(&PollOptionVotes::new(poll_id), conn, option_ids).await
    }

    /// Option IDs the user currently has selected in a poll, in option order.
    pub async fn user_selections<C: ConnectionTrait>(
        &self,
        conn: &C,
        poll_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<String>> {
        PollVote::find()
            .select_only()
            .column(poll_vote::Column::OptionId)
            .inner_join(PollOption)
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .filter(poll_vote::Column::UserId.eq(user_id))
            .order_by_asc(poll_option::Column::Position)
            .into_tuple::<String>()
            .all(conn)
            .await
            .map_err(map_db_err)
    }
}
