//! Event repository.

use std::collections::HashMap;

use crate::entities::{
    Comment, Event, comment,
    event::{self, EventCategory, EventStatus},
};
use crate::map_db_err;
use crate::repositories::counts::grouped_counts;
use crate::repositories::vote_ledger::{self, EventVotes};
use eventhub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Recognized filters for event listings. Set fields are AND-combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Exact-match on status.
    pub status: Option<EventStatus>,
    /// Exact-match on category.
    pub category: Option<EventCategory>,
}

impl EventFilter {
    fn condition(self) -> Condition {
        let mut cond = Condition::all();
        if let Some(status) = self.status {
            cond = cond.add(event::Column::Status.eq(status));
        }
        if let Some(category) = self.category {
            cond = cond.add(event::Column::Category.eq(category));
        }
        cond
    }
}

/// Event repository for database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventRepository;

impl EventRepository {
    /// Create a new event repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find an event by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<event::Model>> {
        Event::find_by_id(id).one(conn).await.map_err(map_db_err)
    }

    /// Get an event by ID, returning an error if not found.
    pub async fn get_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<event::Model> {
        self.find_by_id(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event not found: {id}")))
    }

    /// Get an event by ID with a row lock held until the transaction ends.
    pub async fn get_for_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<event::Model> {
        Event::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| AppError::NotFound(format!("Event not found: {id}")))
    }

    /// Events matching the filter, newest first.
    pub async fn find_filtered<C: ConnectionTrait>(
        &self,
        conn: &C,
        filter: EventFilter,
    ) -> AppResult<Vec<event::Model>> {
        Event::find()
            .filter(filter.condition())
            .order_by_desc(event::Column::CreatedAt)
            .order_by_desc(event::Column::Id)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new event.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: event::ActiveModel,
    ) -> AppResult<event::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Update an event.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: event::ActiveModel,
    ) -> AppResult<event::Model> {
        model.update(conn).await.map_err(map_db_err)
    }

    /// Upvote totals for the given events.
    pub async fn upvote_counts<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_ids: &[String],
    ) -> AppResult<HashMap<String, u64>> {
        vote_ledger::counts(&EventVotes, conn, event_ids).await
    }

    /// Comment totals (replies included) for the given events.
    pub async fn comment_counts<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_ids: &[String],
    ) -> AppResult<HashMap<String, u64>> {
        if event_ids.is_empty() {
            return Ok(HashMap::new());
        }

        grouped_counts::<Comment, C>(
            conn,
            comment::Column::EventId,
            Condition::all().add(comment::Column::EventId.is_in(event_ids.iter().cloned())),
        )
        .await
    }
}
