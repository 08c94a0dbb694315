//! Comment repository.

use std::collections::HashMap;

use crate::entities::{Comment, comment};
use crate::map_db_err;
use crate::repositories::vote_ledger::{self, CommentVotes};
use eventhub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};

/// Comment repository for database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentRepository;

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a comment by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id).one(conn).await.map_err(map_db_err)
    }

    /// Get a comment by ID, returning an error if not found.
    pub async fn get_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<comment::Model> {
        self.find_by_id(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment not found: {id}")))
    }

    /// Get a comment that must belong to the given event.
    pub async fn get_in_event<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_id: &str,
        id: &str,
    ) -> AppResult<comment::Model> {
        Comment::find_by_id(id)
            .filter(comment::Column::EventId.eq(event_id))
            .one(conn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| {
                AppError::NotFound(format!("Parent comment {id} not found in event {event_id}"))
            })
    }

    /// Comments of an event, oldest first. IDs break timestamp ties.
    pub async fn find_by_event<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_id: &str,
    ) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::EventId.eq(event_id))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a new comment.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: comment::ActiveModel,
    ) -> AppResult<comment::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Upvote totals for the given comments.
    pub async fn upvote_counts<C: ConnectionTrait>(
        &self,
        conn: &C,
        comment_ids: &[String],
    ) -> AppResult<HashMap<String, u64>> {
        vote_ledger::counts(&CommentVotes, conn, comment_ids).await
    }
}
