//! Participation repository.

use std::collections::HashMap;

use crate::entities::{
    Participation,
    participation::{self, ParticipationStatus},
};
use crate::map_db_err;
use crate::repositories::counts::grouped_counts;
use eventhub_common::AppResult;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder,
};

/// Participation repository for database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticipationRepository;

impl ParticipationRepository {
    /// Create a new participation repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find the member's stated intent for an event.
    pub async fn find<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_id: &str,
        user_id: &str,
    ) -> AppResult<Option<participation::Model>> {
        Participation::find()
            .filter(participation::Column::EventId.eq(event_id))
            .filter(participation::Column::UserId.eq(user_id))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// Participations of an event, oldest first.
    pub async fn find_by_event<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_id: &str,
    ) -> AppResult<Vec<participation::Model>> {
        Participation::find()
            .filter(participation::Column::EventId.eq(event_id))
            .order_by_asc(participation::Column::CreatedAt)
            .order_by_asc(participation::Column::Id)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Create a participation.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: participation::ActiveModel,
    ) -> AppResult<participation::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Update a participation.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: participation::ActiveModel,
    ) -> AppResult<participation::Model> {
        model.update(conn).await.map_err(map_db_err)
    }

    /// Delete a participation.
    pub async fn delete<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        Participation::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Number of participations per status for an event.
    pub async fn status_counts<C: ConnectionTrait>(
        &self,
        conn: &C,
        event_id: &str,
    ) -> AppResult<HashMap<ParticipationStatus, u64>> {
        let raw = grouped_counts::<Participation, C>(
            conn,
            participation::Column::Status,
            Condition::all().add(participation::Column::EventId.eq(event_id)),
        )
        .await?;

        Ok(raw
            .into_iter()
            .filter_map(|(status, n)| {
                ParticipationStatus::try_from_value(&status)
                    .ok()
                    .map(|status| (status, n))
            })
            .collect())
    }
}
