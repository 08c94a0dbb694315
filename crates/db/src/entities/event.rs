//! Event entity (a proposal under discussion).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What kind of proposal an event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    #[sea_orm(string_value = "poll")]
    Poll,
    #[sea_orm(string_value = "discussion")]
    Discussion,
    #[sea_orm(string_value = "announcement")]
    Announcement,
}

/// Lifecycle of an event. `Open` is the only state that can transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "camelCase")]
pub enum EventStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "finalized")]
    Finalized,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "camelCase")]
pub enum EventCategory {
    #[sea_orm(string_value = "cinema")]
    Cinema,
    #[sea_orm(string_value = "food")]
    Food,
    #[sea_orm(string_value = "games")]
    Games,
    #[sea_orm(string_value = "sports")]
    Sports,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub kind: EventKind,

    #[sea_orm(indexed)]
    pub status: EventStatus,

    #[sea_orm(indexed)]
    pub category: EventCategory,

    /// Member who proposed the event
    #[sea_orm(indexed)]
    pub creator_id: String,

    pub created_at: DateTimeWithTimeZone,

    // Finalization fields are written together with the status transition
    // and stay null otherwise.
    #[sea_orm(nullable)]
    pub finalized_at: Option<DateTimeWithTimeZone>,

    /// Agreed date, as supplied by the caller (ISO 8601)
    #[sea_orm(nullable)]
    pub final_date: Option<String>,

    #[sea_orm(nullable)]
    pub final_location: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub final_details: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Creator,
    #[sea_orm(has_one = "super::poll::Entity")]
    Poll,
    #[sea_orm(has_many = "super::event_vote::Entity")]
    Votes,
    #[sea_orm(has_many = "super::participation::Entity")]
    Participations,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl Related<super::event_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl Related<super::participation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participations.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
