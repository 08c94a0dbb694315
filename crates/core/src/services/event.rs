//! Event service.
//!
//! Registry of proposals plus their read-side aggregates. Counts (upvotes,
//! comments, poll tallies, attendance) are recomputed on every read.

use std::sync::Arc;

use chrono::Utc;
use eventhub_common::{AppError, AppResult, IdGenerator};
use eventhub_db::{
    entities::event::{self, EventCategory, EventKind, EventStatus},
    entities::participation::ParticipationStatus,
    map_db_err,
    repositories::{
        EventFilter, EventRepository, EventVotes, ParticipationRepository, PollRepository,
        Toggled, UserRepository, counts::count_of, vote_ledger,
    },
};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, Set, TransactionTrait, prelude::DateTimeWithTimeZone,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::comment::{CommentNode, build_comment_tree, load_records};
use super::parse_wire_enum;
use super::poll::{PollDetail, load_detail};
use super::user::MemberView;

/// Input for proposing an event.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventInput {
    #[validate(length(min = 1, max = 256))]
    pub title: String,

    #[validate(length(max = 10000))]
    pub description: Option<String>,

    /// `poll`, `discussion` or `announcement`.
    #[serde(rename = "type")]
    pub kind: String,

    pub category: String,

    #[validate(length(min = 1))]
    pub creator_id: String,
}

/// Input for finalizing an event. All fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeEventInput {
    /// Agreed date, ISO 8601.
    #[validate(length(max = 64))]
    pub final_date: Option<String>,

    #[validate(length(max = 512))]
    pub final_location: Option<String>,

    #[validate(length(max = 10000))]
    pub final_details: Option<String>,
}

/// Query for listing events. Empty values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsInput {
    pub status: Option<String>,
    pub category: Option<String>,
}

impl ListEventsInput {
    /// Parse into a typed filter.
    pub fn into_filter(self) -> AppResult<EventFilter> {
        let status = non_blank(self.status)
            .map(|s| parse_wire_enum::<EventStatus>("status", &s))
            .transpose()?;
        let category = non_blank(self.category)
            .map(|c| parse_wire_enum::<EventCategory>("category", &c))
            .transpose()?;
        Ok(EventFilter { status, category })
    }
}

/// Input for an upvote toggle.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VoteInput {
    #[validate(length(min = 1))]
    pub user_id: String,
}

/// Upvote state after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteResult {
    pub voted: bool,
    pub upvotes: u64,
}

impl From<Toggled> for VoteResult {
    fn from(toggled: Toggled) -> Self {
        Self {
            voted: toggled.voted,
            upvotes: toggled.count,
        }
    }
}

/// An event with its creator and headline counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub status: EventStatus,
    pub category: EventCategory,
    pub created_at: DateTimeWithTimeZone,
    pub finalized_at: Option<DateTimeWithTimeZone>,
    pub final_date: Option<String>,
    pub final_location: Option<String>,
    pub final_details: Option<String>,
    pub upvotes: u64,
    pub comment_count: u64,
    pub creator: Option<MemberView>,
}

impl EventSummary {
    fn new(
        model: event::Model,
        creator: Option<MemberView>,
        upvotes: u64,
        comment_count: u64,
    ) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            kind: model.kind,
            status: model.status,
            category: model.category,
            created_at: model.created_at,
            finalized_at: model.finalized_at,
            final_date: model.final_date,
            final_location: model.final_location,
            final_details: model.final_details,
            upvotes,
            comment_count,
            creator,
        }
    }
}

/// A member's attendance entry on an event page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationView {
    pub id: String,
    pub status: ParticipationStatus,
    pub created_at: DateTimeWithTimeZone,
    pub user: Option<MemberView>,
}

/// Everything shown on an event page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    #[serde(flatten)]
    pub summary: EventSummary,
    pub polls: Vec<PollDetail>,
    pub participations: Vec<ParticipationView>,
    pub comments: Vec<CommentNode>,
}

/// Event service for business logic.
#[derive(Clone)]
pub struct EventService {
    db: Arc<DatabaseConnection>,
    event_repo: EventRepository,
    user_repo: UserRepository,
    poll_repo: PollRepository,
    participation_repo: ParticipationRepository,
    id_gen: IdGenerator,
}

impl EventService {
    /// Create a new event service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            event_repo: EventRepository::new(),
            user_repo: UserRepository::new(),
            poll_repo: PollRepository::new(),
            participation_repo: ParticipationRepository::new(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Events matching the filter, newest first.
    pub async fn list(&self, filter: EventFilter) -> AppResult<Vec<EventSummary>> {
        let conn = self.db.as_ref();
        let events = self.event_repo.find_filtered(conn, filter).await?;
        self.summarize(conn, events).await
    }

    /// Full event page: summary, poll, attendance and discussion.
    pub async fn get(&self, id: &str) -> AppResult<EventDetail> {
        let conn = self.db.as_ref();
        let event = self.event_repo.get_by_id(conn, id).await?;
        let summary = self.summarize_one(conn, event).await?;

        let polls = match self.poll_repo.find_by_event_id(conn, id).await? {
            Some(poll) => vec![load_detail(conn, &self.poll_repo, poll, None).await?],
            None => Vec::new(),
        };

        let rows = self.participation_repo.find_by_event(conn, id).await?;
        let member_ids: Vec<String> = rows.iter().map(|p| p.user_id.clone()).collect();
        let members = self.user_repo.find_by_ids(conn, &member_ids).await?;
        let participations = rows
            .into_iter()
            .map(|p| ParticipationView {
                user: members.get(&p.user_id).cloned().map(MemberView::from),
                id: p.id,
                status: p.status,
                created_at: p.created_at,
            })
            .collect();

        let comments = build_comment_tree(load_records(conn, id).await?);

        Ok(EventDetail {
            summary,
            polls,
            participations,
            comments,
        })
    }

    /// Propose a new event. It starts open with zero counts.
    pub async fn create(&self, input: CreateEventInput) -> AppResult<EventSummary> {
        input.validate()?;

        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("title cannot be blank".to_string()));
        }
        let kind: EventKind = parse_wire_enum("type", &input.kind)?;
        let category: EventCategory = parse_wire_enum("category", &input.category)?;

        let txn = self.db.begin().await.map_err(map_db_err)?;

        let creator = self.user_repo.get_by_id(&txn, &input.creator_id).await?;
        let event = self
            .event_repo
            .create(
                &txn,
                event::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    title: Set(title.to_string()),
                    description: Set(non_blank(input.description)),
                    kind: Set(kind),
                    status: Set(EventStatus::Open),
                    category: Set(category),
                    creator_id: Set(creator.id.clone()),
                    created_at: Set(Utc::now().into()),
                    finalized_at: Set(None),
                    final_date: Set(None),
                    final_location: Set(None),
                    final_details: Set(None),
                },
            )
            .await?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(event_id = %event.id, creator_id = %creator.id, "Created event");

        Ok(EventSummary::new(event, Some(creator.into()), 0, 0))
    }

    /// Toggle the member's upvote on an event.
    pub async fn toggle_vote(&self, event_id: &str, input: VoteInput) -> AppResult<VoteResult> {
        input.validate()?;

        let txn = self.db.begin().await.map_err(map_db_err)?;

        self.event_repo.get_by_id(&txn, event_id).await?;
        self.user_repo.get_by_id(&txn, &input.user_id).await?;

        let toggled =
            vote_ledger::toggle(&EventVotes, &txn, &self.id_gen, event_id, &input.user_id)
                .await?;

        txn.commit().await.map_err(map_db_err)?;

        Ok(toggled.into())
    }

    /// Lock in the outcome of an open event.
    ///
    /// Status and every finalization field are written in one update; a
    /// second call is a conflict and leaves the first call's values intact.
    pub async fn finalize(
        &self,
        event_id: &str,
        input: FinalizeEventInput,
    ) -> AppResult<EventSummary> {
        input.validate()?;

        let txn = self.db.begin().await.map_err(map_db_err)?;

        let event = self.event_repo.get_for_update(&txn, event_id).await?;
        match event.status {
            EventStatus::Open => {}
            EventStatus::Finalized => {
                return Err(AppError::Conflict("Event is already finalized".to_string()));
            }
            EventStatus::Cancelled => {
                return Err(AppError::Conflict("Cannot finalize a cancelled event".to_string()));
            }
        }

        let mut active: event::ActiveModel = event.into();
        active.status = Set(EventStatus::Finalized);
        active.finalized_at = Set(Some(Utc::now().into()));
        active.final_date = Set(non_blank(input.final_date));
        active.final_location = Set(non_blank(input.final_location));
        active.final_details = Set(non_blank(input.final_details));

        let updated = self.event_repo.update(&txn, active).await?;
        let summary = self.summarize_one(&txn, updated).await?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(event_id = %event_id, "Event finalized");

        Ok(summary)
    }

    /// Call off an open event. Finalization fields stay empty.
    pub async fn cancel(&self, event_id: &str) -> AppResult<EventSummary> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let event = self.event_repo.get_for_update(&txn, event_id).await?;
        match event.status {
            EventStatus::Open => {}
            EventStatus::Finalized => {
                return Err(AppError::Conflict("Cannot cancel a finalized event".to_string()));
            }
            EventStatus::Cancelled => {
                return Err(AppError::Conflict("Event is already cancelled".to_string()));
            }
        }

        let mut active: event::ActiveModel = event.into();
        active.status = Set(EventStatus::Cancelled);

        let updated = self.event_repo.update(&txn, active).await?;
        let summary = self.summarize_one(&txn, updated).await?;

        txn.commit().await.map_err(map_db_err)?;

        tracing::info!(event_id = %event_id, "Event cancelled");

        Ok(summary)
    }

    async fn summarize_one<C: ConnectionTrait>(
        &self,
        conn: &C,
        event: event::Model,
    ) -> AppResult<EventSummary> {
        let id = event.id.clone();
        self.summarize(conn, vec![event])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal(format!("Summary missing for event {id}")))
    }

    async fn summarize<C: ConnectionTrait>(
        &self,
        conn: &C,
        events: Vec<event::Model>,
    ) -> AppResult<Vec<EventSummary>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
        let mut creator_ids: Vec<String> = events.iter().map(|e| e.creator_id.clone()).collect();
        creator_ids.sort_unstable();
        creator_ids.dedup();

        let creators = self.user_repo.find_by_ids(conn, &creator_ids).await?;
        let upvotes = self.event_repo.upvote_counts(conn, &ids).await?;
        let comments = self.event_repo.comment_counts(conn, &ids).await?;

        Ok(events
            .into_iter()
            .map(|e| {
                let creator = creators.get(&e.creator_id).cloned().map(MemberView::from);
                let upvotes = count_of(&upvotes, &e.id);
                let comment_count = count_of(&comments, &e.id);
                EventSummary::new(e, creator, upvotes, comment_count)
            })
            .collect())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
