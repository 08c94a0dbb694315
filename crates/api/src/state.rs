//! Application state.

#![allow(missing_docs)]

use std::sync::Arc;

use eventhub_core::{
    CalendarService, CommentService, EventService, ParticipationService, PollService, UserService,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub event_service: EventService,
    pub poll_service: PollService,
    pub participation_service: ParticipationService,
    pub comment_service: CommentService,
    pub calendar_service: CalendarService,
}

impl AppState {
    /// Build every service over one shared connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            user_service: UserService::new(Arc::clone(&db)),
            event_service: EventService::new(Arc::clone(&db)),
            poll_service: PollService::new(Arc::clone(&db)),
            participation_service: ParticipationService::new(Arc::clone(&db)),
            comment_service: CommentService::new(Arc::clone(&db)),
            calendar_service: CalendarService::new(db),
        }
    }
}
