//! Business logic services.

#![allow(missing_docs)]

pub mod calendar;
pub mod comment;
pub mod event;
pub mod participation;
pub mod poll;
pub mod user;

pub use calendar::{CALENDAR_CONTENT_TYPE, CalendarExport, CalendarService, render_ics};
pub use comment::{
    CommentNode, CommentRecord, CommentService, PostCommentInput, build_comment_tree,
};
pub use event::{
    CreateEventInput, EventDetail, EventService, EventSummary, FinalizeEventInput,
    ListEventsInput, ParticipationView, VoteInput, VoteResult,
};
pub use participation::{
    ParticipationCounts, ParticipationOutcome, ParticipationService, SetParticipationInput,
};
pub use poll::{
    CreatePollInput, OptionCount, PollDetail, PollService, PollVoteInput, PollVoteResult,
};
pub use user::{CreateUserInput, MemberView, UserService};

use eventhub_common::{AppError, AppResult};
use sea_orm::ActiveEnum;

/// Parse a wire value into one of the string-backed enums.
pub(crate) fn parse_wire_enum<E>(field: &str, raw: &str) -> AppResult<E>
where
    E: ActiveEnum<Value = String>,
{
    E::try_from_value(&raw.to_string()).map_err(|_| {
        AppError::Validation(format!(
            "{field} must be one of: {}",
            E::values().join(", ")
        ))
    })
}
