//! Database entities.

#![allow(missing_docs)]

pub mod comment;
pub mod comment_vote;
pub mod event;
pub mod event_vote;
pub mod participation;
pub mod poll;
pub mod poll_option;
pub mod poll_vote;
pub mod user;

pub use comment::Entity as Comment;
pub use comment_vote::Entity as CommentVote;
pub use event::Entity as Event;
pub use event_vote::Entity as EventVote;
pub use participation::Entity as Participation;
pub use poll::Entity as Poll;
pub use poll_option::Entity as PollOption;
pub use poll_vote::Entity as PollVote;
pub use user::Entity as User;
