//! Database repositories.
//!
//! Repositories are stateless; every method takes the connection (or an open
//! transaction) it should run on.

pub mod comment;
pub mod counts;
pub mod event;
pub mod participation;
pub mod poll;
pub mod user;
pub mod vote_ledger;

pub use comment::CommentRepository;
pub use event::{EventFilter, EventRepository};
pub use participation::ParticipationRepository;
pub use poll::PollRepository;
pub use user::UserRepository;
pub use vote_ledger::{CommentVotes, EventVotes, PollOptionVotes, Toggled, VoteLedger};
