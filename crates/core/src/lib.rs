//! Core business logic for the event hub.
//!
//! Services own the interaction rules: toggle votes, poll exclusivity, the
//! participation state machine and comment threading. Each mutating
//! operation runs in a single transaction and returns freshly recomputed
//! counts.

pub mod services;

pub use services::*;
