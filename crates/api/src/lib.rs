//! HTTP API layer for the event hub.
//!
//! This crate exposes the engine over REST:
//!
//! - **Endpoints**: members, events, polls, participation, comments, calendar
//! - **Extractors**: JSON bodies whose rejections use the common error shape
//! - **State**: one service per engine component, sharing a connection pool
//!
//! Built on Axum 0.8. Cross-cutting layers (tracing, CORS, timeouts) are
//! attached by the server binary.

pub mod endpoints;
pub mod extractors;
pub mod response;
pub mod state;

pub use endpoints::router;
pub use state::AppState;
