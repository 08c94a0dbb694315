//! API endpoints.

mod calendar;
mod comments;
mod events;
mod health;
mod participation;
mod polls;
mod users;

use axum::{
    Router,
    http::{Method, Uri},
};
use eventhub_common::AppError;

use crate::state::AppState;

/// Create the API router.
///
/// `/health` sits at the root; everything else is served under `/api`.
pub fn router() -> Router<AppState> {
    let api = Router::new()
        .merge(users::router())
        .merge(events::router())
        .merge(polls::router())
        .merge(participation::router())
        .merge(comments::router())
        .merge(calendar::router());

    Router::new()
        .merge(health::router())
        .nest("/api", api)
        .fallback(not_found)
}

async fn not_found(method: Method, uri: Uri) -> AppError {
    tracing::debug!(%method, %uri, "No route matched");
    AppError::NotFound("Route not found".to_string())
}
