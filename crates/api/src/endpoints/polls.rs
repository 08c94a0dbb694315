//! Poll endpoints.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use eventhub_common::AppResult;
use eventhub_core::{CreatePollInput, PollDetail, PollVoteInput, PollVoteResult};
use serde::Deserialize;

use crate::{extractors::ApiJson, response::ApiResponse, state::AppState};

/// Show poll query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowPollQuery {
    /// Include this member's selections in the response.
    pub user_id: Option<String>,
}

/// Attach a poll to an event.
async fn create_poll(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    ApiJson(input): ApiJson<CreatePollInput>,
) -> AppResult<ApiResponse<PollDetail>> {
    let poll = state.poll_service.create_poll(&event_id, input).await?;
    Ok(ApiResponse::created(poll))
}

/// Get poll details.
async fn show_poll(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ShowPollQuery>,
) -> AppResult<ApiResponse<PollDetail>> {
    let viewer = query.user_id.filter(|u| !u.is_empty());
    let poll = state.poll_service.get_poll(&id, viewer.as_deref()).await?;
    Ok(ApiResponse::ok(poll))
}

/// Vote on a poll.
async fn vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<PollVoteInput>,
) -> AppResult<ApiResponse<PollVoteResult>> {
    let result = state.poll_service.vote(&id, input).await?;
    Ok(ApiResponse::ok(result))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/{id}/polls", post(create_poll))
        .route("/polls/{id}", get(show_poll))
        .route("/polls/{id}/vote", post(vote))
}
