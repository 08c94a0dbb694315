//! Event endpoints.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use eventhub_common::AppResult;
use eventhub_core::{
    CreateEventInput, EventDetail, EventSummary, FinalizeEventInput, ListEventsInput, VoteInput,
    VoteResult,
};

use crate::{extractors::ApiJson, response::ApiResponse, state::AppState};

/// List events, newest first. `status` and `category` narrow the result.
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsInput>,
) -> AppResult<ApiResponse<Vec<EventSummary>>> {
    let filter = query.into_filter()?;
    let events = state.event_service.list(filter).await?;
    Ok(ApiResponse::ok(events))
}

/// Get the full event page.
async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<EventDetail>> {
    let event = state.event_service.get(&id).await?;
    Ok(ApiResponse::ok(event))
}

/// Propose an event.
async fn create_event(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateEventInput>,
) -> AppResult<ApiResponse<EventSummary>> {
    let event = state.event_service.create(input).await?;
    Ok(ApiResponse::created(event))
}

/// Toggle the caller's upvote.
async fn vote_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<VoteInput>,
) -> AppResult<ApiResponse<VoteResult>> {
    let result = state.event_service.toggle_vote(&id, input).await?;
    Ok(ApiResponse::ok(result))
}

/// Finalize an event. The body is optional; omitted fields stay unset.
async fn finalize_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    input: Option<ApiJson<FinalizeEventInput>>,
) -> AppResult<ApiResponse<EventSummary>> {
    let input = input.map(|ApiJson(input)| input).unwrap_or_default();
    let event = state.event_service.finalize(&id, input).await?;
    Ok(ApiResponse::ok(event))
}

async fn cancel_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<EventSummary>> {
    let event = state.event_service.cancel(&id).await?;
    Ok(ApiResponse::ok(event))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}/vote", post(vote_event))
        .route("/events/{id}/finalize", put(finalize_event))
        .route("/events/{id}/cancel", put(cancel_event))
}
