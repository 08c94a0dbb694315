//! Participation endpoint.

use axum::{
    Router,
    extract::{Path, State},
    routing::post,
};
use eventhub_common::AppResult;
use eventhub_core::{ParticipationOutcome, SetParticipationInput};

use crate::{extractors::ApiJson, response::ApiResponse, state::AppState};

/// Set, switch or clear the caller's attendance.
async fn participate(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    ApiJson(input): ApiJson<SetParticipationInput>,
) -> AppResult<ApiResponse<ParticipationOutcome>> {
    let outcome = state
        .participation_service
        .set_status(&event_id, input)
        .await?;
    Ok(ApiResponse::ok(outcome))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/events/{id}/participate", post(participate))
}
