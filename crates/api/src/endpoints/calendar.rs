//! Calendar download.

use axum::{
    Router,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use eventhub_common::AppResult;
use eventhub_core::CALENDAR_CONTENT_TYPE;

use crate::state::AppState;

/// Download a finalized event as an `.ics` file.
async fn export_calendar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let export = state.calendar_service.export(&id).await?;
    let disposition = format!("attachment; filename=\"{}\"", export.filename);

    Ok((
        [
            (header::CONTENT_TYPE, CALENDAR_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/events/{id}/calendar.ics", get(export_calendar))
}
