//! Member endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use eventhub_common::AppResult;
use eventhub_core::{CreateUserInput, MemberView};

use crate::{extractors::ApiJson, response::ApiResponse, state::AppState};

/// List all members.
async fn list_users(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<MemberView>>> {
    let users = state.user_service.list().await?;
    Ok(ApiResponse::ok(users))
}

/// Get a member by ID.
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MemberView>> {
    let user = state.user_service.get(&id).await?;
    Ok(ApiResponse::ok(user))
}

/// Register a member.
async fn create_user(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateUserInput>,
) -> AppResult<ApiResponse<MemberView>> {
    let user = state.user_service.create(input).await?;
    Ok(ApiResponse::created(user))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user))
}
