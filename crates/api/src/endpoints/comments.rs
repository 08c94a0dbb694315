//! Comment endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use eventhub_common::AppResult;
use eventhub_core::{CommentNode, PostCommentInput, VoteInput, VoteResult};

use crate::{extractors::ApiJson, response::ApiResponse, state::AppState};

/// The event's discussion as nested threads.
async fn list_comments(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> AppResult<ApiResponse<Vec<CommentNode>>> {
    let comments = state.comment_service.list(&event_id).await?;
    Ok(ApiResponse::ok(comments))
}

/// Post a comment or a reply.
async fn post_comment(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    ApiJson(input): ApiJson<PostCommentInput>,
) -> AppResult<ApiResponse<CommentNode>> {
    let comment = state.comment_service.post(&event_id, input).await?;
    Ok(ApiResponse::created(comment))
}

/// Toggle the caller's upvote on a comment.
async fn vote_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<VoteInput>,
) -> AppResult<ApiResponse<VoteResult>> {
    let result = state.comment_service.toggle_vote(&id, input).await?;
    Ok(ApiResponse::ok(result))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/{id}/comments", get(list_comments).post(post_comment))
        .route("/comments/{id}/vote", post(vote_comment))
}
