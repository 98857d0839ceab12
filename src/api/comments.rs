//! Comment API endpoints
//!
//! - POST /api/v1/posts/{id}/comments - Add a visible comment
//! - GET /api/v1/admin/comments - Every comment with its post title
//! - PUT /api/v1/admin/comments/{id}/status - Show or hide
//! - DELETE /api/v1/admin/comments/{id} - Delete

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::ApiResponse;
use crate::models::{Comment, CommentStatus, CommentWithPost, CreateCommentInput};

#[derive(Debug, Deserialize)]
pub struct UpdateCommentStatusRequest {
    pub status: CommentStatus,
}

/// Admin comment routes
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_comments))
        .route("/{id}/status", put(update_status))
        .route("/{id}", delete(delete_comment))
}

/// POST /api/v1/posts/{id}/comments
pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<ApiResponse<Comment>>), ApiError> {
    let comment = state.store.add_comment(post_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Comment added", comment)),
    ))
}

async fn list_comments(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CommentWithPost>>>, ApiError> {
    let comments = state.store.comments().list_all().await?;
    Ok(Json(ApiResponse::ok(comments)))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCommentStatusRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.store.set_comment_status(id, req.status).await?;
    Ok(Json(ApiResponse::done(format!("Comment is now {}", req.status))))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.store.delete_comment(id).await?;
    Ok(Json(ApiResponse::done("Comment deleted")))
}
