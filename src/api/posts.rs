//! Post API endpoints
//!
//! Public reading endpoints are answered from the store snapshot:
//! - GET /api/v1/posts?lang&q&tag - Published posts, filtered
//! - GET /api/v1/posts/{slug}?lang - One published post
//! - POST /api/v1/posts/{id}/views - Count a view
//! - POST /api/v1/posts/{id}/comments - Add a comment (see `comments`)
//!
//! Admin endpoints write through the store:
//! - GET /api/v1/admin/posts?lang - Every post, drafts included
//! - POST /api/v1/admin/posts - Create
//! - PUT /api/v1/admin/posts/{id} - Sparse update
//! - DELETE /api/v1/admin/posts/{id} - Delete
//! - POST /api/v1/admin/posts/{id}/translate - Create the other-language version

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::comments;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{ApiResponse, PostListResponse};
use crate::models::{CreatePostInput, Language, PostWithRelations, UpdatePostInput};

/// Query parameters for the public post list
#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default)]
    pub lang: Language,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LanguageQuery {
    #[serde(default)]
    pub lang: Option<Language>,
}

/// Public post routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/{post}", get(get_post))
        .route("/{post}/views", post(increment_view))
        .route("/{post}/comments", post(comments::add_comment))
}

/// Admin post routes
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_posts).post(create_post))
        .route("/{id}", put(update_post).delete(delete_post))
        .route("/{id}/translate", post(translate_post))
}

/// GET /api/v1/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Json<ApiResponse<PostListResponse>> {
    let snapshot = state.store.snapshot();
    let text = query.q.as_deref().unwrap_or("");

    let posts = match query.tag.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(tag) => {
            let matching: Vec<i64> = snapshot
                .search_posts(text, query.lang)
                .iter()
                .map(|p| p.post.id)
                .collect();
            snapshot
                .get_posts_by_tag(tag.trim(), query.lang)
                .into_iter()
                .filter(|p| matching.contains(&p.post.id))
                .collect()
        }
        None => snapshot.search_posts(text, query.lang),
    };

    Json(ApiResponse::ok(PostListResponse::from_refs(posts)))
}

/// GET /api/v1/posts/{slug}
async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<LanguageQuery>,
) -> Result<Json<ApiResponse<PostWithRelations>>, ApiError> {
    let snapshot = state.store.snapshot();
    let found = match query.lang {
        Some(lang) => snapshot.get_post_by_slug_in(&slug, lang),
        None => snapshot.get_post_by_slug(&slug),
    };

    found
        .filter(|p| p.post.is_published())
        .cloned()
        .map(|p| Json(ApiResponse::ok(p)))
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", slug)))
}

/// POST /api/v1/posts/{id}/views
async fn increment_view(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.store.increment_view_count(id).await?;
    Ok(Json(ApiResponse::done("View counted")))
}

/// GET /api/v1/admin/posts
async fn admin_list_posts(
    State(state): State<AppState>,
    Query(query): Query<LanguageQuery>,
) -> Json<ApiResponse<PostListResponse>> {
    let snapshot = state.store.snapshot();
    let posts = match query.lang {
        Some(lang) => snapshot.get_posts_by_language(lang),
        None => snapshot.posts.iter().collect(),
    };
    Json(ApiResponse::ok(PostListResponse::from_refs(posts)))
}

/// POST /api/v1/admin/posts
async fn create_post(
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<ApiResponse<PostWithRelations>>), ApiError> {
    let created = state.store.create_post(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Post created", created)),
    ))
}

/// PUT /api/v1/admin/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdatePostInput>,
) -> Result<Json<ApiResponse<PostWithRelations>>, ApiError> {
    let updated = state.store.update_post(id, input).await?;
    Ok(Json(ApiResponse::with_message("Post updated", updated)))
}

/// DELETE /api/v1/admin/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.store.delete_post(id).await?;
    Ok(Json(ApiResponse::done("Post deleted")))
}

/// POST /api/v1/admin/posts/{id}/translate
async fn translate_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<ApiResponse<PostWithRelations>>), ApiError> {
    let translated = state.store.translate_post(id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Translation created", translated)),
    ))
}
