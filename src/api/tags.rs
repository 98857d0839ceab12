//! Tag API endpoints
//!
//! - GET /api/v1/tags?lang - Tag slugs of published posts, sorted
//! - GET /api/v1/admin/tags?lang - Tag rows; with `lang`, usage counts
//! - DELETE /api/v1/admin/tags/{id} - Delete a tag from every post

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{ApiResponse, TagSlugsResponse};
use crate::models::{Language, Tag};

#[derive(Debug, Deserialize)]
pub struct PublicTagsQuery {
    #[serde(default)]
    pub lang: Language,
}

#[derive(Debug, Deserialize)]
pub struct AdminTagsQuery {
    #[serde(default)]
    pub lang: Option<Language>,
}

/// One tag row for the admin list
#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub slug: String,
    pub name_vi: String,
    pub name_en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_count: Option<i64>,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            slug: tag.slug,
            name_vi: tag.name_vi,
            name_en: tag.name_en,
            post_count: None,
        }
    }
}

impl From<crate::models::TagWithCount> for TagResponse {
    fn from(twc: crate::models::TagWithCount) -> Self {
        Self {
            post_count: Some(twc.post_count),
            ..TagResponse::from(twc.tag)
        }
    }
}

/// Public tag routes
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_tags))
}

/// Admin tag routes
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_tags))
        .route("/{id}", delete(delete_tag))
}

/// GET /api/v1/tags
async fn list_tags(
    State(state): State<AppState>,
    Query(query): Query<PublicTagsQuery>,
) -> Json<ApiResponse<TagSlugsResponse>> {
    let tags = state.store.snapshot().get_all_tags(query.lang);
    Json(ApiResponse::ok(TagSlugsResponse {
        language: query.lang,
        tags,
    }))
}

/// GET /api/v1/admin/tags
async fn admin_list_tags(
    State(state): State<AppState>,
    Query(query): Query<AdminTagsQuery>,
) -> Result<Json<ApiResponse<Vec<TagResponse>>>, ApiError> {
    let tags = match query.lang {
        Some(lang) => state
            .store
            .tags()
            .with_counts(lang)
            .await?
            .into_iter()
            .map(TagResponse::from)
            .collect(),
        None => state
            .store
            .tags()
            .list()
            .await?
            .into_iter()
            .map(TagResponse::from)
            .collect(),
    };
    Ok(Json(ApiResponse::ok(tags)))
}

/// DELETE /api/v1/admin/tags/{id}
async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.store.delete_tag(id).await?;
    Ok(Json(ApiResponse::done("Tag deleted")))
}
