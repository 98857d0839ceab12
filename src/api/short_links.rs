//! Short link and shortener endpoints
//!
//! - GET /s/{code} - Redirect to the post and count the click
//! - GET /api/v1/admin/short-links - Every issued link
//! - GET /api/v1/admin/shortener - Provider settings of both languages
//! - GET|PUT /api/v1/admin/shortener/{lang} - One language's provider
//! - POST /api/v1/admin/shortener/{lang}/test - Try the provider once
//! - GET /api/v1/admin/shortener/logs?lang&limit - Recent provider calls

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::ApiResponse;
use crate::models::{Language, ShortLink, UrlShortenerConfig, UrlShortenerConfigInput, UrlShortenerLog};

#[derive(Debug, Deserialize)]
pub struct TestShortenerRequest {
    pub test_url: String,
}

#[derive(Debug, Serialize)]
pub struct TestShortenerResponse {
    pub short_url: String,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub lang: Option<Language>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Admin shortener routes, nested under `/admin/shortener`
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_configs))
        .route("/logs", get(recent_logs))
        .route("/{lang}", get(get_config).put(save_config))
        .route("/{lang}/test", post(test_shortener))
}

/// GET /s/{code}
pub async fn redirect_short_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Redirect, ApiError> {
    let link = state
        .store
        .short_links()
        .resolve(&code)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Short link not found: {}", code)))?;
    Ok(Redirect::temporary(&link.original_url))
}

/// GET /api/v1/admin/short-links
pub async fn list_short_links(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ShortLink>>>, ApiError> {
    let links = state.store.short_links().list_links().await?;
    Ok(Json(ApiResponse::ok(links)))
}

async fn list_configs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UrlShortenerConfig>>>, ApiError> {
    let configs = state.store.short_links().list_configs().await?;
    Ok(Json(ApiResponse::ok(configs)))
}

async fn get_config(
    State(state): State<AppState>,
    Path(lang): Path<Language>,
) -> Result<Json<ApiResponse<UrlShortenerConfig>>, ApiError> {
    state
        .store
        .short_links()
        .get_config(lang)
        .await?
        .map(|config| Json(ApiResponse::ok(config)))
        .ok_or_else(|| ApiError::not_found(format!("No shortener configured for {}", lang)))
}

async fn save_config(
    State(state): State<AppState>,
    Path(lang): Path<Language>,
    Json(input): Json<UrlShortenerConfigInput>,
) -> Result<Json<ApiResponse<UrlShortenerConfig>>, ApiError> {
    let saved = state.store.short_links().save_config(lang, &input).await?;
    Ok(Json(ApiResponse::with_message("Shortener saved", saved)))
}

async fn test_shortener(
    State(state): State<AppState>,
    Path(lang): Path<Language>,
    Json(req): Json<TestShortenerRequest>,
) -> Result<Json<ApiResponse<TestShortenerResponse>>, ApiError> {
    let short_url = state
        .store
        .short_links()
        .test_provider(lang, &req.test_url)
        .await?;
    Ok(Json(ApiResponse::with_message(
        "Shortener responded",
        TestShortenerResponse { short_url },
    )))
}

async fn recent_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<ApiResponse<Vec<UrlShortenerLog>>>, ApiError> {
    let logs = state
        .store
        .short_links()
        .recent_logs(query.lang, query.limit)
        .await?;
    Ok(Json(ApiResponse::ok(logs)))
}
