//! Admin status endpoints
//!
//! - GET /api/v1/admin/status - Store, database and request statistics
//! - POST /api/v1/admin/reload - Rebuild the store snapshot

use axum::{extract::State, routing::{get, post}, Json, Router};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::ApiResponse;
use crate::db::DatabasePool;
use crate::models::Language;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Post counts for one language
#[derive(Debug, Serialize)]
pub struct LanguageCounts {
    pub language: Language,
    pub total: usize,
    pub published: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub loading: bool,
    pub last_error: Option<String>,
    pub loaded_at: Option<String>,
    pub database_ok: bool,
    pub posts: Vec<LanguageCounts>,
    pub uptime_seconds: u64,
    pub uptime_formatted: String,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub posts: usize,
    pub loaded_at: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/reload", post(reload))
}

/// GET /api/v1/admin/status
async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    let snapshot = state.store.snapshot();
    let database_ok = match state.pool.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Database ping failed: {:#}", e);
            false
        }
    };

    let posts = [Language::En, Language::Vi]
        .into_iter()
        .map(|language| LanguageCounts {
            language,
            total: snapshot.get_posts_by_language(language).len(),
            published: snapshot.search_posts("", language).len(),
        })
        .collect();

    let uptime_seconds = state.request_stats.uptime_seconds();
    Json(ApiResponse::ok(StatusResponse {
        version: APP_VERSION.to_string(),
        loading: state.store.is_loading(),
        last_error: state.store.last_error(),
        loaded_at: snapshot.loaded_at.map(|dt| dt.to_rfc3339()),
        database_ok,
        posts,
        uptime_seconds,
        uptime_formatted: format_uptime(uptime_seconds),
        total_requests: state.request_stats.total_requests(),
        avg_response_time_ms: state.request_stats.avg_response_time_us() / 1000.0,
    }))
}

/// POST /api/v1/admin/reload
async fn reload(State(state): State<AppState>) -> Result<Json<ApiResponse<ReloadResponse>>, ApiError> {
    let snapshot = state.store.load_all().await?;
    Ok(Json(ApiResponse::with_message(
        "Content reloaded",
        ReloadResponse {
            posts: snapshot.posts.len(),
            loaded_at: snapshot.loaded_at.map(|dt| dt.to_rfc3339()),
        },
    )))
}

/// Format uptime to human readable string
fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}
