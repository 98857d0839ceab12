//! API state, errors and middleware
//!
//! - `AppState`, the shared services handed to every handler
//! - `ApiError`, the JSON error body with its HTTP status mapping
//! - Request statistics middleware reported by the admin status endpoint

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::services::{
    CommentServiceError, ContentStore, ShortLinkServiceError, StoreError, TagServiceError,
};

// ============================================================================
// Request Statistics
// ============================================================================

/// Request counters kept with atomics
pub struct RequestStats {
    total_requests: AtomicU64,
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.total_response_time_us.load(Ordering::Relaxed) as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub store: Arc<ContentStore>,
    pub request_stats: Arc<RequestStats>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error response body: `{"success": false, "error": {"code", "message"}}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub success: bool,
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn translation_failed(message: impl Into<String>) -> Self {
        Self::new("TRANSLATION_FAILED", message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new("UPSTREAM_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "TRANSLATION_FAILED" | "UPSTREAM_ERROR" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ApiError::not_found(msg),
            StoreError::ValidationError(msg) => ApiError::validation_error(msg),
            StoreError::Translation(msg) => ApiError::translation_failed(msg),
            StoreError::Gateway(e) => {
                tracing::error!("Store operation failed: {:#}", e);
                ApiError::internal_error("Operation failed")
            }
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(err: TagServiceError) -> Self {
        StoreError::from(err).into()
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(err: CommentServiceError) -> Self {
        StoreError::from(err).into()
    }
}

impl From<ShortLinkServiceError> for ApiError {
    fn from(err: ShortLinkServiceError) -> Self {
        match err {
            ShortLinkServiceError::Shorten(e) => ApiError::bad_gateway(e.to_string()),
            other => StoreError::from(other).into(),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Record request count and response time
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state
        .request_stats
        .record(start.elapsed().as_micros() as u64);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ShortenError;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::translation_failed("x").status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::new("ANYTHING", "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_gateway_errors_hide_details() {
        let err: ApiError = StoreError::Gateway(anyhow::anyhow!("UNIQUE constraint failed")).into();
        assert_eq!(err.error.code, "INTERNAL_ERROR");
        assert_eq!(err.error.message, "Operation failed");
        assert!(!err.success);
    }

    #[test]
    fn test_shortener_failure_is_upstream() {
        let err: ApiError = ShortLinkServiceError::Shorten(ShortenError::Status(503)).into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.error.message.contains("503"));
    }

    #[test]
    fn test_request_stats() {
        let stats = RequestStats::new();
        assert_eq!(stats.avg_response_time_us(), 0.0);
        stats.record(100);
        stats.record(300);
        assert_eq!(stats.total_requests(), 2);
        assert_eq!(stats.avg_response_time_us(), 200.0);
    }
}
