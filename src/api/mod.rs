//! API layer - HTTP handlers and routing
//!
//! Public reading endpoints, the short link redirect and the admin surface.
//! There is no authentication; admin routes are expected to sit behind
//! whatever protects the deployment.

pub mod admin;
pub mod comments;
pub mod middleware;
pub mod posts;
pub mod responses;
pub mod short_links;
pub mod tags;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, RequestStats};
pub use responses::ApiResponse;

/// Build the `/api/v1` router
pub fn build_api_router() -> Router<AppState> {
    let admin_routes = Router::new()
        .nest("/posts", posts::admin_router())
        .nest("/comments", comments::admin_router())
        .nest("/tags", tags::admin_router())
        .nest("/shortener", short_links::admin_router())
        .route("/short-links", get(short_links::list_short_links))
        .merge(admin::router());

    Router::new()
        .nest("/posts", posts::router())
        .nest("/tags", tags::router())
        .nest("/admin", admin_routes)
}

fn cors_layer(cors_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) if cors_origin != "*" => cors.allow_origin(origin),
        Ok(_) => cors.allow_origin(Any),
        Err(e) => {
            tracing::warn!("Invalid CORS origin '{}': {}, allowing any origin", cors_origin, e);
            cors.allow_origin(Any)
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    Router::new()
        .nest("/api/v1", build_api_router())
        .route("/s/{code}", get(short_links::redirect_short_code))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::services::short_link::tests::{service_with, FakeShortener};
    use crate::services::{ContentStore, ShortenError};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app() -> Router {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let short_links = Arc::new(service_with(
            pool.clone(),
            FakeShortener::replying(Err(ShortenError::NoShortUrl)),
        ));
        let store = Arc::new(ContentStore::new(pool.clone(), short_links));
        let state = AppState {
            pool,
            store,
            request_stats: Arc::new(RequestStats::new()),
        };
        build_router(state, "http://localhost:3000")
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn new_post(title: &str, lang: &str, status: &str) -> Value {
        json!({
            "title": title,
            "excerpt": "Intro",
            "content": "Some content about axum",
            "author": "Lan",
            "language": lang,
            "tags": ["Rust", "Web Dev"],
            "status": status
        })
    }

    #[tokio::test]
    async fn test_create_then_read_publicly() {
        let app = app().await;

        let (status, body) = send(&app, "POST", "/api/v1/admin/posts", Some(new_post("Hello Axum", "en", "published"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["slug"], "hello-axum");
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = send(&app, "GET", "/api/v1/posts?lang=en", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);

        let (status, body) = send(&app, "GET", "/api/v1/posts/hello-axum?lang=en", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id);

        let (status, _) = send(&app, "GET", "/api/v1/posts/hello-axum?lang=vi", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&app, "GET", "/api/v1/tags?lang=en", None).await;
        assert_eq!(body["data"]["tags"], json!(["rust", "web-dev"]));
    }

    #[tokio::test]
    async fn test_drafts_stay_private() {
        let app = app().await;
        send(&app, "POST", "/api/v1/admin/posts", Some(new_post("Secret Draft", "vi", "draft"))).await;

        let (_, body) = send(&app, "GET", "/api/v1/posts?lang=vi", None).await;
        assert_eq!(body["data"]["total"], 0);
        let (status, _) = send(&app, "GET", "/api/v1/posts/secret-draft", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&app, "GET", "/api/v1/admin/posts?lang=vi", None).await;
        assert_eq!(body["data"]["total"], 1);
    }

    #[tokio::test]
    async fn test_search_and_tag_filters() {
        let app = app().await;
        send(&app, "POST", "/api/v1/admin/posts", Some(new_post("Axum Routing", "en", "published"))).await;
        let mut other = new_post("Tokio Tasks", "en", "published");
        other["tags"] = json!(["async"]);
        other["content"] = json!("Spawning tasks");
        send(&app, "POST", "/api/v1/admin/posts", Some(other)).await;

        let (_, body) = send(&app, "GET", "/api/v1/posts?lang=en&q=ROUTING", None).await;
        assert_eq!(body["data"]["total"], 1);
        let (_, body) = send(&app, "GET", "/api/v1/posts?lang=en&tag=async", None).await;
        assert_eq!(body["data"]["posts"][0]["slug"], "tokio-tasks");
        let (_, body) = send(&app, "GET", "/api/v1/posts?lang=en&tag=async&q=axum", None).await;
        assert_eq!(body["data"]["total"], 0);
    }

    #[tokio::test]
    async fn test_validation_and_missing_posts() {
        let app = app().await;

        let mut untagged = new_post("No Tags", "en", "draft");
        untagged["tags"] = json!([]);
        let (status, body) = send(&app, "POST", "/api/v1/admin/posts", Some(untagged)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = send(&app, "PUT", "/api/v1/admin/posts/99", Some(json!({"title": "x"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "DELETE", "/api/v1/admin/posts/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "POST", "/api/v1/posts/99/views", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_comments_and_moderation() {
        let app = app().await;
        let (_, body) = send(&app, "POST", "/api/v1/admin/posts", Some(new_post("Discuss", "en", "published"))).await;
        let id = body["data"]["id"].as_i64().unwrap();

        let comment = json!({"author_name": "Hoa", "author_email": "hoa@example.com", "content": "Great"});
        let (status, body) = send(&app, "POST", &format!("/api/v1/posts/{}/comments", id), Some(comment.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let comment_id = body["data"]["id"].as_i64().unwrap();

        let (status, _) = send(&app, "POST", "/api/v1/posts/404/comments", Some(comment)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (_, body) = send(&app, "GET", "/api/v1/posts/discuss", None).await;
        assert_eq!(body["data"]["comments"].as_array().unwrap().len(), 1);

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/v1/admin/comments/{}/status", comment_id),
            Some(json!({"status": "hidden"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, "GET", "/api/v1/posts/discuss", None).await;
        assert!(body["data"]["comments"].as_array().unwrap().is_empty());
        let (_, body) = send(&app, "GET", "/api/v1/admin/comments", None).await;
        assert_eq!(body["data"][0]["status"], "hidden");
        assert_eq!(body["data"][0]["post_title"], "Discuss");
    }

    #[tokio::test]
    async fn test_short_link_redirect_counts_clicks() {
        let app = app().await;
        let (_, body) = send(&app, "POST", "/api/v1/admin/posts", Some(new_post("Share Me", "en", "published"))).await;
        let id = body["data"]["id"].as_i64().unwrap();

        let (_, body) = send(&app, "GET", "/api/v1/admin/short-links", None).await;
        let link = &body["data"][0];
        assert_eq!(link["post_id"], id);
        let code = link["short_code"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(Request::get(format!("/s/{}", code)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://blog.example.com/blog/share-me"
        );

        let (_, body) = send(&app, "GET", "/api/v1/admin/short-links", None).await;
        assert_eq!(body["data"][0]["clicks"], 1);

        let (status, _) = send(&app, "GET", "/s/zzzzzz", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_shortener_admin() {
        let app = app().await;

        let (status, _) = send(&app, "GET", "/api/v1/admin/shortener/en", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let config = json!({
            "provider": "tinyurl",
            "endpoint": "https://api.tiny.example/create",
            "api_key": "secret",
            "is_active": true
        });
        let (status, body) = send(&app, "PUT", "/api/v1/admin/shortener/en", Some(config)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["http_method"], "POST");
        assert_eq!(body["data"]["body_format"], r#"{"url": "{{original_url}}"}"#);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/admin/shortener/en/test",
            Some(json!({"test_url": "https://example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["success"], false);

        let (_, body) = send(&app, "GET", "/api/v1/admin/shortener/logs?lang=en", None).await;
        assert_eq!(body["data"][0]["status"], "error");
        let (_, body) = send(&app, "GET", "/api/v1/admin/shortener", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_translate_without_provider_is_reported() {
        let app = app().await;
        let (_, body) = send(&app, "POST", "/api/v1/admin/posts", Some(new_post("Only English", "en", "draft"))).await;
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = send(&app, "POST", &format!("/api/v1/admin/posts/{}/translate", id), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "TRANSLATION_FAILED");
    }

    #[tokio::test]
    async fn test_update_delete_and_status() {
        let app = app().await;
        let (_, body) = send(&app, "POST", "/api/v1/admin/posts", Some(new_post("Draft First", "en", "draft"))).await;
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/v1/admin/posts/{}", id),
            Some(json!({"status": "published", "tags": []})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["published_at"].is_string());
        assert!(body["data"]["tags"].as_array().unwrap().is_empty());

        let (_, body) = send(&app, "GET", "/api/v1/admin/status", None).await;
        assert_eq!(body["data"]["database_ok"], true);
        assert_eq!(body["data"]["posts"][0]["published"], 1);

        let (status, _) = send(&app, "DELETE", &format!("/api/v1/admin/posts/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, "GET", "/api/v1/posts?lang=en", None).await;
        assert_eq!(body["data"]["total"], 0);

        let (_, body) = send(&app, "POST", "/api/v1/admin/reload", None).await;
        assert_eq!(body["data"]["posts"], 0);
    }
}
