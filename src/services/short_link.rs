//! Short-link issuer
//!
//! Every new post gets one short link. When the post's language has an
//! active provider configuration the provider is asked for the short URL;
//! otherwise, or when the provider call fails, a local `/s/{code}` link is
//! issued instead. Each provider call is recorded in the shortener log.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use crate::db::repositories::{
    ShortLinkRepository, ShortenerConfigRepository, ShortenerLogRepository,
};
use crate::models::{
    HttpMethod, Language, NewShortLink, NewUrlShortenerLog, Post, ShortLink, UrlShortenerConfig,
    UrlShortenerConfigInput, UrlShortenerLog,
};
use crate::services::slug::generate_short_code;

/// Placeholder replaced with the long URL in a provider's body template
pub const ORIGINAL_URL_PLACEHOLDER: &str = "{{original_url}}";

/// Response fields that may carry the short URL, in lookup order
pub const SHORT_URL_FIELDS: [&str; 4] = ["shortUrl", "short_url", "link", "url"];

/// Default number of log entries returned
pub const DEFAULT_LOG_LIMIT: i64 = 10;

/// Failure of a single provider call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShortenError {
    #[error("Failed to reach shortener: {0}")]
    Transport(String),

    #[error("Shortener returned HTTP {0}")]
    Status(u16),

    #[error("Shortener response is not JSON: {0}")]
    InvalidResponse(String),

    #[error("Shortener response has no short URL (expected one of shortUrl, short_url, link, url)")]
    NoShortUrl,
}

#[derive(Debug, thiserror::Error)]
pub enum ShortLinkServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Shorten(#[from] ShortenError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Substitute the first placeholder in a body template
pub fn render_body(template: &str, original_url: &str) -> String {
    template.replacen(ORIGINAL_URL_PLACEHOLDER, original_url, 1)
}

/// Pick the short URL out of a provider response
pub fn extract_short_url(response: &Value) -> Result<String, ShortenError> {
    SHORT_URL_FIELDS
        .iter()
        .filter_map(|field| response.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .find(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or(ShortenError::NoShortUrl)
}

/// Last non-empty path segment of a short URL, used as its code
pub fn short_code_of(short_url: &str) -> Option<String> {
    match reqwest::Url::parse(short_url) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        Err(_) => short_url
            .rsplit('/')
            .find(|s| !s.is_empty())
            .map(str::to_string),
    }
}

/// Outbound call to a URL-shortening provider
#[async_trait]
pub trait ShortenerClient: Send + Sync {
    async fn shorten(
        &self,
        config: &UrlShortenerConfig,
        original_url: &str,
    ) -> Result<String, ShortenError>;
}

/// reqwest-backed provider client
pub struct HttpShortenerClient {
    client: reqwest::Client,
}

impl HttpShortenerClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ShortenerClient for HttpShortenerClient {
    async fn shorten(
        &self,
        config: &UrlShortenerConfig,
        original_url: &str,
    ) -> Result<String, ShortenError> {
        let mut request = match config.http_method {
            HttpMethod::Get => self.client.get(&config.endpoint),
            HttpMethod::Post => self.client.post(&config.endpoint),
            HttpMethod::Put => self.client.put(&config.endpoint),
        };

        request = request
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", config.api_key),
            );

        if config.http_method.has_body() {
            request = request.body(render_body(&config.body_format, original_url));
        }

        tracing::debug!(
            "Calling shortener {} ({} {})",
            config.provider,
            config.http_method.as_str(),
            config.endpoint
        );

        let response = request
            .send()
            .await
            .map_err(|e| ShortenError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ShortenError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ShortenError::InvalidResponse(e.to_string()))?;
        extract_short_url(&body)
    }
}

/// Short-link issuer and shortener administration
pub struct ShortLinkService {
    links: Arc<dyn ShortLinkRepository>,
    configs: Arc<dyn ShortenerConfigRepository>,
    logs: Arc<dyn ShortenerLogRepository>,
    client: Arc<dyn ShortenerClient>,
    base_url: String,
}

impl ShortLinkService {
    pub fn new(
        links: Arc<dyn ShortLinkRepository>,
        configs: Arc<dyn ShortenerConfigRepository>,
        logs: Arc<dyn ShortenerLogRepository>,
        client: Arc<dyn ShortenerClient>,
        base_url: &str,
    ) -> Self {
        Self {
            links,
            configs,
            logs,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Canonical public URL of a post
    pub fn post_url(&self, slug: &str) -> String {
        format!("{}/blog/{}", self.base_url, slug)
    }

    fn local_short_url(&self, code: &str) -> String {
        format!("{}/s/{}", self.base_url, code)
    }

    /// Issue the short link for a newly created post.
    ///
    /// Provider failures are logged and fall back to a local link; only
    /// database failures surface as errors.
    pub async fn issue_for_post(&self, post: &Post) -> Result<ShortLink, ShortLinkServiceError> {
        let original_url = self.post_url(&post.slug);

        let config = self
            .configs
            .get(post.language)
            .await
            .context("Failed to load shortener config")?
            .filter(|c| c.is_active);

        let provided = match &config {
            Some(config) => self.call_provider(config, &original_url).await.ok(),
            None => None,
        };

        let (short_url, short_code) = match provided {
            Some(url) => {
                let code = short_code_of(&url);
                (url, code)
            }
            None => {
                let code = generate_short_code();
                (self.local_short_url(&code), Some(code))
            }
        };

        let link = self
            .links
            .create(&NewShortLink {
                original_url,
                short_url,
                short_code,
                language: post.language,
                post_id: Some(post.id),
            })
            .await
            .context("Failed to save short link")?;

        tracing::info!("Issued short link {} for post {}", link.short_url, post.id);
        Ok(link)
    }

    /// Call the provider and record the outcome in the log
    async fn call_provider(
        &self,
        config: &UrlShortenerConfig,
        original_url: &str,
    ) -> Result<String, ShortenError> {
        let result = self.client.shorten(config, original_url).await;

        let entry = match &result {
            Ok(short_url) => NewUrlShortenerLog::success(config.language, original_url, short_url),
            Err(e) => {
                tracing::warn!("Shortener {} failed for {}: {}", config.provider, original_url, e);
                NewUrlShortenerLog::failure(config.language, original_url, e.to_string())
            }
        };
        if let Err(e) = self.logs.append(&entry).await {
            tracing::warn!("Failed to record shortener log: {:#}", e);
        }

        result
    }

    /// Run a language's provider once against a test URL, active or not
    pub async fn test_provider(
        &self,
        language: Language,
        test_url: &str,
    ) -> Result<String, ShortLinkServiceError> {
        let test_url = test_url.trim();
        if test_url.is_empty() {
            return Err(ShortLinkServiceError::ValidationError(
                "Test URL cannot be empty".to_string(),
            ));
        }
        let config = self
            .configs
            .get(language)
            .await
            .context("Failed to load shortener config")?
            .ok_or_else(|| {
                ShortLinkServiceError::NotFound(format!("No shortener configured for {}", language))
            })?;

        Ok(self.call_provider(&config, test_url).await?)
    }

    pub async fn get_config(
        &self,
        language: Language,
    ) -> Result<Option<UrlShortenerConfig>, ShortLinkServiceError> {
        Ok(self
            .configs
            .get(language)
            .await
            .context("Failed to load shortener config")?)
    }

    pub async fn list_configs(&self) -> Result<Vec<UrlShortenerConfig>, ShortLinkServiceError> {
        Ok(self
            .configs
            .list()
            .await
            .context("Failed to list shortener configs")?)
    }

    /// Create or replace a language's provider settings
    pub async fn save_config(
        &self,
        language: Language,
        input: &UrlShortenerConfigInput,
    ) -> Result<UrlShortenerConfig, ShortLinkServiceError> {
        if input.provider.trim().is_empty() {
            return Err(ShortLinkServiceError::ValidationError(
                "Provider cannot be empty".to_string(),
            ));
        }
        if reqwest::Url::parse(input.endpoint.trim()).is_err() {
            return Err(ShortLinkServiceError::ValidationError(format!(
                "Invalid endpoint URL: {}",
                input.endpoint
            )));
        }

        let saved = self
            .configs
            .upsert(language, input)
            .await
            .context("Failed to save shortener config")?;
        tracing::info!(
            "Saved shortener config for {} (provider {}, active {})",
            language,
            saved.provider,
            saved.is_active
        );
        Ok(saved)
    }

    pub async fn recent_logs(
        &self,
        language: Option<Language>,
        limit: Option<i64>,
    ) -> Result<Vec<UrlShortenerLog>, ShortLinkServiceError> {
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, 100);
        Ok(self
            .logs
            .recent(language, limit)
            .await
            .context("Failed to read shortener logs")?)
    }

    pub async fn list_links(&self) -> Result<Vec<ShortLink>, ShortLinkServiceError> {
        Ok(self.links.list().await.context("Failed to list short links")?)
    }

    pub async fn link_for_post(
        &self,
        post_id: i64,
    ) -> Result<Option<ShortLink>, ShortLinkServiceError> {
        Ok(self
            .links
            .get_by_post(post_id)
            .await
            .context("Failed to load short link")?)
    }

    /// Look up a short code and count the click
    pub async fn resolve(&self, code: &str) -> Result<Option<ShortLink>, ShortLinkServiceError> {
        let Some(mut link) = self
            .links
            .get_by_code(code)
            .await
            .context("Failed to resolve short code")?
        else {
            return Ok(None);
        };

        self.links
            .increment_clicks(link.id)
            .await
            .context("Failed to count click")?;
        link.clicks += 1;
        Ok(Some(link))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxShortLinkRepository, SqlxShortenerConfigRepository, SqlxShortenerLogRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{LogStatus, PostStatus};
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;

    /// Scripted provider that records the URLs it was asked to shorten
    pub(crate) struct FakeShortener {
        reply: Result<String, ShortenError>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl FakeShortener {
        pub(crate) fn replying(reply: Result<String, ShortenError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ShortenerClient for FakeShortener {
        async fn shorten(
            &self,
            _config: &UrlShortenerConfig,
            original_url: &str,
        ) -> Result<String, ShortenError> {
            self.calls.lock().unwrap().push(original_url.to_string());
            self.reply.clone()
        }
    }

    pub(crate) fn service_with(pool: DynDatabasePool, client: Arc<dyn ShortenerClient>) -> ShortLinkService {
        ShortLinkService::new(
            SqlxShortLinkRepository::boxed(pool.clone()),
            SqlxShortenerConfigRepository::boxed(pool.clone()),
            SqlxShortenerLogRepository::boxed(pool),
            client,
            "https://blog.example.com/",
        )
    }

    async fn setup(client: Arc<dyn ShortenerClient>) -> ShortLinkService {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        service_with(pool, client)
    }

    fn post(language: Language) -> Post {
        let now = Utc::now();
        Post {
            id: 11,
            language,
            title: "Hello".to_string(),
            slug: "hello".to_string(),
            excerpt: None,
            content: "Body".to_string(),
            author: "Lan".to_string(),
            featured_image: None,
            status: PostStatus::Published,
            published_at: Some(now),
            seo_title: None,
            seo_description: None,
            view_count: 0,
            linked_post_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn provider(active: bool) -> UrlShortenerConfigInput {
        UrlShortenerConfigInput {
            provider: "bitly".to_string(),
            endpoint: "https://api.short.example/v4/shorten".to_string(),
            api_key: "token".to_string(),
            http_method: HttpMethod::Post,
            body_format: r#"{"long_url": "{{original_url}}"}"#.to_string(),
            is_active: active,
        }
    }

    #[test]
    fn test_render_body_replaces_first_placeholder() {
        let body = render_body(r#"{"a":"{{original_url}}","b":"{{original_url}}"}"#, "https://x/y");
        assert_eq!(body, r#"{"a":"https://x/y","b":"{{original_url}}"}"#);
    }

    #[test]
    fn test_extract_short_url_field_order() {
        let response = json!({"url": "https://u/3", "link": "https://l/2", "short_url": ""});
        assert_eq!(extract_short_url(&response).unwrap(), "https://l/2");

        let response = json!({"shortUrl": "https://s/1", "url": "https://u/3"});
        assert_eq!(extract_short_url(&response).unwrap(), "https://s/1");

        let response = json!({"id": 5, "url": 7});
        assert_eq!(extract_short_url(&response), Err(ShortenError::NoShortUrl));
    }

    #[test]
    fn test_short_code_of() {
        assert_eq!(short_code_of("https://bit.ly/3xYz").as_deref(), Some("3xYz"));
        assert_eq!(short_code_of("https://s.example/a/b/").as_deref(), Some("b"));
        assert_eq!(short_code_of("not a url/abc").as_deref(), Some("abc"));
        assert_eq!(short_code_of("https://bare.example"), None);
    }

    #[tokio::test]
    async fn test_issue_local_link_without_config() {
        let fake = FakeShortener::replying(Ok("https://never".to_string()));
        let service = setup(fake.clone()).await;

        let link = service.issue_for_post(&post(Language::En)).await.unwrap();

        assert_eq!(link.original_url, "https://blog.example.com/blog/hello");
        let code = link.short_code.clone().unwrap();
        assert_eq!(code.len(), 6);
        assert_eq!(link.short_url, format!("https://blog.example.com/s/{}", code));
        assert_eq!(link.post_id, Some(11));
        assert!(fake.calls.lock().unwrap().is_empty());
        assert!(service.recent_logs(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_config_is_not_called() {
        let fake = FakeShortener::replying(Ok("https://bit.ly/abc".to_string()));
        let service = setup(fake.clone()).await;
        service.save_config(Language::En, &provider(false)).await.unwrap();

        let link = service.issue_for_post(&post(Language::En)).await.unwrap();
        assert!(link.short_url.starts_with("https://blog.example.com/s/"));
        assert!(fake.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_issue_through_active_provider() {
        let fake = FakeShortener::replying(Ok("https://bit.ly/3xYz".to_string()));
        let service = setup(fake.clone()).await;
        service.save_config(Language::En, &provider(true)).await.unwrap();

        let link = service.issue_for_post(&post(Language::En)).await.unwrap();

        assert_eq!(link.short_url, "https://bit.ly/3xYz");
        assert_eq!(link.short_code.as_deref(), Some("3xYz"));
        assert_eq!(
            fake.calls.lock().unwrap().as_slice(),
            ["https://blog.example.com/blog/hello".to_string()]
        );

        let logs = service.recent_logs(Some(Language::En), None).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, LogStatus::Success);
        assert_eq!(logs[0].short_url.as_deref(), Some("https://bit.ly/3xYz"));
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_and_logs() {
        let fake = FakeShortener::replying(Err(ShortenError::NoShortUrl));
        let service = setup(fake.clone()).await;
        service.save_config(Language::Vi, &provider(true)).await.unwrap();

        let link = service.issue_for_post(&post(Language::Vi)).await.unwrap();

        assert!(link.short_url.starts_with("https://blog.example.com/s/"));
        let logs = service.recent_logs(Some(Language::Vi), None).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, LogStatus::Error);
        assert!(logs[0].error_message.as_deref().unwrap().contains("no short URL"));
        assert_eq!(service.list_links().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_test_provider() {
        let fake = FakeShortener::replying(Err(ShortenError::Status(502)));
        let service = setup(fake).await;

        assert!(matches!(
            service.test_provider(Language::En, "https://x").await,
            Err(ShortLinkServiceError::NotFound(_))
        ));

        service.save_config(Language::En, &provider(false)).await.unwrap();
        let result = service.test_provider(Language::En, "https://x").await;
        assert!(matches!(
            result,
            Err(ShortLinkServiceError::Shorten(ShortenError::Status(502)))
        ));
        assert_eq!(service.recent_logs(None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_config_validation() {
        let service = setup(FakeShortener::replying(Err(ShortenError::NoShortUrl))).await;
        let mut input = provider(true);
        input.endpoint = "not a url".to_string();
        assert!(matches!(
            service.save_config(Language::En, &input).await,
            Err(ShortLinkServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_counts_clicks() {
        let service = setup(FakeShortener::replying(Err(ShortenError::NoShortUrl))).await;
        let link = service.issue_for_post(&post(Language::En)).await.unwrap();
        let code = link.short_code.unwrap();

        let first = service.resolve(&code).await.unwrap().unwrap();
        assert_eq!(first.clicks, 1);
        let second = service.resolve(&code).await.unwrap().unwrap();
        assert_eq!(second.clicks, 2);
        assert!(service.resolve("nope00").await.unwrap().is_none());
        assert_eq!(service.link_for_post(11).await.unwrap().unwrap().clicks, 2);
    }
}
