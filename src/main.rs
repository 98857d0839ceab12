//! Songngu - bilingual blog content service

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use songngu::{
    api::{self, AppState, RequestStats},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxShortLinkRepository, SqlxShortenerConfigRepository, SqlxShortenerLogRepository,
        },
    },
    services::{ContentStore, GeminiTranslator, HttpShortenerClient, ShortLinkService},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "songngu=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting songngu...");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let shortener_client = Arc::new(HttpShortenerClient::new(Duration::from_secs(
        config.shortener.timeout_seconds,
    ))?);
    let short_links = Arc::new(ShortLinkService::new(
        SqlxShortLinkRepository::boxed(pool.clone()),
        SqlxShortenerConfigRepository::boxed(pool.clone()),
        SqlxShortenerLogRepository::boxed(pool.clone()),
        shortener_client,
        config.site.base(),
    ));

    let mut store = ContentStore::new(pool.clone(), short_links);
    let translator = GeminiTranslator::new(&config.translation)?;
    if translator.is_configured() {
        tracing::info!("Translation enabled ({})", config.translation.model);
        store = store.with_translator(Arc::new(translator));
    } else {
        tracing::warn!("No translation API key configured, translation is disabled");
    }
    let store = Arc::new(store);

    match store.load_all().await {
        Ok(snapshot) => tracing::info!("Loaded {} posts", snapshot.posts.len()),
        Err(e) => tracing::warn!("Initial content load failed, serving empty snapshot: {}", e),
    }

    let state = AppState {
        pool: pool.clone(),
        store,
        request_stats: Arc::new(RequestStats::new()),
    };

    let app = api::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
