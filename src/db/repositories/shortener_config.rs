//! URL shortener configuration repository
//!
//! One row per language in `url_shortener_config`; writes are upserts keyed
//! by language.

use crate::db::{DynDatabasePool, PoolRef};
use crate::models::{Language, UrlShortenerConfig, UrlShortenerConfigInput};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait ShortenerConfigRepository: Send + Sync {
    /// Settings for one language, if any were saved
    async fn get(&self, language: Language) -> Result<Option<UrlShortenerConfig>>;

    /// Settings for every language
    async fn list(&self) -> Result<Vec<UrlShortenerConfig>>;

    /// Insert or replace the settings of a language
    async fn upsert(
        &self,
        language: Language,
        input: &UrlShortenerConfigInput,
    ) -> Result<UrlShortenerConfig>;
}

pub struct SqlxShortenerConfigRepository {
    pool: DynDatabasePool,
}

impl SqlxShortenerConfigRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ShortenerConfigRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ShortenerConfigRepository for SqlxShortenerConfigRepository {
    async fn get(&self, language: Language) -> Result<Option<UrlShortenerConfig>> {
        let sql = "SELECT * FROM url_shortener_config WHERE language = ?";
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                let row = sqlx::query(sql)
                    .bind(language.as_str())
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get shortener config")?;
                row.as_ref().map(row_to_config_sqlite).transpose()
            }
            PoolRef::Mysql(pool) => {
                let row = sqlx::query(sql)
                    .bind(language.as_str())
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get shortener config")?;
                row.as_ref().map(row_to_config_mysql).transpose()
            }
        }
    }

    async fn list(&self) -> Result<Vec<UrlShortenerConfig>> {
        let sql = "SELECT * FROM url_shortener_config ORDER BY language ASC";
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list shortener configs")?;
                rows.iter().map(row_to_config_sqlite).collect()
            }
            PoolRef::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list shortener configs")?;
                rows.iter().map(row_to_config_mysql).collect()
            }
        }
    }

    async fn upsert(
        &self,
        language: Language,
        input: &UrlShortenerConfigInput,
    ) -> Result<UrlShortenerConfig> {
        let now = Utc::now();
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO url_shortener_config
                        (language, provider, endpoint, api_key, http_method, body_format, is_active, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(language) DO UPDATE SET
                        provider = excluded.provider,
                        endpoint = excluded.endpoint,
                        api_key = excluded.api_key,
                        http_method = excluded.http_method,
                        body_format = excluded.body_format,
                        is_active = excluded.is_active,
                        updated_at = excluded.updated_at
                    "#,
                )
                .bind(language.as_str())
                .bind(&input.provider)
                .bind(&input.endpoint)
                .bind(&input.api_key)
                .bind(input.http_method.as_str())
                .bind(&input.body_format)
                .bind(input.is_active)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to save shortener config")?;
            }
            PoolRef::Mysql(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO url_shortener_config
                        (language, provider, endpoint, api_key, http_method, body_format, is_active, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON DUPLICATE KEY UPDATE
                        provider = VALUES(provider),
                        endpoint = VALUES(endpoint),
                        api_key = VALUES(api_key),
                        http_method = VALUES(http_method),
                        body_format = VALUES(body_format),
                        is_active = VALUES(is_active),
                        updated_at = VALUES(updated_at)
                    "#,
                )
                .bind(language.as_str())
                .bind(&input.provider)
                .bind(&input.endpoint)
                .bind(&input.api_key)
                .bind(input.http_method.as_str())
                .bind(&input.body_format)
                .bind(input.is_active)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to save shortener config")?;
            }
        }

        self.get(language)
            .await?
            .ok_or_else(|| anyhow!("Shortener config missing after save"))
    }
}

fn row_to_config_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<UrlShortenerConfig> {
    let language: String = row.get("language");
    let method: String = row.get("http_method");
    Ok(UrlShortenerConfig {
        id: row.get("id"),
        language: language.parse().map_err(|e: String| anyhow!(e))?,
        provider: row.get("provider"),
        endpoint: row.get("endpoint"),
        api_key: row.get("api_key"),
        http_method: method.parse().map_err(|e: String| anyhow!(e))?,
        body_format: row.get("body_format"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_config_mysql(row: &sqlx::mysql::MySqlRow) -> Result<UrlShortenerConfig> {
    let language: String = row.get("language");
    let method: String = row.get("http_method");
    Ok(UrlShortenerConfig {
        id: row.get("id"),
        language: language.parse().map_err(|e: String| anyhow!(e))?,
        provider: row.get("provider"),
        endpoint: row.get("endpoint"),
        api_key: row.get("api_key"),
        http_method: method.parse().map_err(|e: String| anyhow!(e))?,
        body_format: row.get("body_format"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
