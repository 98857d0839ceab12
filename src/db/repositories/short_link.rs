//! Short link repository
//!
//! Database operations for the `shortened_urls` table.

use crate::db::{DynDatabasePool, PoolRef};
use crate::models::{NewShortLink, ShortLink};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Short link repository trait
#[async_trait]
pub trait ShortLinkRepository: Send + Sync {
    /// Store a newly issued short link
    async fn create(&self, link: &NewShortLink) -> Result<ShortLink>;

    /// Most recent link issued for a post
    async fn get_by_post(&self, post_id: i64) -> Result<Option<ShortLink>>;

    /// Link with the given short code
    async fn get_by_code(&self, code: &str) -> Result<Option<ShortLink>>;

    /// All links, newest first
    async fn list(&self) -> Result<Vec<ShortLink>>;

    /// Count one resolution of the link
    async fn increment_clicks(&self, id: i64) -> Result<()>;
}

/// SQLx-based short link repository implementation
pub struct SqlxShortLinkRepository {
    pool: DynDatabasePool,
}

impl SqlxShortLinkRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ShortLinkRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ShortLinkRepository for SqlxShortLinkRepository {
    async fn create(&self, link: &NewShortLink) -> Result<ShortLink> {
        let now = Utc::now();
        let id = match self.pool.handle() {
            PoolRef::Sqlite(pool) => create_link_sqlite(pool, link, now).await?,
            PoolRef::Mysql(pool) => create_link_mysql(pool, link, now).await?,
        };

        Ok(ShortLink {
            id,
            original_url: link.original_url.clone(),
            short_url: link.short_url.clone(),
            short_code: link.short_code.clone(),
            language: link.language,
            post_id: link.post_id,
            clicks: 0,
            created_at: now,
        })
    }

    async fn get_by_post(&self, post_id: i64) -> Result<Option<ShortLink>> {
        let sql = "SELECT * FROM shortened_urls WHERE post_id = ? ORDER BY created_at DESC, id DESC LIMIT 1";
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                let row = sqlx::query(sql)
                    .bind(post_id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get short link by post")?;
                row.as_ref().map(row_to_link_sqlite).transpose()
            }
            PoolRef::Mysql(pool) => {
                let row = sqlx::query(sql)
                    .bind(post_id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get short link by post")?;
                row.as_ref().map(row_to_link_mysql).transpose()
            }
        }
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        let sql = "SELECT * FROM shortened_urls WHERE short_code = ? ORDER BY id DESC LIMIT 1";
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                let row = sqlx::query(sql)
                    .bind(code)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get short link by code")?;
                row.as_ref().map(row_to_link_sqlite).transpose()
            }
            PoolRef::Mysql(pool) => {
                let row = sqlx::query(sql)
                    .bind(code)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get short link by code")?;
                row.as_ref().map(row_to_link_mysql).transpose()
            }
        }
    }

    async fn list(&self) -> Result<Vec<ShortLink>> {
        let sql = "SELECT * FROM shortened_urls ORDER BY created_at DESC, id DESC";
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list short links")?;
                rows.iter().map(row_to_link_sqlite).collect()
            }
            PoolRef::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list short links")?;
                rows.iter().map(row_to_link_mysql).collect()
            }
        }
    }

    async fn increment_clicks(&self, id: i64) -> Result<()> {
        let sql = "UPDATE shortened_urls SET clicks = clicks + 1 WHERE id = ?";
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to increment clicks")?;
            }
            PoolRef::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to increment clicks")?;
            }
        }
        Ok(())
    }
}

async fn create_link_sqlite(pool: &SqlitePool, link: &NewShortLink, now: DateTime<Utc>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO shortened_urls (original_url, short_url, short_code, language, post_id, clicks, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&link.original_url)
    .bind(&link.short_url)
    .bind(&link.short_code)
    .bind(link.language.as_str())
    .bind(link.post_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create short link")?;

    Ok(result.last_insert_rowid())
}

fn row_to_link_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<ShortLink> {
    let language: String = row.get("language");
    Ok(ShortLink {
        id: row.get("id"),
        original_url: row.get("original_url"),
        short_url: row.get("short_url"),
        short_code: row.get("short_code"),
        language: language.parse().map_err(|e: String| anyhow!(e))?,
        post_id: row.get("post_id"),
        clicks: row.get("clicks"),
        created_at: row.get("created_at"),
    })
}

async fn create_link_mysql(pool: &MySqlPool, link: &NewShortLink, now: DateTime<Utc>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO shortened_urls (original_url, short_url, short_code, language, post_id, clicks, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&link.original_url)
    .bind(&link.short_url)
    .bind(&link.short_code)
    .bind(link.language.as_str())
    .bind(link.post_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create short link")?;

    Ok(result.last_insert_id() as i64)
}

fn row_to_link_mysql(row: &sqlx::mysql::MySqlRow) -> Result<ShortLink> {
    let language: String = row.get("language");
    Ok(ShortLink {
        id: row.get("id"),
        original_url: row.get("original_url"),
        short_url: row.get("short_url"),
        short_code: row.get("short_code"),
        language: language.parse().map_err(|e: String| anyhow!(e))?,
        post_id: row.get("post_id"),
        clicks: row.get("clicks"),
        created_at: row.get("created_at"),
    })
}
