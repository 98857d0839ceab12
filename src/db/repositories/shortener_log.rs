//! URL shortener log repository
//!
//! Append-only record of provider calls in `url_shortener_logs`.

use crate::db::{DynDatabasePool, PoolRef};
use crate::models::{Language, NewUrlShortenerLog, UrlShortenerLog};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait ShortenerLogRepository: Send + Sync {
    /// Append one entry
    async fn append(&self, entry: &NewUrlShortenerLog) -> Result<UrlShortenerLog>;

    /// Newest entries first, optionally for one language
    async fn recent(&self, language: Option<Language>, limit: i64) -> Result<Vec<UrlShortenerLog>>;
}

pub struct SqlxShortenerLogRepository {
    pool: DynDatabasePool,
}

impl SqlxShortenerLogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ShortenerLogRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ShortenerLogRepository for SqlxShortenerLogRepository {
    async fn append(&self, entry: &NewUrlShortenerLog) -> Result<UrlShortenerLog> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO url_shortener_logs (language, test_url, short_url, status, error_message, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;
        let id = match self.pool.handle() {
            PoolRef::Sqlite(pool) => sqlx::query(sql)
                .bind(entry.language.as_str())
                .bind(&entry.test_url)
                .bind(&entry.short_url)
                .bind(entry.status.as_str())
                .bind(&entry.error_message)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to append shortener log")?
                .last_insert_rowid(),
            PoolRef::Mysql(pool) => sqlx::query(sql)
                .bind(entry.language.as_str())
                .bind(&entry.test_url)
                .bind(&entry.short_url)
                .bind(entry.status.as_str())
                .bind(&entry.error_message)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to append shortener log")?
                .last_insert_id() as i64,
        };

        Ok(UrlShortenerLog {
            id,
            language: entry.language,
            test_url: entry.test_url.clone(),
            short_url: entry.short_url.clone(),
            status: entry.status,
            error_message: entry.error_message.clone(),
            created_at: now,
        })
    }

    async fn recent(&self, language: Option<Language>, limit: i64) -> Result<Vec<UrlShortenerLog>> {
        let limit = limit.max(0);
        match (self.pool.handle(), language) {
            (PoolRef::Sqlite(pool), Some(language)) => {
                let rows = sqlx::query(
                    "SELECT * FROM url_shortener_logs WHERE language = ? ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(language.as_str())
                .bind(limit)
                .fetch_all(pool)
                .await
                .context("Failed to read shortener logs")?;
                rows.iter().map(row_to_log_sqlite).collect()
            }
            (PoolRef::Sqlite(pool), None) => {
                let rows = sqlx::query(
                    "SELECT * FROM url_shortener_logs ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(pool)
                .await
                .context("Failed to read shortener logs")?;
                rows.iter().map(row_to_log_sqlite).collect()
            }
            (PoolRef::Mysql(pool), Some(language)) => {
                let rows = sqlx::query(
                    "SELECT * FROM url_shortener_logs WHERE language = ? ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(language.as_str())
                .bind(limit)
                .fetch_all(pool)
                .await
                .context("Failed to read shortener logs")?;
                rows.iter().map(row_to_log_mysql).collect()
            }
            (PoolRef::Mysql(pool), None) => {
                let rows = sqlx::query(
                    "SELECT * FROM url_shortener_logs ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(pool)
                .await
                .context("Failed to read shortener logs")?;
                rows.iter().map(row_to_log_mysql).collect()
            }
        }
    }
}

fn row_to_log_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<UrlShortenerLog> {
    let language: String = row.get("language");
    let status: String = row.get("status");
    Ok(UrlShortenerLog {
        id: row.get("id"),
        language: language.parse().map_err(|e: String| anyhow!(e))?,
        test_url: row.get("test_url"),
        short_url: row.get("short_url"),
        status: status.parse().map_err(|e: String| anyhow!(e))?,
        error_message: row.get("error_message"),
        created_at: row.get("created_at"),
    })
}

fn row_to_log_mysql(row: &sqlx::mysql::MySqlRow) -> Result<UrlShortenerLog> {
    let language: String = row.get("language");
    let status: String = row.get("status");
    Ok(UrlShortenerLog {
        id: row.get("id"),
        language: language.parse().map_err(|e: String| anyhow!(e))?,
        test_url: row.get("test_url"),
        short_url: row.get("short_url"),
        status: status.parse().map_err(|e: String| anyhow!(e))?,
        error_message: row.get("error_message"),
        created_at: row.get("created_at"),
    })
}
