//! Comment repository

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, MySqlPool, QueryBuilder, Row, Sqlite, SqlitePool};
use std::sync::Arc;

use crate::db::{DynDatabasePool, PoolRef};
use crate::models::{Comment, CommentStatus, CommentWithPost, CreateCommentInput};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Add a visible comment to a post. Fails if the post does not exist.
    async fn create(&self, post_id: i64, input: &CreateCommentInput) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Visible comments of the given posts, oldest first
    async fn list_visible_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Comment>>;

    /// Every comment with its post title, newest first
    async fn list_all(&self) -> Result<Vec<CommentWithPost>>;

    /// Update comment status
    async fn update_status(&self, id: i64, status: CommentStatus) -> Result<bool>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Number of visible comments on a post
    async fn count_visible(&self, post_id: i64) -> Result<i64>;
}

/// Comment repository implementation
pub struct CommentRepositoryImpl {
    pool: DynDatabasePool,
}

impl CommentRepositoryImpl {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for CommentRepositoryImpl {
    async fn create(&self, post_id: i64, input: &CreateCommentInput) -> Result<Comment> {
        let now = Utc::now();
        let id = match self.pool.handle() {
            PoolRef::Sqlite(pool) => create_sqlite(pool, post_id, input, now).await?,
            PoolRef::Mysql(pool) => create_mysql(pool, post_id, input, now).await?,
        };

        Ok(Comment {
            id,
            post_id,
            author_name: input.author_name.clone(),
            author_email: input.author_email.clone(),
            content: input.content.clone(),
            status: CommentStatus::Visible,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => get_by_id_sqlite(pool, id).await,
            PoolRef::Mysql(pool) => get_by_id_mysql(pool, id).await,
        }
    }

    async fn list_visible_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Comment>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => list_visible_sqlite(pool, post_ids).await,
            PoolRef::Mysql(pool) => list_visible_mysql(pool, post_ids).await,
        }
    }

    async fn list_all(&self) -> Result<Vec<CommentWithPost>> {
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => list_all_sqlite(pool).await,
            PoolRef::Mysql(pool) => list_all_mysql(pool).await,
        }
    }

    async fn update_status(&self, id: i64, status: CommentStatus) -> Result<bool> {
        let sql = "UPDATE comments SET status = ? WHERE id = ?";
        let affected = match self.pool.handle() {
            PoolRef::Sqlite(pool) => sqlx::query(sql)
                .bind(status.as_str())
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to update comment status")?
                .rows_affected(),
            PoolRef::Mysql(pool) => sqlx::query(sql)
                .bind(status.as_str())
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to update comment status")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.handle() {
            PoolRef::Sqlite(pool) => sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
            PoolRef::Mysql(pool) => sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn count_visible(&self, post_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS cnt FROM comments WHERE post_id = ? AND status = 'visible'";
        let count = match self.pool.handle() {
            PoolRef::Sqlite(pool) => sqlx::query(sql)
                .bind(post_id)
                .fetch_one(pool)
                .await
                .context("Failed to count comments")?
                .get("cnt"),
            PoolRef::Mysql(pool) => sqlx::query(sql)
                .bind(post_id)
                .fetch_one(pool)
                .await
                .context("Failed to count comments")?
                .get("cnt"),
        };
        Ok(count)
    }
}

// SQLite implementations

async fn create_sqlite(
    pool: &SqlitePool,
    post_id: i64,
    input: &CreateCommentInput,
    now: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"INSERT INTO comments (post_id, author_name, author_email, content, status, created_at)
           VALUES (?, ?, ?, ?, 'visible', ?)"#,
    )
    .bind(post_id)
    .bind(&input.author_name)
    .bind(&input.author_email)
    .bind(&input.content)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(result.last_insert_rowid())
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;
    row.as_ref().map(row_to_comment_sqlite).transpose()
}

async fn list_visible_sqlite(pool: &SqlitePool, post_ids: &[i64]) -> Result<Vec<Comment>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT * FROM comments WHERE status = 'visible' AND post_id IN (",
    );
    let mut separated = qb.separated(", ");
    for id in post_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY created_at ASC, id ASC");

    let rows = qb
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to load comments")?;
    rows.iter().map(row_to_comment_sqlite).collect()
}

async fn list_all_sqlite(pool: &SqlitePool) -> Result<Vec<CommentWithPost>> {
    let rows = sqlx::query(
        r#"SELECT c.*, p.title AS post_title
           FROM comments c
           LEFT JOIN posts p ON c.post_id = p.id
           ORDER BY c.created_at DESC, c.id DESC"#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list comments")?;

    rows.iter()
        .map(|row| {
            Ok(CommentWithPost {
                comment: row_to_comment_sqlite(row)?,
                post_title: row.get("post_title"),
            })
        })
        .collect()
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    let status: String = row.get("status");
    Ok(Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_name: row.get("author_name"),
        author_email: row.get("author_email"),
        content: row.get("content"),
        status: status.parse().map_err(|e: String| anyhow!(e))?,
        created_at: row.get("created_at"),
    })
}

// MySQL implementations

async fn create_mysql(
    pool: &MySqlPool,
    post_id: i64,
    input: &CreateCommentInput,
    now: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"INSERT INTO comments (post_id, author_name, author_email, content, status, created_at)
           VALUES (?, ?, ?, ?, 'visible', ?)"#,
    )
    .bind(post_id)
    .bind(&input.author_name)
    .bind(&input.author_email)
    .bind(&input.content)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(result.last_insert_id() as i64)
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;
    row.as_ref().map(row_to_comment_mysql).transpose()
}

async fn list_visible_mysql(pool: &MySqlPool, post_ids: &[i64]) -> Result<Vec<Comment>> {
    let mut qb: QueryBuilder<MySql> = QueryBuilder::new(
        "SELECT * FROM comments WHERE status = 'visible' AND post_id IN (",
    );
    let mut separated = qb.separated(", ");
    for id in post_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY created_at ASC, id ASC");

    let rows = qb
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to load comments")?;
    rows.iter().map(row_to_comment_mysql).collect()
}

async fn list_all_mysql(pool: &MySqlPool) -> Result<Vec<CommentWithPost>> {
    let rows = sqlx::query(
        r#"SELECT c.*, p.title AS post_title
           FROM comments c
           LEFT JOIN posts p ON c.post_id = p.id
           ORDER BY c.created_at DESC, c.id DESC"#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list comments")?;

    rows.iter()
        .map(|row| {
            Ok(CommentWithPost {
                comment: row_to_comment_mysql(row)?,
                post_title: row.get("post_title"),
            })
        })
        .collect()
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Comment> {
    let status: String = row.get("status");
    Ok(Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_name: row.get("author_name"),
        author_email: row.get("author_email"),
        content: row.get("content"),
        status: status.parse().map_err(|e: String| anyhow!(e))?,
        created_at: row.get("created_at"),
    })
}
