//! Post repository
//!
//! Database operations for the `posts` table.
//!
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL

use crate::db::{DynDatabasePool, PoolRef};
use crate::models::{NewPost, Post, PostChanges};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const POST_COLUMNS: &str = "id, language, title, slug, excerpt, content, author, featured_image, \
     status, published_at, seo_title, seo_description, view_count, linked_post_id, created_at, updated_at";

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post, returning it with its assigned id and timestamps
    async fn create(&self, post: &NewPost) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// All posts, newest first
    async fn list(&self) -> Result<Vec<Post>>;

    /// Apply a sparse update and bump `updated_at`
    async fn update(&self, id: i64, changes: &PostChanges) -> Result<Post>;

    /// Delete a post. Returns false if no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Increment the view counter. Returns false if no row matched.
    async fn increment_view_count(&self, id: i64) -> Result<bool>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        let now = Utc::now();
        let id = match self.pool.handle() {
            PoolRef::Sqlite(pool) => insert_post_sqlite(pool, post, now).await?,
            PoolRef::Mysql(pool) => insert_post_mysql(pool, post, now).await?,
        };

        Ok(Post {
            id,
            language: post.language,
            title: post.title.clone(),
            slug: post.slug.clone(),
            excerpt: post.excerpt.clone(),
            content: post.content.clone(),
            author: post.author.clone(),
            featured_image: post.featured_image.clone(),
            status: post.status,
            published_at: post.published_at,
            seo_title: post.seo_title.clone(),
            seo_description: post.seo_description.clone(),
            view_count: 0,
            linked_post_id: post.linked_post_id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => get_post_by_id_sqlite(pool, id).await,
            PoolRef::Mysql(pool) => get_post_by_id_mysql(pool, id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Post>> {
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => list_posts_sqlite(pool).await,
            PoolRef::Mysql(pool) => list_posts_mysql(pool).await,
        }
    }

    async fn update(&self, id: i64, changes: &PostChanges) -> Result<Post> {
        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("Post not found: {}", id))?;
        let updated = apply_changes(existing, changes, Utc::now());

        match self.pool.handle() {
            PoolRef::Sqlite(pool) => write_post_sqlite(pool, &updated).await?,
            PoolRef::Mysql(pool) => write_post_mysql(pool, &updated).await?,
        }
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // post_tags and comments rows go with it (ON DELETE CASCADE)
        let affected = match self.pool.handle() {
            PoolRef::Sqlite(pool) => sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
            PoolRef::Mysql(pool) => sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn increment_view_count(&self, id: i64) -> Result<bool> {
        let sql = "UPDATE posts SET view_count = view_count + 1 WHERE id = ?";
        let affected = match self.pool.handle() {
            PoolRef::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to increment view count")?
                .rows_affected(),
            PoolRef::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to increment view count")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

/// Merge a sparse update into an existing row
fn apply_changes(mut post: Post, changes: &PostChanges, now: DateTime<Utc>) -> Post {
    if let Some(language) = changes.language {
        post.language = language;
    }
    if let Some(title) = &changes.title {
        post.title = title.clone();
    }
    if let Some(excerpt) = &changes.excerpt {
        post.excerpt = non_empty(excerpt);
    }
    if let Some(content) = &changes.content {
        post.content = content.clone();
    }
    if let Some(author) = &changes.author {
        post.author = author.clone();
    }
    if let Some(image) = &changes.featured_image {
        post.featured_image = non_empty(image);
    }
    if let Some(status) = changes.status {
        post.status = status;
    }
    if let Some(published_at) = changes.published_at {
        post.published_at = Some(published_at);
    }
    if let Some(seo_title) = &changes.seo_title {
        post.seo_title = non_empty(seo_title);
    }
    if let Some(seo_description) = &changes.seo_description {
        post.seo_description = non_empty(seo_description);
    }
    if let Some(linked) = changes.linked_post_id {
        post.linked_post_id = Some(linked);
    }
    post.updated_at = now.max(post.created_at);
    post
}

/// Empty strings clear a nullable column
fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_post_sqlite(pool: &SqlitePool, post: &NewPost, now: DateTime<Utc>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (language, title, slug, excerpt, content, author, featured_image, status,
                           published_at, seo_title, seo_description, view_count, linked_post_id,
                           created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(post.language.as_str())
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.author)
    .bind(&post.featured_image)
    .bind(post.status.as_str())
    .bind(post.published_at)
    .bind(&post.seo_title)
    .bind(&post.seo_description)
    .bind(post.linked_post_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(result.last_insert_rowid())
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.as_ref().map(row_to_post_sqlite).transpose()
}

async fn list_posts_sqlite(pool: &SqlitePool) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts ORDER BY created_at DESC, id DESC",
        POST_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn write_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE posts
        SET language = ?, title = ?, excerpt = ?, content = ?, author = ?, featured_image = ?,
            status = ?, published_at = ?, seo_title = ?, seo_description = ?, linked_post_id = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(post.language.as_str())
    .bind(&post.title)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.author)
    .bind(&post.featured_image)
    .bind(post.status.as_str())
    .bind(post.published_at)
    .bind(&post.seo_title)
    .bind(&post.seo_description)
    .bind(post.linked_post_id)
    .bind(post.updated_at)
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let language: String = row.get("language");
    let status: String = row.get("status");

    Ok(Post {
        id: row.get("id"),
        language: language.parse().map_err(|e: String| anyhow!(e))?,
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        author: row.get("author"),
        featured_image: row.get("featured_image"),
        status: status.parse().map_err(|e: String| anyhow!(e))?,
        published_at: row.get("published_at"),
        seo_title: row.get("seo_title"),
        seo_description: row.get("seo_description"),
        view_count: row.get("view_count"),
        linked_post_id: row.get("linked_post_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_post_mysql(pool: &MySqlPool, post: &NewPost, now: DateTime<Utc>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (language, title, slug, excerpt, content, author, featured_image, status,
                           published_at, seo_title, seo_description, view_count, linked_post_id,
                           created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(post.language.as_str())
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.author)
    .bind(&post.featured_image)
    .bind(post.status.as_str())
    .bind(post.published_at)
    .bind(&post.seo_title)
    .bind(&post.seo_description)
    .bind(post.linked_post_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(result.last_insert_id() as i64)
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.as_ref().map(row_to_post_mysql).transpose()
}

async fn list_posts_mysql(pool: &MySqlPool) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts ORDER BY created_at DESC, id DESC",
        POST_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn write_post_mysql(pool: &MySqlPool, post: &Post) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE posts
        SET language = ?, title = ?, excerpt = ?, content = ?, author = ?, featured_image = ?,
            status = ?, published_at = ?, seo_title = ?, seo_description = ?, linked_post_id = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(post.language.as_str())
    .bind(&post.title)
    .bind(&post.excerpt)
    .bind(&post.content)
    .bind(&post.author)
    .bind(&post.featured_image)
    .bind(post.status.as_str())
    .bind(post.published_at)
    .bind(&post.seo_title)
    .bind(&post.seo_description)
    .bind(post.linked_post_id)
    .bind(post.updated_at)
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(())
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let language: String = row.get("language");
    let status: String = row.get("status");

    Ok(Post {
        id: row.get("id"),
        language: language.parse().map_err(|e: String| anyhow!(e))?,
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        author: row.get("author"),
        featured_image: row.get("featured_image"),
        status: status.parse().map_err(|e: String| anyhow!(e))?,
        published_at: row.get("published_at"),
        seo_title: row.get("seo_title"),
        seo_description: row.get("seo_description"),
        view_count: row.get("view_count"),
        linked_post_id: row.get("linked_post_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
