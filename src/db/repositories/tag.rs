//! Tag repository
//!
//! Database operations for tags and the `post_tags` join table.
//!
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL

use crate::db::{DynDatabasePool, PoolRef};
use crate::models::{Language, PostTag, Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row, Sqlite, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// All tags ordered by slug
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Tags whose id is in `ids`
    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>>;

    /// Tags used by published posts of one language, most used first
    async fn get_with_counts(&self, language: Language) -> Result<Vec<TagWithCount>>;

    /// Delete a tag. Returns false if no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Link a tag to a post (no-op if already linked)
    async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<()>;

    /// Remove every tag link of a post
    async fn clear_post(&self, post_id: i64) -> Result<()>;

    /// Join rows for the given posts
    async fn links_for_posts(&self, post_ids: &[i64]) -> Result<Vec<PostTag>>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        let now = Utc::now();
        let id = match self.pool.handle() {
            PoolRef::Sqlite(pool) => create_tag_sqlite(pool, tag, now).await?,
            PoolRef::Mysql(pool) => create_tag_mysql(pool, tag, now).await?,
        };

        Ok(Tag {
            id,
            created_at: now,
            ..tag.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let sql = "SELECT id, slug, name_vi, name_en, created_at FROM tags WHERE id = ?";
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get tag by ID")?;
                Ok(row.as_ref().map(row_to_tag_sqlite))
            }
            PoolRef::Mysql(pool) => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get tag by ID")?;
                Ok(row.as_ref().map(row_to_tag_mysql))
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let sql = "SELECT id, slug, name_vi, name_en, created_at FROM tags WHERE slug = ?";
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                let row = sqlx::query(sql)
                    .bind(slug)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get tag by slug")?;
                Ok(row.as_ref().map(row_to_tag_sqlite))
            }
            PoolRef::Mysql(pool) => {
                let row = sqlx::query(sql)
                    .bind(slug)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get tag by slug")?;
                Ok(row.as_ref().map(row_to_tag_mysql))
            }
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let sql = "SELECT id, slug, name_vi, name_en, created_at FROM tags ORDER BY slug ASC";
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list tags")?;
                Ok(rows.iter().map(row_to_tag_sqlite).collect())
            }
            PoolRef::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list tags")?;
                Ok(rows.iter().map(row_to_tag_mysql).collect())
            }
        }
    }

    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => list_tags_by_ids_sqlite(pool, ids).await,
            PoolRef::Mysql(pool) => list_tags_by_ids_mysql(pool, ids).await,
        }
    }

    async fn get_with_counts(&self, language: Language) -> Result<Vec<TagWithCount>> {
        let sql = r#"
            SELECT t.id, t.slug, t.name_vi, t.name_en, t.created_at, COUNT(pt.post_id) AS post_count
            FROM tags t
            INNER JOIN post_tags pt ON t.id = pt.tag_id
            INNER JOIN posts p ON p.id = pt.post_id
            WHERE p.language = ? AND p.status = 'published'
            GROUP BY t.id, t.slug, t.name_vi, t.name_en, t.created_at
            ORDER BY post_count DESC, t.slug ASC
        "#;
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                let rows = sqlx::query(sql)
                    .bind(language.as_str())
                    .fetch_all(pool)
                    .await
                    .context("Failed to get tags with counts")?;
                Ok(rows
                    .iter()
                    .map(|row| TagWithCount {
                        tag: row_to_tag_sqlite(row),
                        post_count: row.get("post_count"),
                    })
                    .collect())
            }
            PoolRef::Mysql(pool) => {
                let rows = sqlx::query(sql)
                    .bind(language.as_str())
                    .fetch_all(pool)
                    .await
                    .context("Failed to get tags with counts")?;
                Ok(rows
                    .iter()
                    .map(|row| TagWithCount {
                        tag: row_to_tag_mysql(row),
                        post_count: row.get("post_count"),
                    })
                    .collect())
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.handle() {
            PoolRef::Sqlite(pool) => sqlx::query("DELETE FROM tags WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete tag")?
                .rows_affected(),
            PoolRef::Mysql(pool) => sqlx::query("DELETE FROM tags WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete tag")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<()> {
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                    .bind(post_id)
                    .bind(tag_id)
                    .execute(pool)
                    .await
                    .context("Failed to add tag to post")?;
            }
            PoolRef::Mysql(pool) => {
                sqlx::query("INSERT IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                    .bind(post_id)
                    .bind(tag_id)
                    .execute(pool)
                    .await
                    .context("Failed to add tag to post")?;
            }
        }
        Ok(())
    }

    async fn clear_post(&self, post_id: i64) -> Result<()> {
        let sql = "DELETE FROM post_tags WHERE post_id = ?";
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(post_id)
                    .execute(pool)
                    .await
                    .context("Failed to clear post tags")?;
            }
            PoolRef::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(post_id)
                    .execute(pool)
                    .await
                    .context("Failed to clear post tags")?;
            }
        }
        Ok(())
    }

    async fn links_for_posts(&self, post_ids: &[i64]) -> Result<Vec<PostTag>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.handle() {
            PoolRef::Sqlite(pool) => links_for_posts_sqlite(pool, post_ids).await,
            PoolRef::Mysql(pool) => links_for_posts_mysql(pool, post_ids).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, tag: &Tag, now: chrono::DateTime<Utc>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO tags (slug, name_vi, name_en, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&tag.slug)
    .bind(&tag.name_vi)
    .bind(&tag.name_en)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(result.last_insert_rowid())
}

async fn list_tags_by_ids_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Tag>> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id, slug, name_vi, name_en, created_at FROM tags WHERE id IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY slug ASC");

    let rows = qb
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to list tags by IDs")?;
    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn links_for_posts_sqlite(pool: &SqlitePool, post_ids: &[i64]) -> Result<Vec<PostTag>> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT post_id, tag_id FROM post_tags WHERE post_id IN (");
    let mut separated = qb.separated(", ");
    for id in post_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let rows = qb
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to load post tag links")?;
    Ok(rows
        .iter()
        .map(|row| PostTag {
            post_id: row.get("post_id"),
            tag_id: row.get("tag_id"),
        })
        .collect())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        slug: row.get("slug"),
        name_vi: row.get("name_vi"),
        name_en: row.get("name_en"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, tag: &Tag, now: chrono::DateTime<Utc>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO tags (slug, name_vi, name_en, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&tag.slug)
    .bind(&tag.name_vi)
    .bind(&tag.name_en)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(result.last_insert_id() as i64)
}

async fn list_tags_by_ids_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<Vec<Tag>> {
    let mut qb: QueryBuilder<MySql> =
        QueryBuilder::new("SELECT id, slug, name_vi, name_en, created_at FROM tags WHERE id IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY slug ASC");

    let rows = qb
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to list tags by IDs")?;
    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn links_for_posts_mysql(pool: &MySqlPool, post_ids: &[i64]) -> Result<Vec<PostTag>> {
    let mut qb: QueryBuilder<MySql> =
        QueryBuilder::new("SELECT post_id, tag_id FROM post_tags WHERE post_id IN (");
    let mut separated = qb.separated(", ");
    for id in post_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let rows = qb
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to load post tag links")?;
    Ok(rows
        .iter()
        .map(|row| PostTag {
            post_id: row.get("post_id"),
            tag_id: row.get("tag_id"),
        })
        .collect())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        slug: row.get("slug"),
        name_vi: row.get("name_vi"),
        name_en: row.get("name_en"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::post::tests::new_post;
    use crate::db::repositories::{PostRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{PostChanges, PostStatus};

    async fn setup() -> (SqlxPostRepository, SqlxTagRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (
            SqlxPostRepository::new(pool.clone()),
            SqlxTagRepository::new(pool),
        )
    }

    #[tokio::test]
    async fn test_create_and_lookup_tag() {
        let (_posts, repo) = setup().await;

        let created = repo
            .create(&Tag::from_slug("rust".to_string()))
            .await
            .expect("Failed to create tag");
        assert!(created.id > 0);

        let by_slug = repo.get_by_slug("rust").await.unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);
        assert_eq!(by_slug.name_en, "rust");
        assert!(repo.get_by_slug("go").await.unwrap().is_none());
        assert!(repo.get_by_id(created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let (_posts, repo) = setup().await;
        repo.create(&Tag::from_slug("rust".to_string())).await.unwrap();
        assert!(repo.create(&Tag::from_slug("rust".to_string())).await.is_err());
    }

    #[tokio::test]
    async fn test_list_by_ids_and_links() {
        let (posts, repo) = setup().await;
        let post = posts.create(&new_post("A", "a", Language::En)).await.unwrap();
        let other = posts.create(&new_post("B", "b", Language::En)).await.unwrap();

        let rust = repo.create(&Tag::from_slug("rust".to_string())).await.unwrap();
        let go = repo.create(&Tag::from_slug("go".to_string())).await.unwrap();
        repo.create(&Tag::from_slug("zig".to_string())).await.unwrap();

        repo.add_to_post(rust.id, post.id).await.unwrap();
        repo.add_to_post(go.id, post.id).await.unwrap();
        repo.add_to_post(go.id, post.id).await.unwrap();
        repo.add_to_post(go.id, other.id).await.unwrap();

        let links = repo.links_for_posts(&[post.id]).await.unwrap();
        assert_eq!(links.len(), 2);

        let tags = repo.list_by_ids(&[rust.id, go.id]).await.unwrap();
        let slugs: Vec<_> = tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["go", "rust"]);

        assert!(repo.list_by_ids(&[]).await.unwrap().is_empty());
        assert!(repo.links_for_posts(&[]).await.unwrap().is_empty());

        repo.clear_post(post.id).await.unwrap();
        assert!(repo.links_for_posts(&[post.id]).await.unwrap().is_empty());
        assert_eq!(repo.links_for_posts(&[other.id]).await.unwrap().len(), 1);
        // tags survive losing every link
        assert_eq!(repo.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_counts_only_published_posts_of_language() {
        let (posts, repo) = setup().await;
        let published = posts.create(&new_post("P", "p", Language::En)).await.unwrap();
        posts
            .update(
                published.id,
                &PostChanges {
                    status: Some(PostStatus::Published),
                    published_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let draft = posts.create(&new_post("D", "d", Language::En)).await.unwrap();

        let rust = repo.create(&Tag::from_slug("rust".to_string())).await.unwrap();
        repo.add_to_post(rust.id, published.id).await.unwrap();
        repo.add_to_post(rust.id, draft.id).await.unwrap();

        let en = repo.get_with_counts(Language::En).await.unwrap();
        assert_eq!(en.len(), 1);
        assert_eq!(en[0].post_count, 1);
        assert!(repo.get_with_counts(Language::Vi).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_tag() {
        let (_posts, repo) = setup().await;
        let tag = repo.create(&Tag::from_slug("old".to_string())).await.unwrap();
        assert!(repo.delete(tag.id).await.unwrap());
        assert!(!repo.delete(tag.id).await.unwrap());
    }
}
