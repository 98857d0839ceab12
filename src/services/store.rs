//! Content store
//!
//! Owns the in-process snapshot of every post in both languages, each with
//! its tags and visible comments. The snapshot is an immutable value that is
//! replaced wholesale by [`ContentStore::load_all`]; every mutation writes
//! through the repositories and then reloads, so readers always see either
//! the previous or the next complete snapshot.
//!
//! Query methods live on [`Snapshot`] and do no I/O.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::repositories::{
    CommentRepository, CommentRepositoryImpl, PostRepository, SqlxPostRepository,
    SqlxTagRepository, TagRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{
    Comment, CommentStatus, CreateCommentInput, CreatePostInput, Language, NewPost, Post,
    PostChanges, PostStatus, PostWithRelations, Tag, UpdatePostInput,
};
use crate::services::comment::{CommentService, CommentServiceError};
use crate::services::short_link::{ShortLinkService, ShortLinkServiceError};
use crate::services::slug::title_to_slug;
use crate::services::tag::{normalize_tag_list, TagService, TagServiceError};
use crate::services::translation::{TranslationRequest, Translator};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Any repository failure; constraint violations are not told apart
    #[error("Operation failed: {0:#}")]
    Gateway(#[from] anyhow::Error),

    #[error("Translation failed: {0}")]
    Translation(String),
}

impl From<TagServiceError> for StoreError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::NotFound(msg) => StoreError::NotFound(format!("Tag {}", msg)),
            TagServiceError::ValidationError(msg) => StoreError::ValidationError(msg),
            TagServiceError::InternalError(e) => StoreError::Gateway(e),
        }
    }
}

impl From<CommentServiceError> for StoreError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::NotFound(id) => StoreError::NotFound(format!("Comment {}", id)),
            CommentServiceError::InternalError(e) => StoreError::Gateway(e),
        }
    }
}

impl From<ShortLinkServiceError> for StoreError {
    fn from(err: ShortLinkServiceError) -> Self {
        match err {
            ShortLinkServiceError::NotFound(msg) => StoreError::NotFound(msg),
            ShortLinkServiceError::ValidationError(msg) => StoreError::ValidationError(msg),
            ShortLinkServiceError::Shorten(e) => StoreError::Gateway(anyhow!(e)),
            ShortLinkServiceError::InternalError(e) => StoreError::Gateway(e),
        }
    }
}

/// Complete view of posts, tags and visible comments at one point in time
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    /// Newest first
    pub posts: Vec<PostWithRelations>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// First post with the slug, in either language
    pub fn get_post_by_slug(&self, slug: &str) -> Option<&PostWithRelations> {
        self.posts.iter().find(|p| p.post.slug == slug)
    }

    pub fn get_post_by_slug_in(&self, slug: &str, language: Language) -> Option<&PostWithRelations> {
        self.posts
            .iter()
            .find(|p| p.post.slug == slug && p.post.language == language)
    }

    pub fn get_post_by_id(&self, id: i64) -> Option<&PostWithRelations> {
        self.posts.iter().find(|p| p.post.id == id)
    }

    /// Every post in a language, drafts included
    pub fn get_posts_by_language(&self, language: Language) -> Vec<&PostWithRelations> {
        self.posts
            .iter()
            .filter(|p| p.post.language == language)
            .collect()
    }

    fn published_in(&self, language: Language) -> impl Iterator<Item = &PostWithRelations> {
        self.posts
            .iter()
            .filter(move |p| p.post.language == language && p.post.is_published())
    }

    /// Published posts whose title, excerpt or content contains `query`,
    /// ignoring case. An empty query matches every published post.
    pub fn search_posts(&self, query: &str, language: Language) -> Vec<&PostWithRelations> {
        let needle = query.to_lowercase();
        self.published_in(language)
            .filter(|p| matches_query(&p.post, &needle))
            .collect()
    }

    pub fn get_posts_by_tag(&self, tag_slug: &str, language: Language) -> Vec<&PostWithRelations> {
        self.published_in(language)
            .filter(|p| p.has_tag(tag_slug))
            .collect()
    }

    /// Sorted, deduplicated tag slugs of published posts
    pub fn get_all_tags(&self, language: Language) -> Vec<String> {
        let mut slugs: Vec<String> = self
            .published_in(language)
            .flat_map(|p| p.tag_slugs())
            .map(str::to_string)
            .collect();
        slugs.sort();
        slugs.dedup();
        slugs
    }

    /// Drop a post and clear translation links that pointed at it
    fn without_post(&self, id: i64) -> Snapshot {
        let posts = self
            .posts
            .iter()
            .filter(|p| p.post.id != id)
            .cloned()
            .map(|mut p| {
                if p.post.linked_post_id == Some(id) {
                    p.post.linked_post_id = None;
                }
                p
            })
            .collect();
        Snapshot {
            posts,
            loaded_at: self.loaded_at,
        }
    }
}

fn matches_query(post: &Post, needle: &str) -> bool {
    post.title.to_lowercase().contains(needle)
        || post
            .excerpt
            .as_deref()
            .is_some_and(|e| e.to_lowercase().contains(needle))
        || post.content.to_lowercase().contains(needle)
}

fn required(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::ValidationError(format!("{} is required", field)));
    }
    Ok(())
}

/// Trimmed optional text; blank becomes `None`
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Content store
pub struct ContentStore {
    posts: Arc<dyn PostRepository>,
    tag_repo: Arc<dyn TagRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    tags: TagService,
    comments: CommentService,
    short_links: Arc<ShortLinkService>,
    translator: Option<Arc<dyn Translator>>,
    snapshot: RwLock<Arc<Snapshot>>,
    loading: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl ContentStore {
    pub fn new(pool: DynDatabasePool, short_links: Arc<ShortLinkService>) -> Self {
        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        let comment_repo = CommentRepositoryImpl::boxed(pool.clone());
        Self {
            posts: SqlxPostRepository::boxed(pool),
            tags: TagService::new(tag_repo.clone()),
            comments: CommentService::new(comment_repo.clone()),
            tag_repo,
            comment_repo,
            short_links,
            translator: None,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            loading: AtomicBool::new(false),
            last_error: RwLock::new(None),
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Message of the last failed load, cleared by the next successful one
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn tags(&self) -> &TagService {
        &self.tags
    }

    pub fn comments(&self) -> &CommentService {
        &self.comments
    }

    pub fn short_links(&self) -> &ShortLinkService {
        &self.short_links
    }

    fn replace_snapshot(&self, snapshot: Arc<Snapshot>) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    fn set_last_error(&self, error: Option<String>) {
        *self.last_error.write().unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Rebuild the snapshot from the database.
    ///
    /// On failure the previous snapshot is kept and `last_error` is set.
    pub async fn load_all(&self) -> Result<Arc<Snapshot>, StoreError> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.fetch_snapshot().await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.replace_snapshot(snapshot.clone());
                self.set_last_error(None);
                tracing::debug!("Loaded {} posts", snapshot.posts.len());
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!("Failed to load content: {:#}", e);
                self.set_last_error(Some(format!("{:#}", e)));
                Err(StoreError::Gateway(e))
            }
        }
    }

    async fn fetch_snapshot(&self) -> anyhow::Result<Snapshot> {
        let posts = self.posts.list().await.context("Failed to fetch posts")?;
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();

        let links = self
            .tag_repo
            .links_for_posts(&ids)
            .await
            .context("Failed to fetch post tags")?;
        let mut tag_ids: Vec<i64> = links.iter().map(|l| l.tag_id).collect();
        tag_ids.sort_unstable();
        tag_ids.dedup();
        let tags_by_id: HashMap<i64, Tag> = self
            .tag_repo
            .list_by_ids(&tag_ids)
            .await
            .context("Failed to fetch tags")?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        let mut tags_by_post: HashMap<i64, Vec<Tag>> = HashMap::new();
        for link in &links {
            if let Some(tag) = tags_by_id.get(&link.tag_id) {
                tags_by_post.entry(link.post_id).or_default().push(tag.clone());
            }
        }

        let mut comments_by_post: HashMap<i64, Vec<Comment>> = HashMap::new();
        for comment in self
            .comment_repo
            .list_visible_for_posts(&ids)
            .await
            .context("Failed to fetch comments")?
        {
            comments_by_post.entry(comment.post_id).or_default().push(comment);
        }

        let posts = posts
            .into_iter()
            .map(|post| {
                let mut tags = tags_by_post.remove(&post.id).unwrap_or_default();
                tags.sort_by(|a, b| a.slug.cmp(&b.slug));
                PostWithRelations {
                    comments: comments_by_post.remove(&post.id).unwrap_or_default(),
                    tags,
                    post,
                }
            })
            .collect();

        Ok(Snapshot {
            posts,
            loaded_at: Some(Utc::now()),
        })
    }

    /// Reload and return the post from the fresh snapshot
    async fn reload_post(&self, id: i64) -> Result<PostWithRelations, StoreError> {
        let snapshot = self.load_all().await?;
        snapshot
            .get_post_by_id(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Post {}", id)))
    }

    /// Insert a post with its tags and short link.
    ///
    /// If anything after the insert fails the post row is deleted again
    /// before the error is returned.
    async fn insert_post(&self, new_post: &NewPost, tag_texts: &[String]) -> Result<Post, StoreError> {
        let post = self
            .posts
            .create(new_post)
            .await
            .context("Failed to create post")?;

        if let Err(e) = self.attach_post(&post, tag_texts).await {
            tracing::warn!("Rolling back post {} after failure: {}", post.id, e);
            if let Err(cleanup) = self.posts.delete(post.id).await {
                tracing::error!("Failed to remove post {}: {:#}", post.id, cleanup);
            }
            return Err(e);
        }
        Ok(post)
    }

    async fn attach_post(&self, post: &Post, tag_texts: &[String]) -> Result<(), StoreError> {
        self.tags.link_post_tags(post.id, tag_texts).await?;
        self.short_links.issue_for_post(post).await?;
        Ok(())
    }

    /// Create a post, its tags and its short link, then reload.
    ///
    /// # Errors
    /// - `ValidationError` for a blank title, content or author, a title
    ///   without slug characters, or no usable tag
    pub async fn create_post(&self, input: CreatePostInput) -> Result<PostWithRelations, StoreError> {
        required("Title", &input.title)?;
        required("Content", &input.content)?;
        required("Author", &input.author)?;
        if normalize_tag_list(&input.tags).is_empty() {
            return Err(StoreError::ValidationError(
                "At least one tag is required".to_string(),
            ));
        }
        let slug = title_to_slug(&input.title);
        if slug.is_empty() {
            return Err(StoreError::ValidationError(format!(
                "Title '{}' does not produce a slug",
                input.title
            )));
        }

        let published_at = (input.status == PostStatus::Published).then(Utc::now);
        let new_post = NewPost {
            language: input.language,
            title: input.title.trim().to_string(),
            slug,
            excerpt: non_blank(input.excerpt),
            content: input.content,
            author: input.author.trim().to_string(),
            featured_image: non_blank(input.featured_image),
            status: input.status,
            published_at,
            seo_title: non_blank(input.seo_title),
            seo_description: non_blank(input.seo_description),
            linked_post_id: None,
        };

        let post = self.insert_post(&new_post, &input.tags).await?;
        tracing::info!("Created post {} ({}, {})", post.id, post.slug, post.language);
        self.reload_post(post.id).await
    }

    /// Apply the fields present in `input`, then reload.
    ///
    /// The slug never changes. Moving from draft to published stamps
    /// `published_at`; `tags`, when present, replaces the whole tag set.
    pub async fn update_post(
        &self,
        id: i64,
        input: UpdatePostInput,
    ) -> Result<PostWithRelations, StoreError> {
        let existing = self
            .posts
            .get_by_id(id)
            .await
            .context("Failed to load post")?
            .ok_or_else(|| StoreError::NotFound(format!("Post {}", id)))?;

        if let Some(title) = &input.title {
            required("Title", title)?;
        }
        if let Some(content) = &input.content {
            required("Content", content)?;
        }
        if let Some(author) = &input.author {
            required("Author", author)?;
        }

        let publishing = input.status == Some(PostStatus::Published) && !existing.is_published();
        let changes = PostChanges {
            language: input.language,
            title: input.title.map(|t| t.trim().to_string()),
            excerpt: input.excerpt,
            content: input.content,
            author: input.author.map(|a| a.trim().to_string()),
            featured_image: input.featured_image,
            status: input.status,
            published_at: publishing.then(Utc::now),
            seo_title: input.seo_title,
            seo_description: input.seo_description,
            linked_post_id: None,
        };

        if let Some(tags) = &input.tags {
            self.tags.replace_post_tags(id, tags).await?;
        }
        // Always written, so a tags-only update still bumps `updated_at`
        self.posts
            .update(id, &changes)
            .await
            .context("Failed to update post")?;

        tracing::info!("Updated post {}", id);
        self.reload_post(id).await
    }

    /// Delete a post. Its comments and tag links go with it; tags and short
    /// links stay. The snapshot is patched in place without a reload.
    pub async fn delete_post(&self, id: i64) -> Result<(), StoreError> {
        let deleted = self.posts.delete(id).await.context("Failed to delete post")?;
        if !deleted {
            return Err(StoreError::NotFound(format!("Post {}", id)));
        }

        {
            let mut current = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
            *current = Arc::new(current.without_post(id));
        }
        tracing::info!("Deleted post {}", id);
        Ok(())
    }

    /// Add a visible comment to a post, then reload
    pub async fn add_comment(
        &self,
        post_id: i64,
        input: CreateCommentInput,
    ) -> Result<Comment, StoreError> {
        required("Name", &input.author_name)?;
        required("Email", &input.author_email)?;
        required("Content", &input.content)?;
        if !input.author_email.contains('@') {
            return Err(StoreError::ValidationError(format!(
                "Invalid email: {}",
                input.author_email
            )));
        }

        let input = CreateCommentInput {
            author_name: input.author_name.trim().to_string(),
            author_email: input.author_email.trim().to_string(),
            content: input.content.trim().to_string(),
        };
        let comment = self
            .comment_repo
            .create(post_id, &input)
            .await
            .context("Failed to add comment")?;

        tracing::info!("Added comment {} to post {}", comment.id, post_id);
        self.load_all().await?;
        Ok(comment)
    }

    /// Count one view. The snapshot catches up on the next reload.
    pub async fn increment_view_count(&self, id: i64) -> Result<(), StoreError> {
        let counted = self
            .posts
            .increment_view_count(id)
            .await
            .context("Failed to count view")?;
        if !counted {
            return Err(StoreError::NotFound(format!("Post {}", id)));
        }
        Ok(())
    }

    /// Show or hide a comment, then reload
    pub async fn set_comment_status(&self, id: i64, status: CommentStatus) -> Result<(), StoreError> {
        self.comments.set_status(id, status).await?;
        self.load_all().await?;
        Ok(())
    }

    pub async fn delete_comment(&self, id: i64) -> Result<(), StoreError> {
        self.comments.delete(id).await?;
        self.load_all().await?;
        Ok(())
    }

    /// Delete a tag from every post, then reload
    pub async fn delete_tag(&self, id: i64) -> Result<(), StoreError> {
        self.tags.delete(id).await?;
        self.load_all().await?;
        Ok(())
    }

    /// Create the other-language version of a post.
    ///
    /// The new post copies author, status, image and SEO fields, takes the
    /// translated text and tags, and is linked with the source both ways.
    /// A failed translation leaves the source post untouched.
    pub async fn translate_post(&self, id: i64) -> Result<PostWithRelations, StoreError> {
        let translator = self
            .translator
            .clone()
            .ok_or_else(|| StoreError::Translation("translation is not configured".to_string()))?;

        let source = self
            .posts
            .get_by_id(id)
            .await
            .context("Failed to load post")?
            .ok_or_else(|| StoreError::NotFound(format!("Post {}", id)))?;
        if let Some(linked) = source.linked_post_id {
            return Err(StoreError::ValidationError(format!(
                "Post {} already has a translation (post {})",
                id, linked
            )));
        }

        let links = self
            .tag_repo
            .links_for_posts(&[id])
            .await
            .context("Failed to load post tags")?;
        let tag_ids: Vec<i64> = links.iter().map(|l| l.tag_id).collect();
        let source_tags: Vec<String> = self
            .tag_repo
            .list_by_ids(&tag_ids)
            .await
            .context("Failed to load tags")?
            .into_iter()
            .map(|t| t.slug)
            .collect();

        let target = source.language.other();
        let request = TranslationRequest {
            title: source.title.clone(),
            excerpt: source.excerpt.clone().unwrap_or_default(),
            content: source.content.clone(),
            tags: source_tags.clone(),
        };
        let translated = translator
            .translate(&request, source.language, target)
            .await
            .map_err(|e| {
                tracing::warn!("Translation of post {} failed: {}", id, e);
                StoreError::Translation(e.to_string())
            })?;

        let slug = title_to_slug(&translated.translated_title);
        if slug.is_empty() {
            return Err(StoreError::Translation(format!(
                "translated title '{}' does not produce a slug",
                translated.translated_title
            )));
        }
        let tags = if normalize_tag_list(&translated.translated_tags).is_empty() {
            source_tags
        } else {
            translated.translated_tags
        };

        let new_post = NewPost {
            language: target,
            title: translated.translated_title.trim().to_string(),
            slug,
            excerpt: non_blank(Some(translated.translated_excerpt)),
            content: translated.translated_content,
            author: source.author.clone(),
            featured_image: source.featured_image.clone(),
            status: source.status,
            published_at: source.is_published().then(Utc::now),
            seo_title: source.seo_title.clone(),
            seo_description: source.seo_description.clone(),
            linked_post_id: Some(source.id),
        };
        let created = self.insert_post(&new_post, &tags).await?;

        self.posts
            .update(
                source.id,
                &PostChanges {
                    linked_post_id: Some(created.id),
                    ..PostChanges::default()
                },
            )
            .await
            .context("Failed to link translated post")?;

        tracing::info!(
            "Translated post {} ({}) into post {} ({})",
            source.id,
            source.language,
            created.id,
            target
        );
        self.reload_post(created.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, DatabasePool};
    use crate::models::UrlShortenerConfigInput;
    use crate::services::short_link::tests::{service_with, FakeShortener};
    use crate::services::short_link::ShortenError;
    use crate::services::translation::{TranslationError, TranslationResult};
    use async_trait::async_trait;

    struct FakeTranslator {
        reply: Result<TranslationResult, TranslationError>,
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn translate(
            &self,
            _request: &TranslationRequest,
            _source: Language,
            _target: Language,
        ) -> Result<TranslationResult, TranslationError> {
            self.reply.clone()
        }
    }

    async fn setup_with(shortener: Arc<FakeShortener>) -> (DynDatabasePool, ContentStore) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let short_links = Arc::new(service_with(pool.clone(), shortener));
        (pool.clone(), ContentStore::new(pool, short_links))
    }

    async fn setup() -> ContentStore {
        setup_with(FakeShortener::replying(Err(ShortenError::NoShortUrl)))
            .await
            .1
    }

    fn input(title: &str, tags: &[&str], status: PostStatus) -> CreatePostInput {
        CreatePostInput {
            title: title.to_string(),
            excerpt: Some("Short intro".to_string()),
            content: "Body text about Rust".to_string(),
            author: "Lan".to_string(),
            language: Language::En,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            status,
            featured_image: None,
            seo_title: None,
            seo_description: None,
        }
    }

    fn comment(content: &str) -> CreateCommentInput {
        CreateCommentInput {
            author_name: "Minh".to_string(),
            author_email: "minh@example.com".to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_post_resolves_slug_tags_and_short_link() {
        let store = setup().await;

        let created = store
            .create_post(input("Hello World!", &["Next.js", "react", "React"], PostStatus::Published))
            .await
            .unwrap();

        assert_eq!(created.post.slug, "hello-world");
        assert!(created.post.published_at.is_some());
        assert_eq!(created.tag_slugs().collect::<Vec<_>>(), vec!["next-js", "react"]);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.posts.len(), 1);
        assert!(snapshot.get_post_by_slug("hello-world").is_some());

        let link = store
            .short_links()
            .link_for_post(created.post.id)
            .await
            .unwrap()
            .unwrap();
        assert!(link.original_url.ends_with("/blog/hello-world"));
    }

    #[tokio::test]
    async fn test_create_post_reuses_existing_tags() {
        let store = setup().await;
        store
            .create_post(input("First", &["rust"], PostStatus::Draft))
            .await
            .unwrap();
        store
            .create_post(input("Second", &["Rust", "async"], PostStatus::Draft))
            .await
            .unwrap();

        let tags = store.tags().list().await.unwrap();
        let slugs: Vec<_> = tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["async", "rust"]);
    }

    #[tokio::test]
    async fn test_draft_has_no_published_at() {
        let store = setup().await;
        let created = store
            .create_post(input("Draft", &["x"], PostStatus::Draft))
            .await
            .unwrap();
        assert!(created.post.published_at.is_none());
    }

    #[tokio::test]
    async fn test_create_post_validation() {
        let store = setup().await;

        let no_tags = store.create_post(input("Title", &[" ", "..."], PostStatus::Draft)).await;
        assert!(matches!(no_tags, Err(StoreError::ValidationError(_))));

        let no_slug = store.create_post(input("!!!", &["a"], PostStatus::Draft)).await;
        assert!(matches!(no_slug, Err(StoreError::ValidationError(_))));

        let mut blank_author = input("Title", &["a"], PostStatus::Draft);
        blank_author.author = "  ".to_string();
        assert!(matches!(
            store.create_post(blank_author).await,
            Err(StoreError::ValidationError(_))
        ));

        assert!(store.snapshot().posts.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_titles_share_a_slug() {
        let store = setup().await;
        let a = store
            .create_post(input("Same Title", &["a"], PostStatus::Published))
            .await
            .unwrap();
        let b = store
            .create_post(input("Same Title", &["a"], PostStatus::Published))
            .await
            .unwrap();

        assert_ne!(a.post.id, b.post.id);
        assert_eq!(a.post.slug, b.post.slug);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.posts.iter().filter(|p| p.post.slug == "same-title").count(), 2);
        // newest first
        assert_eq!(snapshot.get_post_by_slug("same-title").unwrap().post.id, b.post.id);
    }

    #[tokio::test]
    async fn test_update_publishes_once() {
        let store = setup().await;
        let draft = store
            .create_post(input("Later", &["a"], PostStatus::Draft))
            .await
            .unwrap();

        let published = store
            .update_post(
                draft.post.id,
                UpdatePostInput {
                    status: Some(PostStatus::Published),
                    ..UpdatePostInput::default()
                },
            )
            .await
            .unwrap();
        let first_stamp = published.post.published_at.unwrap();

        let again = store
            .update_post(
                draft.post.id,
                UpdatePostInput {
                    status: Some(PostStatus::Published),
                    title: Some("Later, renamed".to_string()),
                    ..UpdatePostInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(again.post.published_at, Some(first_stamp));
        assert_eq!(again.post.title, "Later, renamed");
        assert_eq!(again.post.slug, "later");
    }

    #[tokio::test]
    async fn test_update_empty_tags_keeps_post_and_comments() {
        let store = setup().await;
        let post = store
            .create_post(input("Tagged", &["a", "b"], PostStatus::Published))
            .await
            .unwrap();
        store.add_comment(post.post.id, comment("hi")).await.unwrap();

        let updated = store
            .update_post(
                post.post.id,
                UpdatePostInput {
                    tags: Some(vec![]),
                    ..UpdatePostInput::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.tags.is_empty());
        assert_eq!(updated.comments.len(), 1);
        assert_eq!(updated.post.title, "Tagged");
    }

    #[tokio::test]
    async fn test_tags_only_update_bumps_updated_at() {
        let store = setup().await;
        let post = store
            .create_post(input("Retagged", &["a"], PostStatus::Published))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let updated = store
            .update_post(
                post.post.id,
                UpdatePostInput {
                    tags: Some(vec!["b".to_string()]),
                    ..UpdatePostInput::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.post.updated_at > post.post.updated_at);
        assert_eq!(updated.tag_slugs().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(updated.post.published_at, post.post.published_at);
    }

    #[tokio::test]
    async fn test_create_post_removes_row_when_short_link_fails() {
        let (pool, store) = setup_with(FakeShortener::replying(Err(ShortenError::NoShortUrl))).await;
        pool.execute("DROP TABLE shortened_urls").await.unwrap();

        let result = store
            .create_post(input("Orphan", &["a"], PostStatus::Published))
            .await;
        assert!(matches!(result, Err(StoreError::Gateway(_))));

        let snapshot = store.load_all().await.unwrap();
        assert!(snapshot.posts.is_empty());
        assert!(snapshot.get_post_by_slug("orphan").is_none());
    }

    #[tokio::test]
    async fn test_tag_query_ignores_vietnamese_case() {
        let store = setup().await;
        let mut vi = input("Học Rust", &["Lập Trình"], PostStatus::Published);
        vi.language = Language::Vi;
        store.create_post(vi).await.unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.get_all_tags(Language::Vi), vec!["lập-trình"]);
        assert_eq!(snapshot.get_posts_by_tag("lập-trình", Language::Vi).len(), 1);
        assert_eq!(snapshot.get_posts_by_tag("LẬP-TRÌNH", Language::Vi).len(), 1);
        assert!(snapshot.get_posts_by_tag("LẬP-TRÌNH", Language::En).is_empty());
    }

    #[tokio::test]
    async fn test_search_does_not_trim_query() {
        let store = setup().await;
        store
            .create_post(input("Spaced", &["a"], PostStatus::Published))
            .await
            .unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.search_posts("", Language::En).len(), 1);
        assert_eq!(snapshot.search_posts("about rust", Language::En).len(), 1);
        assert!(snapshot.search_posts("   ", Language::En).is_empty());
        assert!(snapshot.search_posts(" rust ", Language::En).is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_post() {
        let store = setup().await;
        let result = store.update_post(99, UpdatePostInput::default()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_post_patches_snapshot() {
        let store = setup().await;
        let keep = store
            .create_post(input("Keep", &["shared"], PostStatus::Published))
            .await
            .unwrap();
        let gone = store
            .create_post(input("Gone", &["shared", "solo"], PostStatus::Published))
            .await
            .unwrap();

        store.delete_post(gone.post.id).await.unwrap();

        let snapshot = store.snapshot();
        assert!(snapshot.get_post_by_id(gone.post.id).is_none());
        assert!(snapshot.get_post_by_id(keep.post.id).is_some());
        assert!(store.search_snapshot_ids("", Language::En).contains(&keep.post.id));
        assert_eq!(snapshot.get_all_tags(Language::En), vec!["shared"]);

        // tags and short links outlive the post
        assert_eq!(store.tags().list().await.unwrap().len(), 2);
        assert!(store
            .short_links()
            .link_for_post(gone.post.id)
            .await
            .unwrap()
            .is_some());

        assert!(matches!(
            store.delete_post(gone.post.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_comment_to_missing_post_fails() {
        let store = setup().await;
        let result = store.add_comment(404, comment("hello?")).await;
        assert!(matches!(result, Err(StoreError::Gateway(_))));
    }

    #[tokio::test]
    async fn test_add_comment_validation() {
        let store = setup().await;
        let post = store
            .create_post(input("Talk", &["a"], PostStatus::Published))
            .await
            .unwrap();
        let mut bad = comment("hi");
        bad.author_email = "nobody".to_string();
        assert!(matches!(
            store.add_comment(post.post.id, bad).await,
            Err(StoreError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_hidden_comments_leave_snapshot() {
        let store = setup().await;
        let post = store
            .create_post(input("Talk", &["a"], PostStatus::Published))
            .await
            .unwrap();
        let first = store.add_comment(post.post.id, comment("first")).await.unwrap();
        store.add_comment(post.post.id, comment("second")).await.unwrap();

        store
            .set_comment_status(first.id, CommentStatus::Hidden)
            .await
            .unwrap();

        let snapshot = store.snapshot();
        let comments = &snapshot.get_post_by_id(post.post.id).unwrap().comments;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].content, "second");
        assert_eq!(store.comments().list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_view_count_needs_reload() {
        let store = setup().await;
        let post = store
            .create_post(input("Viewed", &["a"], PostStatus::Published))
            .await
            .unwrap();
        store.increment_view_count(post.post.id).await.unwrap();
        store.increment_view_count(post.post.id).await.unwrap();
        assert_eq!(store.snapshot().get_post_by_id(post.post.id).unwrap().post.view_count, 0);

        store.load_all().await.unwrap();
        assert_eq!(store.snapshot().get_post_by_id(post.post.id).unwrap().post.view_count, 2);
        assert!(matches!(
            store.increment_view_count(999).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_load_keeps_snapshot() {
        let (pool, store) = setup_with(FakeShortener::replying(Err(ShortenError::NoShortUrl))).await;
        store
            .create_post(input("Survivor", &["a"], PostStatus::Published))
            .await
            .unwrap();

        pool.execute("DROP TABLE comments").await.unwrap();
        assert!(store.load_all().await.is_err());

        assert!(!store.is_loading());
        assert!(store.last_error().is_some());
        assert_eq!(store.snapshot().posts.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_short_link_used_when_active() {
        let (_pool, store) = setup_with(FakeShortener::replying(Ok("https://bit.ly/zz9".to_string()))).await;
        store
            .short_links()
            .save_config(
                Language::En,
                &UrlShortenerConfigInput {
                    provider: "bitly".to_string(),
                    endpoint: "https://api.example/shorten".to_string(),
                    api_key: "k".to_string(),
                    http_method: crate::models::HttpMethod::Post,
                    body_format: r#"{"url":"{{original_url}}"}"#.to_string(),
                    is_active: true,
                },
            )
            .await
            .unwrap();

        let post = store
            .create_post(input("Linked", &["a"], PostStatus::Published))
            .await
            .unwrap();
        let link = store
            .short_links()
            .link_for_post(post.post.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(link.short_url, "https://bit.ly/zz9");
    }

    #[tokio::test]
    async fn test_translate_post_creates_linked_pair() {
        let (pool, _) = setup_with(FakeShortener::replying(Err(ShortenError::NoShortUrl))).await;
        let short_links = Arc::new(service_with(
            pool.clone(),
            FakeShortener::replying(Err(ShortenError::NoShortUrl)),
        ));
        let store = ContentStore::new(pool, short_links).with_translator(Arc::new(FakeTranslator {
            reply: Ok(TranslationResult {
                translated_title: "Xin chào thế giới".to_string(),
                translated_excerpt: "Giới thiệu".to_string(),
                translated_content: "Nội dung".to_string(),
                translated_tags: vec!["Lập Trình".to_string()],
            }),
        }));

        let source = store
            .create_post(input("Hello World", &["programming"], PostStatus::Published))
            .await
            .unwrap();
        let translated = store.translate_post(source.post.id).await.unwrap();

        assert_eq!(translated.post.language, Language::Vi);
        assert_eq!(translated.post.slug, "xin-cho-th-gii");
        assert_eq!(translated.post.linked_post_id, Some(source.post.id));
        assert_eq!(translated.tag_slugs().collect::<Vec<_>>(), vec!["lập-trình"]);
        assert_eq!(translated.post.author, "Lan");

        let snapshot = store.snapshot();
        let source_now = snapshot.get_post_by_id(source.post.id).unwrap();
        assert_eq!(source_now.post.linked_post_id, Some(translated.post.id));
        assert_eq!(snapshot.get_all_tags(Language::Vi), vec!["lập-trình"]);

        assert!(matches!(
            store.translate_post(source.post.id).await,
            Err(StoreError::ValidationError(_))
        ));

        // deleting one side unlinks the other in the snapshot
        store.delete_post(translated.post.id).await.unwrap();
        assert_eq!(
            store.snapshot().get_post_by_id(source.post.id).unwrap().post.linked_post_id,
            None
        );
    }

    #[tokio::test]
    async fn test_translation_failure_keeps_source() {
        let (pool, _) = setup_with(FakeShortener::replying(Err(ShortenError::NoShortUrl))).await;
        let short_links = Arc::new(service_with(
            pool.clone(),
            FakeShortener::replying(Err(ShortenError::NoShortUrl)),
        ));
        let store = ContentStore::new(pool, short_links).with_translator(Arc::new(FakeTranslator {
            reply: Err(TranslationError::Malformed("not json".to_string())),
        }));

        let source = store
            .create_post(input("Stay", &["a"], PostStatus::Draft))
            .await
            .unwrap();
        assert!(matches!(
            store.translate_post(source.post.id).await,
            Err(StoreError::Translation(_))
        ));
        assert_eq!(store.snapshot().posts.len(), 1);
    }

    #[tokio::test]
    async fn test_translate_without_translator() {
        let store = setup().await;
        let source = store
            .create_post(input("Alone", &["a"], PostStatus::Draft))
            .await
            .unwrap();
        assert!(matches!(
            store.translate_post(source.post.id).await,
            Err(StoreError::Translation(_))
        ));
    }

    impl ContentStore {
        fn search_snapshot_ids(&self, query: &str, language: Language) -> Vec<i64> {
            self.snapshot()
                .search_posts(query, language)
                .iter()
                .map(|p| p.post.id)
                .collect()
        }
    }
}
