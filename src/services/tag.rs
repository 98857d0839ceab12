//! Tag service
//!
//! Business logic for tags:
//! - Resolve free-form tag text to a tag row, creating it on first use
//! - Link and relink the tags of a post
//! - Tag administration (listing, usage counts, deletion)

use crate::db::repositories::TagRepository;
use crate::models::{Language, Tag, TagWithCount};
use crate::services::slug::normalize_tag_text;
use anyhow::Context;
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Normalize a list of tag texts, dropping empties and duplicates.
///
/// The first occurrence of each slug keeps its position.
pub fn normalize_tag_list(texts: &[String]) -> Vec<String> {
    let mut slugs: Vec<String> = Vec::with_capacity(texts.len());
    for text in texts {
        let slug = normalize_tag_text(text);
        if !slug.is_empty() && !slugs.contains(&slug) {
            slugs.push(slug);
        }
    }
    slugs
}

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// Find the tag for `text`, creating it if no tag has its slug yet.
    ///
    /// New tags get the slug as both display names.
    ///
    /// # Errors
    /// - `ValidationError` if the text normalizes to nothing
    pub async fn resolve(&self, text: &str) -> Result<Tag, TagServiceError> {
        let slug = normalize_tag_text(text);
        if slug.is_empty() {
            return Err(TagServiceError::ValidationError(format!(
                "Tag '{}' has no usable characters",
                text
            )));
        }

        if let Some(existing) = self
            .repo
            .get_by_slug(&slug)
            .await
            .context("Failed to look up tag")?
        {
            return Ok(existing);
        }

        let created = self
            .repo
            .create(&Tag::from_slug(slug.clone()))
            .await
            .with_context(|| format!("Failed to create tag '{}'", slug))?;
        tracing::debug!("Created tag {} ({})", created.slug, created.id);
        Ok(created)
    }

    /// Resolve every tag text and link the resulting tags to a post
    pub async fn link_post_tags(
        &self,
        post_id: i64,
        texts: &[String],
    ) -> Result<Vec<Tag>, TagServiceError> {
        let mut tags = Vec::new();
        for slug in normalize_tag_list(texts) {
            let tag = self.resolve(&slug).await?;
            self.repo
                .add_to_post(tag.id, post_id)
                .await
                .context("Failed to link tag to post")?;
            tags.push(tag);
        }
        Ok(tags)
    }

    /// Replace the whole tag set of a post. An empty list leaves it untagged.
    pub async fn replace_post_tags(
        &self,
        post_id: i64,
        texts: &[String],
    ) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .clear_post(post_id)
            .await
            .context("Failed to clear post tags")?;
        self.link_post_tags(post_id, texts).await
    }

    /// All tags ordered by slug
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        Ok(self.repo.list().await.context("Failed to list tags")?)
    }

    /// Tags of published posts in one language, most used first
    pub async fn with_counts(&self, language: Language) -> Result<Vec<TagWithCount>, TagServiceError> {
        Ok(self
            .repo
            .get_with_counts(language)
            .await
            .context("Failed to count tags")?)
    }

    /// Delete a tag and its post links
    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete tag")?;
        if !deleted {
            return Err(TagServiceError::NotFound(id.to_string()));
        }
        tracing::info!("Deleted tag {}", id);
        Ok(())
    }
}
