//! Post model
//!
//! This module provides:
//! - `Post` entity, one row of the `posts` table
//! - `Language` and `PostStatus` enums
//! - Input types for creating and updating posts
//! - `PostWithRelations`, the denormalized shape held by the content snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Comment, Tag};

/// Content language. Every post is written in exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Vi,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Vi => "vi",
        }
    }

    /// The other language of the pair
    pub fn other(&self) -> Self {
        match self {
            Language::En => Language::Vi,
            Language::Vi => Language::En,
        }
    }

    /// English name, used when prompting the translation provider
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Vi => "Vietnamese",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "vi" => Ok(Language::Vi),
            _ => Err(format!("Invalid language: {}", s)),
        }
    }
}

/// Publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Not visible to readers
    #[default]
    Draft,
    /// Visible to readers
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            _ => Err(format!("Invalid post status: {}", s)),
        }
    }
}

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    pub language: Language,
    pub title: String,
    /// Derived from the title at creation, never regenerated
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub author: String,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    /// Set whenever the post moves from draft to published
    pub published_at: Option<DateTime<Utc>>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub view_count: i64,
    /// The same article in the other language, if one exists
    pub linked_post_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }
}

/// Row values for inserting a post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub language: Language,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub author: String,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub linked_post_id: Option<i64>,
}

/// Sparse row update. Only `Some` fields are written; `updated_at` always is.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub language: Option<Language>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub featured_image: Option<String>,
    pub status: Option<PostStatus>,
    pub published_at: Option<DateTime<Utc>>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub linked_post_id: Option<i64>,
}

/// Input for creating a post
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub content: String,
    pub author: String,
    pub language: Language,
    /// Free-form tag texts, normalized before lookup
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
}

/// Input for updating a post; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub language: Option<Language>,
    /// When present, replaces the post's tag set entirely (may be empty)
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
}

/// A post joined with its tags and visible comments
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PostWithRelations {
    #[serde(flatten)]
    pub post: Post,
    pub tags: Vec<Tag>,
    pub comments: Vec<Comment>,
}

impl PostWithRelations {
    pub fn tag_slugs(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.slug.as_str())
    }

    /// Case-insensitive, Vietnamese letters included
    pub fn has_tag(&self, slug: &str) -> bool {
        let wanted = slug.to_lowercase();
        self.tags.iter().any(|t| t.slug.to_lowercase() == wanted)
    }
}
