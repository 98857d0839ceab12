//! Tag model
//!
//! Tags are shared by both languages. A tag is identified by its normalized
//! slug and carries a display name per language.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Language;

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Normalized slug, unique across all tags
    pub slug: String,
    /// Vietnamese display name
    pub name_vi: String,
    /// English display name
    pub name_en: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Create a tag whose display names both default to the slug.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn from_slug(slug: String) -> Self {
        Self {
            id: 0,
            name_vi: slug.clone(),
            name_en: slug.clone(),
            slug,
            created_at: Utc::now(),
        }
    }

    /// Display name in the given language
    pub fn name_for(&self, language: Language) -> &str {
        match language {
            Language::En => &self.name_en,
            Language::Vi => &self.name_vi,
        }
    }
}

/// One row of the post/tag join table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTag {
    pub post_id: i64,
    pub tag_id: i64,
}

/// Tag with the number of published posts using it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub post_count: i64,
}
