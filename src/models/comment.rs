//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation status. New comments start visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    #[default]
    Visible,
    Hidden,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "visible" => Ok(Self::Visible),
            "hidden" => Ok(Self::Hidden),
            _ => Err(format!("Invalid comment status: {}", s)),
        }
    }
}

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
}

/// Comment joined with the title of its post, for moderation views
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentWithPost {
    #[serde(flatten)]
    pub comment: Comment,
    pub post_title: Option<String>,
}

/// Input for adding a comment to a post
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub author_name: String,
    pub author_email: String,
    pub content: String,
}
