//! Shared API response types
//!
//! Every successful JSON response is wrapped in [`ApiResponse`] so clients
//! always get `success` and a short `message` next to the payload.

use serde::Serialize;

use crate::models::{Language, PostWithRelations};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::with_message("OK", data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Post list payload
#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostWithRelations>,
    pub total: usize,
}

impl PostListResponse {
    pub fn from_refs(posts: Vec<&PostWithRelations>) -> Self {
        Self {
            total: posts.len(),
            posts: posts.into_iter().cloned().collect(),
        }
    }
}

/// Tag slugs of one language
#[derive(Debug, Serialize)]
pub struct TagSlugsResponse {
    pub language: Language,
    pub tags: Vec<String>,
}
