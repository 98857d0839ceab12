//! Comment service
//!
//! Moderation operations over every comment regardless of status. Adding
//! comments goes through the content store so the public snapshot stays in
//! step with the database.

use std::sync::Arc;

use anyhow::Context;

use crate::db::repositories::CommentRepository;
use crate::models::{CommentStatus, CommentWithPost};

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Comment not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>) -> Self {
        Self { repo }
    }

    /// Every comment with its post title, newest first
    pub async fn list_all(&self) -> Result<Vec<CommentWithPost>, CommentServiceError> {
        Ok(self.repo.list_all().await.context("Failed to list comments")?)
    }

    /// Show or hide a comment
    pub async fn set_status(&self, id: i64, status: CommentStatus) -> Result<(), CommentServiceError> {
        let updated = self
            .repo
            .update_status(id, status)
            .await
            .context("Failed to update comment status")?;
        if !updated {
            return Err(CommentServiceError::NotFound(id));
        }
        tracing::info!("Comment {} is now {}", id, status);
        Ok(())
    }

    /// Delete a comment permanently
    pub async fn delete(&self, id: i64) -> Result<(), CommentServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete comment")?;
        if !deleted {
            return Err(CommentServiceError::NotFound(id));
        }
        tracing::info!("Deleted comment {}", id);
        Ok(())
    }

    pub async fn count_visible(&self, post_id: i64) -> Result<i64, CommentServiceError> {
        Ok(self
            .repo
            .count_visible(post_id)
            .await
            .context("Failed to count comments")?)
    }
}
