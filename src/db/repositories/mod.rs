//! Database repositories
//!
//! One repository per table. Together they form the relational gateway the
//! content store and services talk to.

pub mod comment;
pub mod post;
pub mod short_link;
pub mod shortener_config;
pub mod shortener_log;
pub mod tag;

pub use comment::{CommentRepository, CommentRepositoryImpl};
pub use post::{PostRepository, SqlxPostRepository};
pub use short_link::{ShortLinkRepository, SqlxShortLinkRepository};
pub use shortener_config::{ShortenerConfigRepository, SqlxShortenerConfigRepository};
pub use shortener_log::{ShortenerLogRepository, SqlxShortenerLogRepository};
pub use tag::{SqlxTagRepository, TagRepository};
