//! Data models
//!
//! Entities stored by the blog (posts, tags, comments, short links and the
//! shortener's configuration and logs) plus the input types used to create
//! and update them.

mod comment;
mod post;
mod short_link;
mod tag;

pub use comment::{Comment, CommentStatus, CommentWithPost, CreateCommentInput};
pub use post::{
    CreatePostInput, Language, NewPost, Post, PostChanges, PostStatus, PostWithRelations,
    UpdatePostInput,
};
pub use short_link::{
    HttpMethod, LogStatus, NewShortLink, NewUrlShortenerLog, ShortLink, UrlShortenerConfig,
    UrlShortenerConfigInput, UrlShortenerLog,
};
pub use tag::{PostTag, Tag, TagWithCount};
