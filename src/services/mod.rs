//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories:
//! - `store` owns the post snapshot and every post mutation
//! - `tag`, `comment` and `short_link` hold the per-entity rules
//! - `slug` and `translation` are the text helpers and the translation client

pub mod comment;
pub mod short_link;
pub mod slug;
pub mod store;
pub mod tag;
pub mod translation;

pub use comment::{CommentService, CommentServiceError};
pub use short_link::{
    HttpShortenerClient, ShortLinkService, ShortLinkServiceError, ShortenError, ShortenerClient,
};
pub use slug::{generate_short_code, normalize_tag_text, title_to_slug};
pub use store::{ContentStore, Snapshot, StoreError};
pub use tag::{normalize_tag_list, TagService, TagServiceError};
pub use translation::{
    GeminiTranslator, TranslationError, TranslationRequest, TranslationResult, Translator,
};
