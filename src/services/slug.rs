//! Slug and tag normalization
//!
//! Pure text functions shared by the content store and the short-link issuer:
//! - [`title_to_slug`] derives a post slug from its title
//! - [`normalize_tag_text`] turns free-form tag input into a tag slug
//! - [`generate_short_code`] picks a random code for locally issued short links

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

/// Characters allowed in a short code
const SHORT_CODE_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a locally generated short code
pub const SHORT_CODE_LEN: usize = 6;

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static HYPHEN_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

/// Derive a URL slug from a post title.
///
/// Lowercases, drops every character outside `[a-z0-9]`, whitespace and
/// hyphens, turns whitespace runs into single hyphens, collapses repeated
/// hyphens and trims hyphens from both ends. Accented letters are dropped,
/// not transliterated. The result may be empty.
///
/// ```
/// use songngu::services::slug::title_to_slug;
/// assert_eq!(title_to_slug("Hello World!"), "hello-world");
/// ```
pub fn title_to_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lowered, "");
    let hyphenated = WHITESPACE_RUN.replace_all(&stripped, "-");
    let collapsed = HYPHEN_RUN.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

/// Normalize user-entered tag text into a tag slug.
///
/// Trims and lowercases, turns whitespace and ASCII punctuation into
/// hyphens, collapses hyphen runs and trims hyphens from the ends.
/// Non-ASCII letters (Vietnamese diacritics) are kept as is, so
/// `"Lập Trình"` becomes `"lập-trình"` and `"Next.js"` becomes `"next-js"`.
pub fn normalize_tag_text(text: &str) -> String {
    let mapped: String = text
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || (!c.is_ascii() && !c.is_whitespace()) {
                c
            } else {
                '-'
            }
        })
        .collect();

    let mut result = String::with_capacity(mapped.len());
    let mut prev_hyphen = false;
    for c in mapped.chars() {
        if c == '-' {
            if !prev_hyphen && !result.is_empty() {
                result.push(c);
                prev_hyphen = true;
            }
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    result.trim_end_matches('-').to_string()
}

/// Random short code of [`SHORT_CODE_LEN`] characters from `[a-z0-9]`.
///
/// Codes are not checked for collisions.
pub fn generate_short_code() -> String {
    let mut rng = rand::thread_rng();
    (0..SHORT_CODE_LEN)
        .map(|_| SHORT_CODE_CHARSET[rng.gen_range(0..SHORT_CODE_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_to_slug_basic() {
        assert_eq!(title_to_slug("Hello World!"), "hello-world");
        assert_eq!(title_to_slug("  Rust   is -- fun  "), "rust-is-fun");
        assert_eq!(title_to_slug("Top 10 Tips"), "top-10-tips");
    }

    #[test]
    fn test_title_to_slug_drops_accents() {
        assert_eq!(title_to_slug("Các Mẹo Hay"), "cc-mo-hay");
    }

    #[test]
    fn test_title_to_slug_may_be_empty() {
        assert_eq!(title_to_slug("!!!"), "");
        assert_eq!(title_to_slug(""), "");
    }

    #[test]
    fn test_normalize_tag_text() {
        assert_eq!(normalize_tag_text("Next.js"), "next-js");
        assert_eq!(normalize_tag_text("  React  Hooks "), "react-hooks");
        assert_eq!(normalize_tag_text("Lập Trình"), "lập-trình");
        assert_eq!(normalize_tag_text("c++"), "c");
        assert_eq!(normalize_tag_text("   "), "");
    }

    #[test]
    fn test_generate_short_code_shape() {
        for _ in 0..50 {
            let code = generate_short_code();
            assert_eq!(code.len(), SHORT_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}
