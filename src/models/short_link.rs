//! Short-link models
//!
//! - `ShortLink`, an issued short URL (`shortened_urls` table)
//! - `UrlShortenerConfig`, the per-language outbound provider settings
//! - `UrlShortenerLog`, one recorded provider attempt

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Language;

/// An issued short link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShortLink {
    pub id: i64,
    /// Canonical post URL the link resolves to
    pub original_url: String,
    pub short_url: String,
    pub short_code: Option<String>,
    pub language: Language,
    /// The post the link was issued for; kept after the post is deleted
    pub post_id: Option<i64>,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
}

/// Row values for a new short link
#[derive(Debug, Clone)]
pub struct NewShortLink {
    pub original_url: String,
    pub short_url: String,
    pub short_code: Option<String>,
    pub language: Language,
    pub post_id: Option<i64>,
}

/// HTTP method used to call the shortener provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }

    /// Whether a request body is sent
    pub fn has_body(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            _ => Err(format!("Invalid HTTP method: {}", s)),
        }
    }
}

/// Outbound shortener provider settings, one row per language
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlShortenerConfig {
    pub id: i64,
    pub language: Language,
    /// Free-form provider label
    pub provider: String,
    pub endpoint: String,
    pub api_key: String,
    pub http_method: HttpMethod,
    /// Request body template; `{{original_url}}` is replaced with the long URL
    pub body_format: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a language's provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct UrlShortenerConfigInput {
    pub provider: String,
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub http_method: HttpMethod,
    #[serde(default = "default_body_format")]
    pub body_format: String,
    #[serde(default)]
    pub is_active: bool,
}

fn default_body_format() -> String {
    r#"{"url": "{{original_url}}"}"#.to_string()
}

/// Outcome of a logged provider attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Success => "success",
            LogStatus::Error => "error",
        }
    }
}

impl std::str::FromStr for LogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(LogStatus::Success),
            "error" => Ok(LogStatus::Error),
            _ => Err(format!("Invalid log status: {}", s)),
        }
    }
}

/// One recorded call to the shortener provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlShortenerLog {
    pub id: i64,
    pub language: Language,
    pub test_url: String,
    pub short_url: Option<String>,
    pub status: LogStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row values for a new log entry
#[derive(Debug, Clone)]
pub struct NewUrlShortenerLog {
    pub language: Language,
    pub test_url: String,
    pub short_url: Option<String>,
    pub status: LogStatus,
    pub error_message: Option<String>,
}

impl NewUrlShortenerLog {
    pub fn success(language: Language, test_url: &str, short_url: &str) -> Self {
        Self {
            language,
            test_url: test_url.to_string(),
            short_url: Some(short_url.to_string()),
            status: LogStatus::Success,
            error_message: None,
        }
    }

    pub fn failure(language: Language, test_url: &str, message: String) -> Self {
        Self {
            language,
            test_url: test_url.to_string(),
            short_url: None,
            status: LogStatus::Error,
            error_message: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_parse_and_body() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert!("DELETE".parse::<HttpMethod>().is_err());
        assert!(!HttpMethod::Get.has_body());
        assert!(HttpMethod::Put.has_body());
    }

    #[test]
    fn test_config_input_defaults() {
        let input: UrlShortenerConfigInput =
            serde_json::from_str(r#"{"provider":"bitly","endpoint":"https://api.example/shorten"}"#)
                .unwrap();
        assert_eq!(input.http_method, HttpMethod::Post);
        assert!(input.body_format.contains("{{original_url}}"));
        assert!(!input.is_active);
    }

    #[test]
    fn test_method_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&HttpMethod::Put).unwrap(), "\"PUT\"");
    }
}
