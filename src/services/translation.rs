//! Post translation
//!
//! A [`Translator`] turns the text fields of a post into the other language.
//! [`GeminiTranslator`] asks the Gemini `generateContent` API for a JSON
//! object and parses it strictly: anything that is not that object is a
//! failure, never a partial result.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::TranslationConfig;
use crate::models::Language;

/// Text fields sent for translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Translated text fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub translated_title: String,
    #[serde(default)]
    pub translated_excerpt: String,
    pub translated_content: String,
    #[serde(default)]
    pub translated_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslationError {
    #[error("Translation API key is not configured")]
    NotConfigured,

    #[error("Translation provider failed: {0}")]
    Provider(String),

    #[error("Failed to parse translation response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        request: &TranslationRequest,
        source: Language,
        target: Language,
    ) -> Result<TranslationResult, TranslationError>;
}

/// Build the instruction sent to the model
pub fn build_prompt(request: &TranslationRequest, source: Language, target: Language) -> String {
    let tags = serde_json::to_string(&request.tags).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"You are a professional translator. Translate the following blog post content from {source} to {target}.
Ensure the tone remains professional, engaging, and suitable for a tech/personal blog.

Input Data:
1. Title: "{title}"
2. Excerpt: "{excerpt}"
3. Content: "{content}"
4. Tags: {tags}

Output must be a valid JSON object with the following structure:
{{
  "translatedTitle": "...",
  "translatedExcerpt": "...",
  "translatedContent": "...",
  "translatedTags": ["...", "..."]
}}

Important:
- Translate "translatedTags" to {target} equivalents.
- Keep "translatedContent" in Markdown format if the original is Markdown.
- Do not include any explanation, only the JSON object."#,
        source = source.display_name(),
        target = target.display_name(),
        title = request.title,
        excerpt = request.excerpt,
        content = request.content,
        tags = tags,
    )
}

/// Remove Markdown code fences the model tends to wrap JSON in
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse the model's reply into a translation
pub fn parse_translation(text: &str) -> Result<TranslationResult, TranslationError> {
    let result: TranslationResult = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| TranslationError::Malformed(e.to_string()))?;

    if result.translated_title.trim().is_empty() || result.translated_content.trim().is_empty() {
        return Err(TranslationError::Malformed(
            "translated title or content is empty".to_string(),
        ));
    }
    Ok(result)
}

/// Text of the first candidate in a `generateContent` response
fn candidate_text(response: &Value) -> Option<&str> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
}

/// Gemini-backed translator
pub struct GeminiTranslator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiTranslator {
    pub fn new(config: &TranslationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl Translator for GeminiTranslator {
    async fn translate(
        &self,
        request: &TranslationRequest,
        source: Language,
        target: Language,
    ) -> Result<TranslationResult, TranslationError> {
        let api_key = self.api_key.as_deref().ok_or(TranslationError::NotConfigured)?;
        let url = format!("{}/{}:generateContent", self.endpoint, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(request, source, target) }] }]
        });

        tracing::debug!("Requesting {} -> {} translation from {}", source, target, self.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslationError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!("Translation provider returned {}: {}", status, detail);
            return Err(TranslationError::Provider(format!("HTTP {}", status.as_u16())));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| TranslationError::Malformed(e.to_string()))?;
        let text = candidate_text(&payload).ok_or_else(|| {
            TranslationError::Malformed("response has no candidate text".to_string())
        })?;

        parse_translation(text).inspect_err(|e| {
            tracing::warn!("Unparseable translation reply: {}", e);
        })
    }
}
