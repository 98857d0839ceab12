//! Configuration management
//!
//! This module handles loading and parsing configuration for the bilingual blog.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Public site settings
    #[serde(default)]
    pub site: SiteConfig,
    /// Translation provider settings
    #[serde(default)]
    pub translation: TranslationConfig,
    /// Outbound URL shortener settings
    #[serde(default)]
    pub shortener: ShortenerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the blog front-end)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/songngu.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Public site settings.
///
/// `base_url` prefixes canonical post URLs (`/blog/{slug}`) and locally
/// issued short links (`/s/{code}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

impl SiteConfig {
    /// Base URL without a trailing slash
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Translation provider configuration (Gemini generateContent API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Base endpoint, the model name and `:generateContent` are appended
    #[serde(default = "default_translation_endpoint")]
    pub endpoint: String,
    /// Model name
    #[serde(default = "default_translation_model")]
    pub model: String,
    /// API key; translation is disabled while unset
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_translation_timeout")]
    pub timeout_seconds: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_translation_endpoint(),
            model: default_translation_model(),
            api_key: None,
            timeout_seconds: default_translation_timeout(),
        }
    }
}

fn default_translation_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_translation_model() -> String {
    "gemini-pro".to_string()
}

fn default_translation_timeout() -> u64 {
    60
}

/// Outbound URL shortener configuration.
///
/// Provider endpoints and credentials are stored per language in the
/// database; only transport settings live here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortenerConfig {
    #[serde(default = "default_shortener_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_shortener_timeout(),
        }
    }
}

fn default_shortener_timeout() -> u64 {
    30
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - SONGNGU_SERVER_HOST
    /// - SONGNGU_SERVER_PORT
    /// - SONGNGU_SERVER_CORS_ORIGIN
    /// - SONGNGU_DATABASE_DRIVER
    /// - SONGNGU_DATABASE_URL
    /// - SONGNGU_SITE_BASE_URL
    /// - SONGNGU_TRANSLATION_API_KEY (falls back to GEMINI_API_KEY)
    /// - SONGNGU_TRANSLATION_MODEL
    /// - SONGNGU_SHORTENER_TIMEOUT_SECONDS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SONGNGU_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SONGNGU_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("SONGNGU_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("SONGNGU_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("SONGNGU_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(base_url) = std::env::var("SONGNGU_SITE_BASE_URL") {
            self.site.base_url = base_url;
        }

        let api_key = std::env::var("SONGNGU_TRANSLATION_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"));
        if let Ok(key) = api_key {
            if !key.trim().is_empty() {
                self.translation.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("SONGNGU_TRANSLATION_MODEL") {
            self.translation.model = model;
        }

        if let Ok(timeout) = std::env::var("SONGNGU_SHORTENER_TIMEOUT_SECONDS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.shortener.timeout_seconds = timeout;
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_config_strategy() -> impl Strategy<Value = Config> {
        (
            "[a-z][a-z0-9]{0,10}",
            1u16..=65535,
            prop_oneof![Just(DatabaseDriver::Sqlite), Just(DatabaseDriver::Mysql)],
            "[a-z][a-z0-9_/]{0,20}\\.db",
            "https://[a-z]{3,10}\\.(com|vn)",
            prop::option::of("[A-Za-z0-9]{8,32}"),
            1u64..=600,
        )
            .prop_map(|(host, port, driver, url, base_url, api_key, timeout)| Config {
                server: ServerConfig {
                    host,
                    port,
                    cors_origin: default_cors_origin(),
                },
                database: DatabaseConfig { driver, url },
                site: SiteConfig { base_url },
                translation: TranslationConfig {
                    api_key,
                    timeout_seconds: timeout,
                    ..TranslationConfig::default()
                },
                shortener: ShortenerConfig {
                    timeout_seconds: timeout,
                },
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn config_survives_yaml_file(config in valid_config_strategy()) {
            let yaml = serde_yaml::to_string(&config).unwrap();
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "{}", yaml).unwrap();

            let loaded = Config::load(file.path()).unwrap();

            prop_assert_eq!(loaded.server.host, config.server.host);
            prop_assert_eq!(loaded.server.port, config.server.port);
            prop_assert_eq!(loaded.database.driver, config.database.driver);
            prop_assert_eq!(loaded.database.url, config.database.url);
            prop_assert_eq!(loaded.site.base_url, config.site.base_url);
            prop_assert_eq!(loaded.translation.api_key, config.translation.api_key);
            prop_assert_eq!(loaded.shortener.timeout_seconds, config.shortener.timeout_seconds);
        }
    }
}
