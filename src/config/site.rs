//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    /// UI language used to pick translated strings (e.g. "pt-BR")
    pub language: String,
    /// Locale used for month and weekday names (e.g. "pt_BR")
    pub locale: String,
    /// IANA timezone for displayed dates, empty for UTC
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,
    pub languages_dir: String,

    // Content API
    #[serde(default)]
    pub content: ContentConfig,

    // Reading time
    #[serde(default)]
    pub reading: ReadingConfig,

    // Date / Time format (date-fns style tokens)
    pub date_format: String,
    pub edit_date_format: String,

    // Comments embed
    pub comments: Option<CommentsConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Spacetraveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            locale: "pt_BR".to_string(),
            timezone: String::new(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),
            languages_dir: "languages".to_string(),

            content: ContentConfig::default(),
            reading: ReadingConfig::default(),

            date_format: "dd MMM yyyy".to_string(),
            edit_date_format: "dd MMM yyyy, 'às' k:m".to_string(),

            comments: None,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {:?}", path.as_ref()))?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Headless content API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// API endpoint, e.g. https://my-repo.cdn.prismic.io/api/v2
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type holding blog posts
    pub document_type: String,
    /// Posts per listing page
    pub page_size: usize,
    /// JSON file with raw documents, used instead of the API when set
    pub fixtures: Option<String>,
    /// Retries for a failed load-more before giving up
    pub fetch_retries: usize,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 1,
            fixtures: None,
            fetch_retries: 3,
            retry_delay_ms: 500,
            request_timeout_secs: 30,
        }
    }
}

/// Reading time estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    pub words_per_minute: usize,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
        }
    }
}

/// Utterances comment widget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// GitHub repository receiving the comment issues ("owner/name")
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            issue_term: "pathname".to_string(),
            theme: "github-dark".to_string(),
        }
    }
}
