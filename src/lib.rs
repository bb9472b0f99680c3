//! spacetraveling: a static blog generator over a headless content API
//!
//! Posts are pulled from a Prismic-style REST API (or a JSON fixtures file),
//! paged through with a load-more listing, linked to their chronological
//! neighbours and rendered with embedded Tera templates.

pub mod adjacency;
pub mod commands;
pub mod comments;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod listing;
pub mod server;
pub mod source;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// A site rooted at a directory holding `_config.yml`
#[derive(Debug, Clone)]
pub struct Spacetraveling {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets copied verbatim into the output
    pub static_dir: PathBuf,
    /// Language files overriding the built-in UI strings
    pub languages_dir: PathBuf,
    /// Template overrides
    pub templates_dir: PathBuf,
}

impl Spacetraveling {
    /// Open the site in `base_dir`, using defaults when there is no config file
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let languages_dir = base_dir.join(&config.languages_dir);
        let templates_dir = base_dir.join("templates");

        Self {
            config,
            base_dir,
            public_dir,
            static_dir,
            languages_dir,
            templates_dir,
        }
    }

    /// Resolve a path from the config relative to the base directory
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
