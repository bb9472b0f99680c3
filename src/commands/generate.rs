//! Generate static files

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::generator::{GenerateReport, Generator};
use crate::source::{ContentSource, HttpSource, HttpSourceSettings, MemorySource};
use crate::Spacetraveling;

/// Command-line overrides for where content comes from
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub endpoint: Option<String>,
    pub access_token: Option<String>,
    pub fixtures: Option<PathBuf>,
    /// Include unpublished documents
    pub preview: bool,
    /// Content ref to read in preview mode instead of the master ref
    pub preview_ref: Option<String>,
}

/// Build the content source from config and overrides.
///
/// A fixtures file wins over the API endpoint.
pub fn build_source(
    app: &Spacetraveling,
    options: &SourceOptions,
) -> Result<Arc<dyn ContentSource>> {
    let content = &app.config.content;

    let fixtures = options
        .fixtures
        .clone()
        .or_else(|| content.fixtures.as_deref().map(|f| app.resolve(f)));
    if let Some(path) = fixtures {
        tracing::info!("Reading documents from {:?}", path);
        let source = MemorySource::from_file(&path)?.with_drafts(options.preview);
        return Ok(Arc::new(source));
    }

    let endpoint = options
        .endpoint
        .clone()
        .unwrap_or_else(|| content.endpoint.clone());
    if endpoint.is_empty() {
        anyhow::bail!("No content source configured: set content.endpoint or content.fixtures");
    }

    let mut settings = HttpSourceSettings::new(endpoint);
    settings.access_token = options
        .access_token
        .clone()
        .or_else(|| content.access_token.clone());
    settings.request_timeout = Duration::from_secs(content.request_timeout_secs);
    if options.preview {
        match &options.preview_ref {
            Some(preview_ref) => settings.release_ref = Some(preview_ref.clone()),
            None => tracing::warn!("Preview requested without a ref, reading the master ref"),
        }
    }

    tracing::info!("Reading documents from {}", settings.endpoint);
    let source = HttpSource::new(settings).context("Failed to create API client")?;
    Ok(Arc::new(source))
}

/// Generate the static site
pub async fn run(app: &Spacetraveling, options: &SourceOptions) -> Result<GenerateReport> {
    let start = std::time::Instant::now();

    let source = build_source(app, options)?;
    let generator = Generator::new(app, source)?.with_preview(options.preview);
    let report = generator.generate().await?;

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = Spacetraveling::new(dir.path()).unwrap();

        let err = build_source(&app, &SourceOptions::default()).err().unwrap();
        assert!(err.to_string().contains("content.endpoint"));
    }

    #[test]
    fn test_endpoint_override_builds_http_source() {
        let dir = tempfile::tempdir().unwrap();
        let app = Spacetraveling::new(dir.path()).unwrap();
        let options = SourceOptions {
            endpoint: Some("https://blog.cdn.prismic.io/api/v2".to_string()),
            ..SourceOptions::default()
        };

        assert!(build_source(&app, &options).is_ok());
    }

    #[tokio::test]
    async fn test_fixtures_relative_to_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("_config.yml"),
            "content:\n  fixtures: posts.json\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("posts.json"), "[]").unwrap();

        let app = Spacetraveling::new(dir.path()).unwrap();
        let report = run(&app, &SourceOptions::default()).await.unwrap();
        assert_eq!(report.posts, 0);
        assert!(app.public_dir.join("index.html").exists());
    }
}
