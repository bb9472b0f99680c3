//! Built-in theme templates using the Tera template engine
//!
//! Templates are embedded in the binary. A site can replace any of them by
//! dropping a file with the same name into its `templates/` directory.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tera::{Context, Tera};
use walkdir::WalkDir;

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all built-in templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Data from the content API is untrusted; pre-rendered markup and
        // generated paths opt out with `| safe`
        tera.autoescape_on(vec![".html"]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("post.html", include_str!("theme/post.html")),
            ("not_found.html", include_str!("theme/not_found.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("theme/partials/header.html"),
            ),
            (
                "partials/post_info.html",
                include_str!("theme/partials/post_info.html"),
            ),
            (
                "partials/preview.html",
                include_str!("theme/partials/preview.html"),
            ),
        ])?;

        // Register custom filters
        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Replace built-in templates with the `.html` files found in `dir`
    pub fn load_overrides<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let name = path
                .strip_prefix(dir)?
                .to_string_lossy()
                .replace('\\', "/");
            tracing::debug!("Template override: {}", name);
            files.push((path.to_path_buf(), Some(name)));
        }

        self.tera.add_template_files(files)?;
        Ok(())
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub url: String,
    pub root: String,
    /// Draft content is being shown; renders the exit-preview link
    pub preview: bool,
}

/// A post as shown in the listing and in the post header
#[derive(Debug, Clone, Serialize)]
pub struct PostSummaryData {
    pub uid: String,
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    /// Formatted first publication date, absent for drafts
    pub date: Option<String>,
    pub date_xml: Option<String>,
    pub reading_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    #[serde(flatten)]
    pub summary: PostSummaryData,
    pub banner: Option<String>,
    /// Formatted edit date, only when edited after publication
    pub edited: Option<String>,
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    /// Rendered body markup
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationData {
    pub current: usize,
    pub current_url: String,
    /// Link to the page with one more batch loaded; absent once exhausted
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub path: String,
}
