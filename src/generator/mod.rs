//! Generator module - renders the blog into the public directory
//!
//! Output layout:
//!
//! ```text
//! public/index.html              listing, first page
//! public/page/N/index.html       listing after N-1 "load more" steps
//! public/post/<uid>/index.html   post page with prev/next links
//! public/404.html                not-found view
//! ```

use anyhow::{Context as _, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tera::Context;
use walkdir::WalkDir;

use crate::adjacency::{self, Adjacency, NavLink};
use crate::comments::Utterances;
use crate::content::{HtmlRenderer, Post, RichTextRenderer};
use crate::helpers::{
    date_xml, listing_path, post_path, url_for, DateFormatOptions, FormatDate,
    LocaleDateFormatter,
};
use crate::i18n::I18n;
use crate::listing::{ListingController, ListingSnapshot, LoadOutcome};
use crate::source::{retry_transient, ContentSource, FetchError, Ordering, QueryOptions};
use crate::templates::{
    NavPost, PaginationData, PostPageData, PostSummaryData, SectionData, SiteData,
    TemplateRenderer,
};
use crate::Spacetraveling;

/// What a generation run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    pub listing_pages: usize,
    pub posts: usize,
    /// Post pages rendered with the not-found view
    pub not_found: usize,
}

/// Static site generator using Tera templates
pub struct Generator {
    app: Spacetraveling,
    source: Arc<dyn ContentSource>,
    renderer: TemplateRenderer,
    rich_text: Arc<dyn RichTextRenderer>,
    dates: Arc<dyn FormatDate>,
    i18n: I18n,
    comments: Option<Utterances>,
    preview: bool,
}

impl Generator {
    /// Create a generator with the built-in collaborators
    pub fn new(app: &Spacetraveling, source: Arc<dyn ContentSource>) -> Result<Self> {
        let config = &app.config;

        let mut renderer = TemplateRenderer::new()?;
        renderer.load_overrides(&app.templates_dir)?;

        let mut i18n = I18n::with_builtin(&config.language)?;
        i18n.load_languages(&app.languages_dir)?;

        let dates = LocaleDateFormatter::new(DateFormatOptions {
            locale: &config.locale,
            timezone: &config.timezone,
        })?;

        Ok(Self {
            app: app.clone(),
            source,
            renderer,
            rich_text: Arc::new(HtmlRenderer),
            dates: Arc::new(dates),
            i18n,
            comments: Utterances::from_config(config.comments.as_ref()),
            preview: false,
        })
    }

    /// Render post bodies with a different rich-text renderer
    pub fn with_rich_text_renderer(mut self, renderer: Arc<dyn RichTextRenderer>) -> Self {
        self.rich_text = renderer;
        self
    }

    pub fn with_date_formatter(mut self, formatter: Arc<dyn FormatDate>) -> Self {
        self.dates = formatter;
        self
    }

    /// Mark the output as showing draft content
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Generate the entire site
    pub async fn generate(&self) -> Result<GenerateReport> {
        fs::create_dir_all(&self.app.public_dir)?;

        self.copy_static_assets()?;

        let (listing, listing_pages) = self.generate_listing_pages().await?;
        let mut report = GenerateReport {
            listing_pages,
            ..GenerateReport::default()
        };

        for post in &listing.posts {
            if !is_safe_uid(&post.uid) {
                tracing::warn!("Skipping post with unsafe uid {:?}", post.uid);
                continue;
            }
            if self.generate_post_page(&post.uid).await? {
                report.posts += 1;
            } else {
                report.not_found += 1;
            }
        }

        let html = self.renderer.render("not_found.html", &self.base_context())?;
        self.write_page(Path::new("404.html"), &html)?;

        tracing::info!(
            "Generated {} listing pages and {} posts",
            report.listing_pages,
            report.posts
        );
        Ok(report)
    }

    /// Render one listing page per load-more step, until the listing is
    /// exhausted. Returns the final listing and the number of pages written.
    async fn generate_listing_pages(&self) -> Result<(ListingSnapshot, usize)> {
        let content = &self.app.config.content;
        let options = QueryOptions::default()
            .page_size(content.page_size)
            .ordering(Ordering::Descending);

        let first_page = self
            .source
            .query_by_type(&content.document_type, &options)
            .await
            .with_context(|| format!("Failed to query {:?} documents", content.document_type))?;

        let controller = ListingController::new(self.source.clone(), first_page);
        let delay = Duration::from_millis(content.retry_delay_ms);
        let mut page_num = 1;

        loop {
            let snapshot = controller.snapshot();
            self.render_listing_page(&snapshot, page_num)?;

            if !snapshot.has_more {
                return Ok((snapshot, page_num));
            }

            match controller
                .load_more_with_retry(content.fetch_retries, delay)
                .await
                .with_context(|| format!("Failed to load listing page {}", page_num + 1))?
            {
                LoadOutcome::Appended { .. } => page_num += 1,
                LoadOutcome::InFlight | LoadOutcome::Exhausted | LoadOutcome::Detached => {
                    return Ok((controller.snapshot(), page_num));
                }
            }
        }
    }

    fn render_listing_page(&self, snapshot: &ListingSnapshot, page_num: usize) -> Result<()> {
        let config = &self.app.config;
        let posts: Vec<PostSummaryData> =
            snapshot.posts.iter().map(|p| self.post_summary(p)).collect();

        let pagination = PaginationData {
            current: page_num,
            current_url: url_for(config, &listing_path(page_num)),
            next_link: snapshot
                .has_more
                .then(|| url_for(config, &listing_path(page_num + 1))),
        };

        let mut context = self.base_context();
        context.insert("posts", &posts);
        context.insert("pagination", &pagination);

        let html = self.renderer.render("index.html", &context)?;
        let output = Path::new(&listing_path(page_num)).join("index.html");
        self.write_page(&output, &html)
    }

    /// Render the page of one post. Returns false when the post could not
    /// be loaded and the not-found view was written in its place.
    async fn generate_post_page(&self, uid: &str) -> Result<bool> {
        let content = &self.app.config.content;
        let doc_type = content.document_type.as_str();
        let delay = Duration::from_millis(content.retry_delay_ms);
        let source = self.source.as_ref();
        // Links are percent-encoded, the directory keeps the raw uid
        let output = Path::new("post").join(uid).join("index.html");

        let fetched = retry_transient(content.fetch_retries, delay, move || {
            source.get_by_uid(doc_type, uid)
        })
        .await;
        let doc = match fetched {
            Ok(doc) => doc,
            Err(FetchError::NotFound { .. }) => {
                tracing::warn!("Post {} not found, rendering not-found page", uid);
                let html = self.renderer.render("not_found.html", &self.base_context())?;
                self.write_page(&output, &html)?;
                return Ok(false);
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to load post {}", uid)),
        };

        let post = match Post::from_document(&doc) {
            Ok(post) => post,
            Err(e) => {
                tracing::warn!("{}, rendering not-found page", e);
                let html = self.renderer.render("not_found.html", &self.base_context())?;
                self.write_page(&output, &html)?;
                return Ok(false);
            }
        };

        let published = post.first_publication_date;
        let adjacency = retry_transient(content.fetch_retries, delay, move || {
            adjacency::resolve(source, doc_type, uid, published)
        })
        .await
        .with_context(|| format!("Failed to resolve neighbours of {}", uid))?;

        let html = self.render_post(&post, &adjacency)?;
        self.write_page(&output, &html)?;
        Ok(true)
    }

    fn render_post(&self, post: &Post, adjacency: &Adjacency) -> Result<String> {
        let config = &self.app.config;

        let mut summary = self.post_summary(post);
        summary.reading_time = Some(
            self.i18n
                .get_count("reading_time", post.reading_time(config.reading.words_per_minute)),
        );

        let page = PostPageData {
            summary,
            banner: post.banner.clone(),
            edited: post
                .edited_at()
                .map(|d| self.dates.format(&d, &config.edit_date_format)),
            sections: post
                .content
                .iter()
                .map(|block| SectionData {
                    heading: block.heading.clone(),
                    html: self.rich_text.render(&block.body),
                })
                .collect(),
        };

        let mut context = self.base_context();
        context.insert("post", &page);
        context.insert("prev_post", &adjacency.previous.as_ref().map(|l| self.nav(l)));
        context.insert("next_post", &adjacency.next.as_ref().map(|l| self.nav(l)));
        context.insert(
            "comments",
            &self.comments.as_ref().map(|c| c.script_tag()),
        );

        self.renderer.render("post.html", &context)
    }

    fn post_summary(&self, post: &Post) -> PostSummaryData {
        let config = &self.app.config;
        PostSummaryData {
            uid: post.uid.clone(),
            path: url_for(config, &post_path(&post.uid)),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: post
                .first_publication_date
                .map(|d| self.dates.format(&d, &config.date_format)),
            date_xml: post.first_publication_date.map(|d| date_xml(&d)),
            reading_time: None,
        }
    }

    fn nav(&self, link: &NavLink) -> NavPost {
        NavPost {
            title: link.title.clone(),
            path: url_for(&self.app.config, &post_path(&link.uid)),
        }
    }

    /// Create a base context with common variables
    fn base_context(&self) -> Context {
        let config = &self.app.config;
        let site = SiteData {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            url: config.url.clone(),
            root: url_for(config, ""),
            preview: self.preview,
        };

        let mut context = Context::new();
        context.insert("site", &site);
        context.insert("t", &self.i18n.get_all_translations());
        context
    }

    fn write_page(&self, relative: &Path, html: &str) -> Result<()> {
        let output_path = self.app.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, html)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Copy static assets (images, styles) to the public directory
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.app.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.app.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
        }

        Ok(())
    }
}

/// A uid that can be used as a single directory name
fn is_safe_uid(uid: &str) -> bool {
    !uid.is_empty() && uid != "." && uid != ".." && !uid.contains(['/', '\\'])
}
