//! List site content

use anyhow::{Context, Result};
use std::time::Duration;

use crate::commands::generate::{build_source, SourceOptions};
use crate::content::Post;
use crate::listing::ListingController;
use crate::source::{Ordering, QueryOptions};
use crate::Spacetraveling;

/// Load every post, newest first
pub async fn load_posts(app: &Spacetraveling, options: &SourceOptions) -> Result<Vec<Post>> {
    let content = &app.config.content;
    let source = build_source(app, options)?;

    let query = QueryOptions::default()
        .page_size(content.page_size)
        .ordering(Ordering::Descending);
    let first_page = source
        .query_by_type(&content.document_type, &query)
        .await
        .with_context(|| format!("Failed to query {:?} documents", content.document_type))?;

    let controller = ListingController::new(source, first_page);
    controller
        .load_all(
            content.fetch_retries,
            Duration::from_millis(content.retry_delay_ms),
        )
        .await?;

    Ok(controller.snapshot().posts)
}

/// Print the posts of the site
pub async fn run(app: &Spacetraveling, options: &SourceOptions) -> Result<()> {
    let posts = load_posts(app, options).await?;

    println!("Posts ({}):", posts.len());
    for post in posts {
        let date = post
            .first_publication_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "draft".to_string());
        println!("  {} - {} [{}]", date, post.title, post.uid);
    }

    Ok(())
}
