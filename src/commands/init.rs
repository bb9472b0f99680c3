//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

const CONFIG: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
language: pt-BR
locale: pt_BR
timezone: America/Sao_Paulo

# URL
url: http://example.com
root: /

# Directory
public_dir: public
static_dir: static
languages_dir: languages

# Content API
content:
  # endpoint: https://your-repository.cdn.prismic.io/api/v2
  # access_token: ''
  document_type: posts
  page_size: 1
  fixtures: fixtures/posts.json
  fetch_retries: 3
  retry_delay_ms: 500
  request_timeout_secs: 30

# Reading time
reading:
  words_per_minute: 200

# Date / Time format
date_format: dd MMM yyyy
edit_date_format: "dd MMM yyyy, 'às' k:m"

# Comments (utterances)
# comments:
#   repo: owner/repository
#   issue_term: pathname
#   theme: github-dark
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    // Create directory structure
    fs::create_dir_all(target_dir)?;
    fs::create_dir_all(target_dir.join("static"))?;
    fs::create_dir_all(target_dir.join("languages"))?;
    fs::create_dir_all(target_dir.join("fixtures"))?;

    fs::write(target_dir.join("_config.yml"), CONFIG)?;

    // A sample post so the site generates without an API
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%z");
    let sample = serde_json::json!({
        "results": [{
            "id": "hello-world",
            "uid": "hello-world",
            "type": "posts",
            "first_publication_date": now.to_string(),
            "last_publication_date": now.to_string(),
            "data": {
                "title": "Hello World",
                "subtitle": "Your very first post",
                "author": "spacetraveling",
                "banner": { "url": null },
                "content": [{
                    "heading": "Quick Start",
                    "body": [
                        { "type": "paragraph", "text": "Point content.endpoint at your repository, then run generate.", "spans": [] }
                    ]
                }]
            }
        }]
    });
    fs::write(
        target_dir.join("fixtures/posts.json"),
        serde_json::to_string_pretty(&sample)?,
    )?;

    Ok(())
}
