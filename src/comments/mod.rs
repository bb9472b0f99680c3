//! Utterances comment widget embed
//!
//! The widget itself is an externally hosted script; we only emit the tag
//! that loads it, once per post page.

use crate::config::CommentsConfig;
use crate::content::rich_text::escape_html;

const CLIENT_URL: &str = "https://utteranc.es/client.js";

/// Script tag builder for one configured repository
#[derive(Debug, Clone)]
pub struct Utterances {
    repo: String,
    issue_term: String,
    theme: String,
}

impl Utterances {
    /// `None` when comments are not configured
    pub fn from_config(config: Option<&CommentsConfig>) -> Option<Self> {
        let config = config?;
        if config.repo.trim().is_empty() {
            tracing::warn!("comments.repo is empty, comment widget disabled");
            return None;
        }
        Some(Self {
            repo: config.repo.clone(),
            issue_term: config.issue_term.clone(),
            theme: config.theme.clone(),
        })
    }

    /// The `<script>` tag mounting the widget
    pub fn script_tag(&self) -> String {
        format!(
            r#"<script src="{}" repo="{}" issue-term="{}" theme="{}" crossorigin="anonymous" async></script>"#,
            CLIENT_URL,
            escape_html(&self.repo),
            escape_html(&self.issue_term),
            escape_html(&self.theme)
        )
    }
}
