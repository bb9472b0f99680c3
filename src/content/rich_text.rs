//! Structured text nodes and their HTML rendering
//!
//! Post bodies are kept as the API's structured text. Turning them into
//! markup happens at render time through a [`RichTextRenderer`], so the
//! renderer can be swapped without touching the post model.

use serde::{Deserialize, Serialize};

/// A block of structured text (paragraph, heading, list item, image...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub spans: Vec<Span>,

    /// Image source for `image` nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    /// oEmbed payload for `embed` nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<serde_json::Value>,
}

impl TextNode {
    /// Plain paragraph with no styling
    pub fn paragraph(text: &str) -> Self {
        Self {
            kind: "paragraph".to_string(),
            text: text.to_string(),
            spans: Vec::new(),
            url: None,
            alt: None,
            oembed: None,
        }
    }
}

/// Inline styling over a character range of a node's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Ordered structured text, as stored in a content block body
pub type RichText = Vec<TextNode>;

/// Converts structured text into markup
pub trait RichTextRenderer: Send + Sync {
    fn render(&self, nodes: &[TextNode]) -> String;
}

impl<F> RichTextRenderer for F
where
    F: Fn(&[TextNode]) -> String + Send + Sync,
{
    fn render(&self, nodes: &[TextNode]) -> String {
        self(nodes)
    }
}

/// Default HTML renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl RichTextRenderer for HtmlRenderer {
    fn render(&self, nodes: &[TextNode]) -> String {
        let mut html = String::new();
        let mut open_list: Option<&'static str> = None;

        for node in nodes {
            let list = match node.kind.as_str() {
                "list-item" => Some("ul"),
                "o-list-item" => Some("ol"),
                _ => None,
            };

            if open_list != list {
                if let Some(tag) = open_list {
                    html.push_str(&format!("</{}>", tag));
                }
                if let Some(tag) = list {
                    html.push_str(&format!("<{}>", tag));
                }
                open_list = list;
            }

            html.push_str(&render_node(node));
        }

        if let Some(tag) = open_list {
            html.push_str(&format!("</{}>", tag));
        }

        html
    }
}

fn render_node(node: &TextNode) -> String {
    let inner = || render_spans(&node.text, &node.spans);

    match node.kind.as_str() {
        "paragraph" => format!("<p>{}</p>", inner()),
        "preformatted" => format!("<pre>{}</pre>", inner()),
        "list-item" | "o-list-item" => format!("<li>{}</li>", inner()),
        "heading1" | "heading2" | "heading3" | "heading4" | "heading5" | "heading6" => {
            let level = &node.kind["heading".len()..];
            format!("<h{}>{}</h{}>", level, inner(), level)
        }
        "image" => {
            let src = node.url.as_deref().unwrap_or_default();
            let alt = node.alt.as_deref().unwrap_or_default();
            format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                escape_html(src),
                escape_html(alt)
            )
        }
        "embed" => {
            let oembed = node.oembed.as_ref();
            let html = oembed
                .and_then(|o| o.get("html"))
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let url = oembed
                .and_then(|o| o.get("embed_url"))
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            format!(r#"<div data-oembed="{}">{}</div>"#, escape_html(url), html)
        }
        other => {
            tracing::debug!("Rendering unknown node type {:?} as paragraph", other);
            format!("<p>{}</p>", inner())
        }
    }
}

/// Render text with its spans as nested inline elements.
///
/// Span offsets are character positions. Overlapping spans that are not
/// properly nested get closed and reopened around each other.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut sorted: Vec<&Span> = spans
        .iter()
        .filter(|s| s.start < s.end && s.end <= chars.len())
        .collect();
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;

    for i in 0..=chars.len() {
        if open.iter().any(|s| s.end == i) {
            let mut reopen = Vec::new();
            while let Some(span) = open.pop() {
                out.push_str(&close_tag(span));
                if span.end != i {
                    reopen.push(span);
                }
                if !open.iter().any(|s| s.end == i) {
                    break;
                }
            }
            for span in reopen.into_iter().rev() {
                out.push_str(&open_tag(span));
                open.push(span);
            }
        }

        while next < sorted.len() && sorted[next].start == i {
            out.push_str(&open_tag(sorted[next]));
            open.push(sorted[next]);
            next += 1;
        }

        if let Some(&c) = chars.get(i) {
            match c {
                '\n' => out.push_str("<br />"),
                _ => push_escaped(&mut out, c),
            }
        }
    }

    out
}

fn open_tag(span: &Span) -> String {
    match span.kind.as_str() {
        "strong" => "<strong>".to_string(),
        "em" => "<em>".to_string(),
        "hyperlink" => {
            let data = span.data.as_ref();
            let url = data
                .and_then(|d| d.get("url"))
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let target = data
                .and_then(|d| d.get("target"))
                .and_then(|v| v.as_str());
            match target {
                Some(target) => format!(
                    r#"<a href="{}" target="{}" rel="noopener">"#,
                    escape_html(url),
                    escape_html(target)
                ),
                None => format!(r#"<a href="{}">"#, escape_html(url)),
            }
        }
        "label" => {
            let label = span
                .data
                .as_ref()
                .and_then(|d| d.get("label"))
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            format!(r#"<span class="{}">"#, escape_html(label))
        }
        _ => "<span>".to_string(),
    }
}

fn close_tag(span: &Span) -> String {
    match span.kind.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        "hyperlink" => "</a>",
        _ => "</span>",
    }
    .to_string()
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        _ => out.push(c),
    }
}

/// Escape text for HTML content or attribute values
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        push_escaped(&mut out, c);
    }
    out
}
