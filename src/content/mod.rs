//! Content module - raw API documents, posts and structured text

mod document;
mod post;
pub mod rich_text;

pub use document::{decode_documents, parse_timestamp, RawDocument};
pub use post::{normalize_batch, ContentBlock, NormalizeError, Post};
pub use rich_text::{HtmlRenderer, RichText, RichTextRenderer, TextNode};
