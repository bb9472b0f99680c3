//! Helper functions for templates
//!
//! Date formatting and URL generation used when building template contexts.

mod date;
mod url;

pub use date::*;
pub use url::*;
