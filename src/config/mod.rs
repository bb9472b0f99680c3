//! Configuration module

mod site;

pub use site::CommentsConfig;
pub use site::ContentConfig;
pub use site::ReadingConfig;
pub use site::SiteConfig;
