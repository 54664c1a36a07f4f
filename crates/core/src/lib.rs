pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{ContentError, ContentResult};
pub use types::{ContentId, ContentItem, ContentVersion, Identity, NewContentItem};
