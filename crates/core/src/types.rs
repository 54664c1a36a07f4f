use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ContentResult;

/// Opaque, stable identifier of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ContentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The actor behind a request, as resolved from a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub display_name: String,
}

/// A logical piece of marketing content. The current body is never stored
/// here; it is always the body of the highest-numbered version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub content_id: ContentId,
    pub organization_id: Uuid,
    pub title: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Request to create the shell of a content item, before any version exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContentItem {
    pub content_id: ContentId,
    pub organization_id: Uuid,
    pub title: String,
    pub created_by: Uuid,
}

/// Immutable snapshot of an item's body. `version_number` starts at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentVersion {
    pub id: Uuid,
    pub content_id: ContentId,
    pub version_number: u32,
    pub body: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ContentVersion {
    /// Number that follows `latest`, or 1 when there is none.
    pub fn next_number(content_id: &ContentId, latest: Option<u32>) -> ContentResult<u32> {
        latest
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| anyhow::anyhow!("version numbers exhausted for {content_id}").into())
    }

    /// Build the version that follows `latest` (or the first one when there is none).
    pub fn next_after(
        latest: Option<&ContentVersion>,
        content_id: &ContentId,
        body: String,
        author: &Identity,
    ) -> ContentResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            content_id: content_id.clone(),
            version_number: Self::next_number(content_id, latest.map(|v| v.version_number))?,
            body,
            author_id: author.user_id,
            created_at: Utc::now(),
        })
    }
}
