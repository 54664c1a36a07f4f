use thiserror::Error;
use uuid::Uuid;

use crate::types::ContentId;

pub type ContentResult<T> = Result<T, ContentError>;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Content item not found: {content_id}")]
    NotFound { content_id: ContentId },

    #[error("Content item already exists: {content_id}")]
    AlreadyExists { content_id: ContentId },

    /// Another writer claimed the version slot first. Re-read latest and retry.
    #[error("Version conflict on {content_id} at version {version_number}")]
    Conflict {
        content_id: ContentId,
        version_number: u32,
    },

    #[error("No authenticated user for this request")]
    Unauthenticated,

    #[error("User {user_id} is not a member of organization {organization_id}")]
    Forbidden { user_id: Uuid, organization_id: Uuid },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ContentError {
    pub fn not_found(content_id: &ContentId) -> Self {
        Self::NotFound {
            content_id: content_id.clone(),
        }
    }

    pub fn conflict(content_id: &ContentId, version_number: u32) -> Self {
        Self::Conflict {
            content_id: content_id.clone(),
            version_number,
        }
    }

    /// Only version collisions are safe to retry; everything else is surfaced as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_are_retryable() {
        let id = ContentId::from("c1");
        assert!(ContentError::conflict(&id, 2).is_retryable());
        assert!(!ContentError::not_found(&id).is_retryable());
        assert!(!ContentError::Unauthenticated.is_retryable());
        assert!(!ContentError::Internal(anyhow::anyhow!("connection reset")).is_retryable());
    }

    #[test]
    fn test_error_messages_name_the_item() {
        let id = ContentId::from("spring-launch-email");
        let msg = ContentError::conflict(&id, 7).to_string();
        assert_eq!(msg, "Version conflict on spring-launch-email at version 7");
        let msg = ContentError::not_found(&id).to_string();
        assert!(msg.contains("spring-launch-email"));
    }
}
