//! Content versioning policy: snapshot a new version only when the body changed.
//!
//! Bodies are compared byte for byte. Callers that want whitespace- or
//! encoding-insensitive detection normalize before calling.

use mktops_core::config::VersioningConfig;
use mktops_core::{ContentId, ContentResult, ContentVersion, Identity};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::store::ContentStore;

/// What an edit did, with the version it produced or was compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AppliedEdit {
    Created(ContentVersion),
    Unchanged(ContentVersion),
}

impl AppliedEdit {
    fn created(self) -> Option<ContentVersion> {
        match self {
            Self::Created(version) => Some(version),
            Self::Unchanged(_) => None,
        }
    }
}

pub struct VersioningPolicy {
    store: Arc<dyn ContentStore>,
    max_conflict_attempts: u32,
}

impl VersioningPolicy {
    pub fn new(store: Arc<dyn ContentStore>, config: &VersioningConfig) -> Self {
        Self {
            store,
            max_conflict_attempts: config.max_conflict_attempts.max(1),
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    fn body_changed(latest: Option<&ContentVersion>, new_body: &str) -> bool {
        latest.map_or(true, |v| v.body != new_body)
    }

    /// Whether `new_body` warrants a new version. Always true for an item
    /// with no versions. Fails with `NotFound` for an unknown item.
    pub async fn should_version(&self, content_id: &ContentId, new_body: &str) -> ContentResult<bool> {
        let latest = self.store.get_latest_version(content_id).await?;
        Ok(Self::body_changed(latest.as_ref(), new_body))
    }

    /// Append a version when the body changed, in a single attempt.
    ///
    /// Returns `Ok(None)` without writing when the body matches the latest
    /// version. A concurrent writer that got there first surfaces as
    /// `ContentError::Conflict`.
    pub async fn create_version_if_changed(
        &self,
        content_id: &ContentId,
        new_body: &str,
        author: &Identity,
    ) -> ContentResult<Option<ContentVersion>> {
        Ok(self.apply_edit(content_id, new_body, author).await?.created())
    }

    /// `create_version_if_changed`, retried on `Conflict` up to the
    /// configured number of attempts. Other errors are returned at once.
    pub async fn create_version_with_retry(
        &self,
        content_id: &ContentId,
        new_body: &str,
        author: &Identity,
    ) -> ContentResult<Option<ContentVersion>> {
        Ok(self
            .apply_edit_with_retry(content_id, new_body, author)
            .await?
            .created())
    }

    /// Decide and append from a single read of the latest version. An
    /// unchanged result carries that same version.
    pub(crate) async fn apply_edit(
        &self,
        content_id: &ContentId,
        new_body: &str,
        author: &Identity,
    ) -> ContentResult<AppliedEdit> {
        let latest = self.store.get_latest_version(content_id).await?;
        if let Some(current) = latest.as_ref().filter(|v| v.body == new_body) {
            debug!(%content_id, version_number = current.version_number, "Body unchanged, no new version");
            metrics::counter!("versioning.versions.unchanged").increment(1);
            return Ok(AppliedEdit::Unchanged(current.clone()));
        }

        let expected_latest = latest.as_ref().map(|v| v.version_number);
        let version = ContentVersion::next_after(latest.as_ref(), content_id, new_body.to_string(), author)?;

        match self
            .store
            .append_version_if_latest_matches(expected_latest, version)
            .await
        {
            Ok(created) => {
                info!(
                    %content_id,
                    version_number = created.version_number,
                    author_id = %author.user_id,
                    "Content version created"
                );
                metrics::counter!("versioning.versions.created").increment(1);
                Ok(AppliedEdit::Created(created))
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(%content_id, error = %e, "Version append lost a race");
                    metrics::counter!("versioning.conflicts").increment(1);
                }
                Err(e)
            }
        }
    }

    pub(crate) async fn apply_edit_with_retry(
        &self,
        content_id: &ContentId,
        new_body: &str,
        author: &Identity,
    ) -> ContentResult<AppliedEdit> {
        let mut attempt = 1;
        loop {
            match self.apply_edit(content_id, new_body, author).await {
                Err(e) if e.is_retryable() && attempt < self.max_conflict_attempts => {
                    debug!(%content_id, attempt, "Retrying after version conflict");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    pub async fn latest_version(&self, content_id: &ContentId) -> ContentResult<Option<ContentVersion>> {
        self.store.get_latest_version(content_id).await
    }

    /// All versions of an item, oldest first.
    pub async fn history(&self, content_id: &ContentId) -> ContentResult<Vec<ContentVersion>> {
        self.store.list_versions(content_id).await
    }

    /// Body of the highest-numbered version.
    pub async fn current_body(&self, content_id: &ContentId) -> ContentResult<Option<String>> {
        Ok(self.latest_version(content_id).await?.map(|v| v.body))
    }
}
