//! Authoring entry point: attributes edits to the session's user and checks
//! organization membership before the versioning policy runs.

use mktops_core::{ContentError, ContentId, ContentItem, ContentResult, ContentVersion, Identity, NewContentItem};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::identity::IdentityResolver;
use crate::membership::MembershipDirectory;
use crate::policy::{AppliedEdit, VersioningPolicy};

/// Result of submitting an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EditOutcome {
    Created { version: ContentVersion },
    /// The body matched the latest version; nothing was written.
    Unchanged { latest_version_number: u32 },
}

pub struct AuthoringService {
    policy: Arc<VersioningPolicy>,
    identities: Arc<dyn IdentityResolver>,
    memberships: Arc<dyn MembershipDirectory>,
}

impl AuthoringService {
    pub fn new(
        policy: Arc<VersioningPolicy>,
        identities: Arc<dyn IdentityResolver>,
        memberships: Arc<dyn MembershipDirectory>,
    ) -> Self {
        Self {
            policy,
            identities,
            memberships,
        }
    }

    async fn current_user(&self, session_token: &str) -> ContentResult<Identity> {
        self.identities
            .resolve(session_token)
            .await?
            .ok_or(ContentError::Unauthenticated)
    }

    async fn require_member(&self, user: &Identity, organization_id: Uuid) -> ContentResult<()> {
        if self.memberships.is_member(user.user_id, organization_id).await? {
            Ok(())
        } else {
            Err(ContentError::Forbidden {
                user_id: user.user_id,
                organization_id,
            })
        }
    }

    /// Create an empty content item in one of the caller's organizations.
    pub async fn create_item(
        &self,
        session_token: &str,
        content_id: ContentId,
        organization_id: Uuid,
        title: String,
    ) -> ContentResult<ContentItem> {
        let user = self.current_user(session_token).await?;
        self.require_member(&user, organization_id).await?;
        let item = self
            .policy
            .store()
            .create_item(NewContentItem {
                content_id,
                organization_id,
                title,
                created_by: user.user_id,
            })
            .await?;
        info!(content_id = %item.content_id, %organization_id, "Content item created");
        Ok(item)
    }

    /// Submit a new body for an item on behalf of the session's user.
    pub async fn submit_edit(
        &self,
        session_token: &str,
        content_id: &ContentId,
        new_body: &str,
    ) -> ContentResult<EditOutcome> {
        let user = self.current_user(session_token).await?;
        let item = self
            .policy
            .store()
            .get_item(content_id)
            .await?
            .ok_or_else(|| ContentError::not_found(content_id))?;
        self.require_member(&user, item.organization_id).await?;

        match self
            .policy
            .apply_edit_with_retry(content_id, new_body, &user)
            .await?
        {
            AppliedEdit::Created(version) => Ok(EditOutcome::Created { version }),
            AppliedEdit::Unchanged(latest) => {
                debug!(
                    %content_id,
                    latest_version_number = latest.version_number,
                    "Edit left content unchanged"
                );
                Ok(EditOutcome::Unchanged {
                    latest_version_number: latest.version_number,
                })
            }
        }
    }

    /// Version history of an item the caller's organization owns.
    pub async fn history(&self, session_token: &str, content_id: &ContentId) -> ContentResult<Vec<ContentVersion>> {
        let user = self.current_user(session_token).await?;
        let item = self
            .policy
            .store()
            .get_item(content_id)
            .await?
            .ok_or_else(|| ContentError::not_found(content_id))?;
        self.require_member(&user, item.organization_id).await?;
        self.policy.history(content_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SessionIdentityResolver;
    use crate::membership::InMemoryMembershipDirectory;
    use crate::store::{ContentStore, InMemoryContentStore};
    use mktops_core::config::VersioningConfig;

    struct Fixture {
        service: AuthoringService,
        store: Arc<InMemoryContentStore>,
        org: Uuid,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryContentStore::new());
        let policy = Arc::new(VersioningPolicy::new(store.clone(), &VersioningConfig::default()));

        let sessions = Arc::new(SessionIdentityResolver::new(24));
        let members = Arc::new(InMemoryMembershipDirectory::new());
        let org = Uuid::new_v4();

        let editor = Identity {
            user_id: Uuid::new_v4(),
            display_name: "Editor".to_string(),
        };
        sessions.insert_session("editor", editor.clone());
        members.grant(editor.user_id, org);

        sessions.insert_session(
            "outsider",
            Identity {
                user_id: Uuid::new_v4(),
                display_name: "Outsider".to_string(),
            },
        );

        Fixture {
            service: AuthoringService::new(policy, sessions, members),
            store,
            org,
        }
    }

    #[tokio::test]
    async fn test_edit_flow() {
        let f = fixture();
        let id = ContentId::from("c1");
        f.service
            .create_item("editor", id.clone(), f.org, "Welcome email".into())
            .await
            .unwrap();

        let outcome = f.service.submit_edit("editor", &id, "Hello").await.unwrap();
        let version = match outcome {
            EditOutcome::Created { version } => version,
            other => panic!("expected a new version, got {other:?}"),
        };
        assert_eq!(version.version_number, 1);

        let outcome = f.service.submit_edit("editor", &id, "Hello").await.unwrap();
        assert_eq!(
            outcome,
            EditOutcome::Unchanged {
                latest_version_number: 1
            }
        );

        f.service.submit_edit("editor", &id, "Hello world").await.unwrap();
        let history = f.service.history("editor", &id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].body, "Hello world");
    }

    #[tokio::test]
    async fn test_unknown_session_is_rejected_before_any_write() {
        let f = fixture();
        let id = ContentId::from("c1");
        f.service
            .create_item("editor", id.clone(), f.org, "Welcome email".into())
            .await
            .unwrap();

        let err = f.service.submit_edit("forged", &id, "Hello").await.unwrap_err();
        assert!(matches!(err, ContentError::Unauthenticated));
        assert!(f.store.list_versions(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_member_is_forbidden() {
        let f = fixture();
        let id = ContentId::from("c1");
        f.service
            .create_item("editor", id.clone(), f.org, "Welcome email".into())
            .await
            .unwrap();

        let err = f.service.submit_edit("outsider", &id, "Hello").await.unwrap_err();
        assert!(matches!(err, ContentError::Forbidden { .. }));
        assert!(f.store.list_versions(&id).await.unwrap().is_empty());

        let err = f
            .service
            .create_item("outsider", ContentId::from("c2"), f.org, "Nope".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_edit_of_missing_item_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .submit_edit("editor", &ContentId::from("ghost"), "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotFound { .. }));
    }

    /// Store that lets another writer append right after the first
    /// latest-version read it serves.
    struct InterleavingStore {
        inner: InMemoryContentStore,
        interleaved: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl ContentStore for InterleavingStore {
        async fn create_item(&self, req: NewContentItem) -> ContentResult<ContentItem> {
            self.inner.create_item(req).await
        }

        async fn get_item(&self, content_id: &ContentId) -> ContentResult<Option<ContentItem>> {
            self.inner.get_item(content_id).await
        }

        async fn get_latest_version(&self, content_id: &ContentId) -> ContentResult<Option<ContentVersion>> {
            let latest = self.inner.get_latest_version(content_id).await?;
            if !self.interleaved.swap(true, std::sync::atomic::Ordering::SeqCst) {
                let other = Identity {
                    user_id: Uuid::new_v4(),
                    display_name: "Other editor".to_string(),
                };
                let next = ContentVersion::next_after(latest.as_ref(), content_id, "Other copy".into(), &other)?;
                self.inner.append_version(next).await?;
            }
            Ok(latest)
        }

        async fn list_versions(&self, content_id: &ContentId) -> ContentResult<Vec<ContentVersion>> {
            self.inner.list_versions(content_id).await
        }

        async fn append_version(&self, version: ContentVersion) -> ContentResult<ContentVersion> {
            self.inner.append_version(version).await
        }

        async fn append_version_if_latest_matches(
            &self,
            expected_latest: Option<u32>,
            version: ContentVersion,
        ) -> ContentResult<ContentVersion> {
            self.inner.append_version_if_latest_matches(expected_latest, version).await
        }
    }

    #[tokio::test]
    async fn test_unchanged_reports_the_version_it_compared_against() {
        let inner = InMemoryContentStore::new();
        let org = Uuid::new_v4();
        let editor = Identity {
            user_id: Uuid::new_v4(),
            display_name: "Editor".to_string(),
        };
        let id = ContentId::from("c1");
        inner
            .create_item(NewContentItem {
                content_id: id.clone(),
                organization_id: org,
                title: "Welcome email".to_string(),
                created_by: editor.user_id,
            })
            .await
            .unwrap();
        let v1 = ContentVersion::next_after(None, &id, "Hello".into(), &editor).unwrap();
        inner.append_version(v1).await.unwrap();

        let store = Arc::new(InterleavingStore {
            inner,
            interleaved: std::sync::atomic::AtomicBool::new(false),
        });
        let policy = Arc::new(VersioningPolicy::new(store.clone(), &VersioningConfig::default()));
        let sessions = Arc::new(SessionIdentityResolver::new(24));
        let members = Arc::new(InMemoryMembershipDirectory::new());
        sessions.insert_session("s", editor.clone());
        members.grant(editor.user_id, org);
        let service = AuthoringService::new(policy, sessions, members);

        let outcome = service.submit_edit("s", &id, "Hello").await.unwrap();
        assert_eq!(
            outcome,
            EditOutcome::Unchanged {
                latest_version_number: 1
            }
        );

        // The other writer's version landed, but it is not what the edit was compared with.
        let history = store.list_versions(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].body, "Hello");
        assert_eq!(history[1].body, "Other copy");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(EditOutcome::Unchanged {
            latest_version_number: 4,
        })
        .unwrap();
        assert_eq!(json["status"], "unchanged");
        assert_eq!(json["latest_version_number"], 4);
    }
}
