//! Organization membership, as an explicit repository rather than an
//! implicit schema relation.

use async_trait::async_trait;
use dashmap::DashMap;
use mktops_core::config::AuthConfig;
use mktops_core::ContentResult;
use std::collections::HashSet;
use uuid::Uuid;

#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn is_member(&self, user_id: Uuid, organization_id: Uuid) -> ContentResult<bool>;

    async fn organizations_for(&self, user_id: Uuid) -> ContentResult<Vec<Uuid>>;
}

pub struct InMemoryMembershipDirectory {
    memberships: DashMap<Uuid, HashSet<Uuid>>,
}

impl InMemoryMembershipDirectory {
    pub fn new() -> Self {
        Self {
            memberships: DashMap::new(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let directory = Self::new();
        for s in &config.sessions {
            for org in &s.organizations {
                directory.grant(s.user_id, *org);
            }
        }
        directory
    }

    pub fn grant(&self, user_id: Uuid, organization_id: Uuid) {
        self.memberships.entry(user_id).or_default().insert(organization_id);
    }

    /// Returns whether the membership existed.
    pub fn revoke(&self, user_id: Uuid, organization_id: Uuid) -> bool {
        self.memberships
            .get_mut(&user_id)
            .map_or(false, |mut orgs| orgs.remove(&organization_id))
    }
}

impl Default for InMemoryMembershipDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipDirectory for InMemoryMembershipDirectory {
    async fn is_member(&self, user_id: Uuid, organization_id: Uuid) -> ContentResult<bool> {
        Ok(self
            .memberships
            .get(&user_id)
            .map_or(false, |orgs| orgs.contains(&organization_id)))
    }

    async fn organizations_for(&self, user_id: Uuid) -> ContentResult<Vec<Uuid>> {
        let mut orgs: Vec<Uuid> = self
            .memberships
            .get(&user_id)
            .map(|orgs| orgs.iter().copied().collect())
            .unwrap_or_default();
        orgs.sort();
        Ok(orgs)
    }
}
