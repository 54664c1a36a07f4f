//! Content store: append-only version history per content item.
//!
//! `InMemoryContentStore` keeps each item and its versions in a single DashMap
//! entry, so the compare-and-append below runs under that entry's shard lock.
//! A relational backend gets the same guarantee from a unique index on
//! `(content_id, version_number)`.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mktops_core::{ContentError, ContentId, ContentItem, ContentResult, ContentVersion, NewContentItem};
use tracing::{debug, info};
use uuid::Uuid;

/// Organization that owns the seeded demo items.
pub const DEMO_ORGANIZATION_ID: Uuid = Uuid::from_u128(0x5d2c_84a1_7e0f_4b6a_9c31_0000_0000_0001);
/// Author of the seeded demo versions.
pub const DEMO_AUTHOR_ID: Uuid = Uuid::from_u128(0x5d2c_84a1_7e0f_4b6a_9c31_0000_0000_0002);

/// Persistent, append-only collection of content versions.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Create the shell of an item. Fails with `AlreadyExists` on a duplicate id.
    async fn create_item(&self, req: NewContentItem) -> ContentResult<ContentItem>;

    async fn get_item(&self, content_id: &ContentId) -> ContentResult<Option<ContentItem>>;

    /// Highest-numbered version, or `None` for an item with no versions yet.
    async fn get_latest_version(&self, content_id: &ContentId) -> ContentResult<Option<ContentVersion>>;

    /// Every version of the item, oldest first.
    async fn list_versions(&self, content_id: &ContentId) -> ContentResult<Vec<ContentVersion>>;

    /// Append a version. Fails with `Conflict` if its number is already taken.
    async fn append_version(&self, version: ContentVersion) -> ContentResult<ContentVersion>;

    /// Append a version only if the item's latest version number still equals
    /// `expected_latest` (`None` meaning "no versions yet").
    async fn append_version_if_latest_matches(
        &self,
        expected_latest: Option<u32>,
        version: ContentVersion,
    ) -> ContentResult<ContentVersion>;
}

struct ItemRecord {
    item: ContentItem,
    /// Ordered by `version_number`, ascending and gap-free.
    versions: Vec<ContentVersion>,
}

impl ItemRecord {
    fn latest_number(&self) -> Option<u32> {
        self.versions.last().map(|v| v.version_number)
    }
}

/// Thread-safe in-memory content store.
pub struct InMemoryContentStore {
    items: DashMap<ContentId, ItemRecord>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
        }
    }

    /// Store pre-populated with a few demo items and their history.
    pub fn with_demo_data() -> Self {
        let store = Self::new();
        store.seed_demo_data();
        info!(items = store.items.len(), "Content store initialized with demo data");
        store
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    fn seed_demo_data(&self) {
        let now = Utc::now();
        let items = vec![
            (
                "holiday-email-hero",
                "Holiday email hero copy",
                vec![
                    "Our biggest sale of the year starts now.",
                    "Our biggest sale of the year starts now. Free shipping on all orders.",
                ],
            ),
            (
                "spring-launch-brief",
                "Spring launch creative brief",
                vec!["Objective: drive trial of the spring collection among lapsed buyers."],
            ),
            ("loyalty-push-copy", "Loyalty tier upgrade push notification", vec![]),
        ];

        for (id, title, bodies) in items {
            let content_id = ContentId::from(id);
            let created_at = now - Duration::days(14);
            let versions = bodies
                .iter()
                .enumerate()
                .map(|(i, body)| ContentVersion {
                    id: Uuid::new_v4(),
                    content_id: content_id.clone(),
                    version_number: i as u32 + 1,
                    body: body.to_string(),
                    author_id: DEMO_AUTHOR_ID,
                    created_at: created_at + Duration::days(i as i64),
                })
                .collect();
            self.items.insert(
                content_id.clone(),
                ItemRecord {
                    item: ContentItem {
                        content_id,
                        organization_id: DEMO_ORGANIZATION_ID,
                        title: title.to_string(),
                        created_by: DEMO_AUTHOR_ID,
                        created_at,
                    },
                    versions,
                },
            );
        }
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn create_item(&self, req: NewContentItem) -> ContentResult<ContentItem> {
        match self.items.entry(req.content_id.clone()) {
            Entry::Occupied(_) => Err(ContentError::AlreadyExists {
                content_id: req.content_id,
            }),
            Entry::Vacant(slot) => {
                let item = ContentItem {
                    content_id: req.content_id,
                    organization_id: req.organization_id,
                    title: req.title,
                    created_by: req.created_by,
                    created_at: Utc::now(),
                };
                debug!(content_id = %item.content_id, "Content item created");
                slot.insert(ItemRecord {
                    item: item.clone(),
                    versions: Vec::new(),
                });
                Ok(item)
            }
        }
    }

    async fn get_item(&self, content_id: &ContentId) -> ContentResult<Option<ContentItem>> {
        Ok(self.items.get(content_id).map(|r| r.item.clone()))
    }

    async fn get_latest_version(&self, content_id: &ContentId) -> ContentResult<Option<ContentVersion>> {
        self.items
            .get(content_id)
            .map(|r| r.versions.last().cloned())
            .ok_or_else(|| ContentError::not_found(content_id))
    }

    async fn list_versions(&self, content_id: &ContentId) -> ContentResult<Vec<ContentVersion>> {
        self.items
            .get(content_id)
            .map(|r| r.versions.clone())
            .ok_or_else(|| ContentError::not_found(content_id))
    }

    async fn append_version(&self, version: ContentVersion) -> ContentResult<ContentVersion> {
        if version.version_number == 0 {
            return Err(anyhow::anyhow!("version numbers start at 1").into());
        }
        let mut entry = self
            .items
            .get_mut(&version.content_id)
            .ok_or_else(|| ContentError::not_found(&version.content_id))?;
        let expected = version.version_number.checked_sub(1).filter(|n| *n > 0);
        if entry.latest_number() != expected {
            return Err(ContentError::conflict(&version.content_id, version.version_number));
        }
        entry.versions.push(version.clone());
        Ok(version)
    }

    async fn append_version_if_latest_matches(
        &self,
        expected_latest: Option<u32>,
        version: ContentVersion,
    ) -> ContentResult<ContentVersion> {
        let next = ContentVersion::next_number(&version.content_id, expected_latest)?;
        let mut entry = self
            .items
            .get_mut(&version.content_id)
            .ok_or_else(|| ContentError::not_found(&version.content_id))?;
        if entry.latest_number() != expected_latest || version.version_number != next {
            return Err(ContentError::conflict(&version.content_id, version.version_number));
        }
        entry.versions.push(version.clone());
        Ok(version)
    }
}
