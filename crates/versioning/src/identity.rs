//! Current-user resolution from a session token.
//!
//! Authentication itself happens at the identity provider; this module only
//! maps an already-issued session token to the `Identity` that owns it.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use mktops_core::config::AuthConfig;
use mktops_core::{ContentResult, Identity};
use tracing::debug;

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// The authenticated identity for `session_token`, or `None`.
    async fn resolve(&self, session_token: &str) -> ContentResult<Option<Identity>>;
}

#[derive(Debug, Clone)]
struct Session {
    identity: Identity,
    issued_at: DateTime<Utc>,
}

/// Session table keyed by token. Sessions expire after `ttl` when one is set.
pub struct SessionIdentityResolver {
    sessions: DashMap<String, Session>,
    ttl: Option<Duration>,
}

impl SessionIdentityResolver {
    pub fn new(ttl_hours: u32) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: (ttl_hours > 0).then(|| Duration::hours(ttl_hours as i64)),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let resolver = Self::new(config.session_ttl_hours);
        for s in &config.sessions {
            resolver.insert_session(
                s.token.clone(),
                Identity {
                    user_id: s.user_id,
                    display_name: s.display_name.clone(),
                },
            );
        }
        resolver
    }

    pub fn insert_session(&self, token: impl Into<String>, identity: Identity) {
        self.insert_session_at(token, identity, Utc::now());
    }

    pub fn insert_session_at(&self, token: impl Into<String>, identity: Identity, issued_at: DateTime<Utc>) {
        self.sessions.insert(token.into(), Session { identity, issued_at });
    }

    /// Returns whether a session was removed.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop expired sessions.
    pub fn cleanup_expired(&self) {
        if let Some(ttl) = self.ttl {
            let now = Utc::now();
            self.sessions.retain(|_, s| now - s.issued_at < ttl);
        }
    }

    fn is_expired(&self, session: &Session) -> bool {
        self.ttl
            .map_or(false, |ttl| Utc::now() - session.issued_at >= ttl)
    }
}

#[async_trait]
impl IdentityResolver for SessionIdentityResolver {
    async fn resolve(&self, session_token: &str) -> ContentResult<Option<Identity>> {
        let Some(session) = self.sessions.get(session_token).map(|s| s.value().clone()) else {
            debug!("Unknown session token");
            return Ok(None);
        };
        if self.is_expired(&session) {
            debug!(user_id = %session.identity.user_id, "Session expired");
            return Ok(None);
        }
        Ok(Some(session.identity))
    }
}
