//! Process-wide connection registry: who is online now, and when users who
//! left were last seen.
//!
//! A user id is never in both maps at once. Every transition happens under a
//! single write lock, so the overwrite/remove pairs stay atomic on a
//! multi-threaded runtime.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::auth::claims::Role;

/// One entry per currently connected user.
#[derive(Debug, Clone, Serialize)]
pub struct OnlineEntry {
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Opaque handle to the live connection. Not wire data.
    #[serde(skip)]
    pub connection_id: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(rename = "connectedAt")]
    pub connected_at: DateTime<Utc>,
    #[serde(rename = "lastSeenAt")]
    pub last_seen_at: DateTime<Utc>,
}

/// One entry per user who was online and has since disconnected.
#[derive(Debug, Clone, Serialize)]
pub struct OfflineEntry {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "lastSeenAt")]
    pub last_seen_at: DateTime<Utc>,
}

/// Point-in-time view of both maps, used to answer "who's online" queries.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub users: Vec<OnlineEntry>,
    #[serde(rename = "lastSeenUsers")]
    pub last_seen_users: Vec<OfflineEntry>,
}

#[derive(Default)]
struct RegistryInner {
    online: HashMap<String, OnlineEntry>,
    offline: HashMap<String, OfflineEntry>,
}

/// In-memory presence state. Constructed once at startup and injected via
/// `AppState`; nothing outside the gateway mutates it.
///
/// Offline entries are never evicted and accumulate for the life of the
/// process. Known limitation.
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Install a freshly connected user. A second connection from the same
    /// user id replaces the previous entry wholesale: last connection wins.
    pub fn set_online(&self, entry: OnlineEntry) {
        let mut inner = self.inner.write();
        inner.offline.remove(&entry.user_id);
        inner.online.insert(entry.user_id.clone(), entry);
    }

    /// Move a user to the offline map, recording `at` as their last-seen
    /// time. Only the connection currently on record may transition the
    /// user: a late disconnect from an overwritten connection is a no-op.
    /// Returns whether the transition happened.
    pub fn set_offline(&self, user_id: &str, connection_id: &str, at: DateTime<Utc>) -> bool {
        let mut inner = self.inner.write();
        let on_record = inner
            .online
            .get(user_id)
            .is_some_and(|entry| entry.connection_id == connection_id);
        if !on_record {
            return false;
        }
        inner.online.remove(user_id);
        inner.offline.insert(
            user_id.to_string(),
            OfflineEntry {
                user_id: user_id.to_string(),
                last_seen_at: at,
            },
        );
        true
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.inner.read().online.contains_key(user_id)
    }

    /// Last-seen timestamp: connect time while online, disconnect time once
    /// offline, `None` for a user never seen by this process.
    pub fn get_last_seen(&self, user_id: &str) -> Option<DateTime<Utc>> {
        let inner = self.inner.read();
        inner
            .online
            .get(user_id)
            .map(|e| e.last_seen_at)
            .or_else(|| inner.offline.get(user_id).map(|e| e.last_seen_at))
    }

    /// Handle of the live connection currently on record for a user.
    pub fn connection_id(&self, user_id: &str) -> Option<String> {
        self.inner
            .read()
            .online
            .get(user_id)
            .map(|e| e.connection_id.clone())
    }

    /// A consistent point-in-time view of both maps.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.inner.read();
        RegistrySnapshot {
            users: inner.online.values().cloned().collect(),
            last_seen_users: inner.offline.values().cloned().collect(),
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
