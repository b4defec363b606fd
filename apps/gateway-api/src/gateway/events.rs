//! Wire format: event names, envelopes, and payloads for both directions.
//!
//! Frames are `{"event": <name>, "data": {...}}` in both directions. Wire
//! field keys follow the client contract (`userId`, `full_name`,
//! `lastSeenAt`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::claims::ConnectionIdentity;

use super::registry::RegistrySnapshot;

/// Event names on the wire.
pub struct EventName;

impl EventName {
    // Outbound.
    pub const USER_ONLINE: &'static str = "user:online";
    pub const USER_OFFLINE: &'static str = "user:offline";
    pub const USERS_ONLINE_LIST: &'static str = "users:online-list";
    pub const USER_LAST_SEEN: &'static str = "user:last-seen";
    pub const NOTIFICATION_NEW: &'static str = "notification:new";
    pub const NOTIFICATION_READ: &'static str = "notification:read";
    pub const NOTIFICATION_ALL_READ: &'static str = "notification:all-read";

    // Inbound.
    pub const USERS_GET_ONLINE: &'static str = "users:get-online";
    pub const USER_GET_LAST_SEEN: &'static str = "user:get-last-seen";
    pub const NOTIFICATION_GET_COUNT: &'static str = "notification:get-count";

    // Both directions.
    pub const TYPING_START: &'static str = "typing:start";
    pub const TYPING_STOP: &'static str = "typing:stop";
}

/// A message sent from the gateway to a client.
#[derive(Debug, Clone, Serialize)]
pub struct ServerEvent {
    pub event: String,
    pub data: Value,
}

impl ServerEvent {
    pub fn new(event: &str, data: Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }

    /// `user:online`, broadcast when an identified connection completes its
    /// handshake.
    pub fn user_online(identity: &ConnectionIdentity) -> Self {
        Self::new(
            EventName::USER_ONLINE,
            serde_json::json!({
                "userId": identity.user_id,
                "username": identity.username,
                "full_name": identity.full_name,
                "role": identity.role,
            }),
        )
    }

    /// `user:offline`, broadcast after the registry transition, carrying the
    /// disconnect timestamp.
    pub fn user_offline(identity: &ConnectionIdentity, last_seen_at: DateTime<Utc>) -> Self {
        Self::new(
            EventName::USER_OFFLINE,
            serde_json::json!({
                "userId": identity.user_id,
                "username": identity.username,
                "full_name": identity.full_name,
                "lastSeenAt": last_seen_at,
            }),
        )
    }

    /// `users:online-list`, unicast to a freshly connected client.
    pub fn online_list(snapshot: &RegistrySnapshot) -> Self {
        Self::new(
            EventName::USERS_ONLINE_LIST,
            serde_json::to_value(snapshot).unwrap_or(Value::Null),
        )
    }

    /// `user:last-seen`, reply to a last-seen query.
    pub fn last_seen(user_id: &str, is_online: bool, last_seen_at: Option<DateTime<Utc>>) -> Self {
        Self::new(
            EventName::USER_LAST_SEEN,
            serde_json::json!({
                "userId": user_id,
                "isOnline": is_online,
                "lastSeenAt": last_seen_at,
            }),
        )
    }

    /// `typing:start` / `typing:stop`, relayed to a room tagged with the
    /// sender's user id.
    pub fn typing(event: &str, user_id: &str) -> Self {
        Self::new(event, serde_json::json!({ "userId": user_id }))
    }

    /// `notification:new`, carrying the persisted notification record.
    pub fn notification_new(notification: Value) -> Self {
        Self::new(
            EventName::NOTIFICATION_NEW,
            serde_json::json!({ "notification": notification }),
        )
    }

    /// `notification:read`, read-state sync for a user's other devices.
    pub fn notification_read(notification_id: &str) -> Self {
        Self::new(
            EventName::NOTIFICATION_READ,
            serde_json::json!({ "notificationId": notification_id }),
        )
    }

    /// `notification:all-read`.
    pub fn notification_all_read() -> Self {
        Self::new(EventName::NOTIFICATION_ALL_READ, serde_json::json!({}))
    }
}

/// A message received from a client.
#[derive(Debug, Deserialize)]
pub struct ClientEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct GetLastSeenPayload {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TypingPayload {
    #[serde(rename = "roomId")]
    pub room_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NotificationReadPayload {
    #[serde(rename = "notificationId")]
    pub notification_id: String,
}
